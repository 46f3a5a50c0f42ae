//! Alibaba Cloud Intelligent Speech Interaction (NLS) text-to-speech client.
//!
//! Synthesis is a two-step exchange:
//! 1. A signed `CreateToken` RPC call against the metadata endpoint, using
//!    the account's access key pair ([`signing`], [`token`]).
//! 2. A synthesis call against the streaming gateway, authorized by the
//!    token and the project app key ([`synthesizer`]).
//!
//! [`SpeechService`] ties both together for the HTTP layer.

pub mod config;
pub mod error;
pub mod service;
pub mod signing;
pub mod synthesizer;
pub mod token;

pub use config::{Credentials, NlsConfig, SynthesisOptions, Transport};
pub use error::{NlsError, NlsResult};
pub use service::SpeechService;
pub use signing::SignedRequest;
pub use synthesizer::{AudioStream, SpeechSynthesizer};
pub use token::{AccessToken, TokenProvider, TokenSource};
