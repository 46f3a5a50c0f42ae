//! HTTP request handlers
//!
//! - `api` - Readiness and health check endpoints
//! - `speak` - Text-to-speech streaming endpoint

pub mod api;
pub mod speak;
