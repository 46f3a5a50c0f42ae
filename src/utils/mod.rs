pub mod mask;
pub use mask::mask_secret;
pub mod url_validation;
pub use url_validation::{UrlValidationError, validate_endpoint_url};
