pub mod url_validator;

pub use url_validator::{validate_destination, validate_url};
