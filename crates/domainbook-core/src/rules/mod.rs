pub mod validation;

pub use validation::{belongs_to_domain, is_valid_email_syntax};
