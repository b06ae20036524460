pub mod email;
pub mod index;

pub use email::{domain_of, normalize_email, EmailAddress};
pub use index::{DomainIndex, ExportRow};
