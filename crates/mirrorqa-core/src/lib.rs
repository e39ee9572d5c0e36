pub mod duration;
pub mod error;
pub mod iso_countries;
pub mod models;

pub use error::{DomainError, DomainResult};
