pub mod error;
pub mod soap;
pub mod xml;

pub use error::XmlError;
