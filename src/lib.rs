//! SOAP value codec driven by a WSDL catalog.
//!
//! [`Encoder`] writes [`Value`] arguments as request envelopes and
//! [`Decoder`] reads responses back, both typed by the methods and types a
//! [`MetadataProvider`] derives from a WSDL. [`Engine`] bundles the three.

mod classmap;
mod decoder;
mod encoder;
mod engine;
mod error;
mod guess;
mod primitive;
mod resolve;
mod value;

pub use classmap::ClassMap;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use engine::{Engine, EngineOptions};
pub use error::{DecodeError, EncodeError, Error};
pub use guess::{TypeGuesser, TypeTag};
pub use primitive::Primitive;
pub use value::Value;

pub use lather_util::soap::{SoapRequest, SoapResponse, SoapVersion};
pub use lather_wsdl::{metadata, Metadata, MetadataProvider, NotFoundError, WsdlError};
