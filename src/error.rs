use lather_util::XmlError;
use lather_wsdl::{NotFoundError, WsdlError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unable to resolve schema entry")]
    SchemaResolution(#[from] NotFoundError),

    #[error("Malformed response")]
    Xml(#[from] XmlError),

    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("Cannot read {text:?} as {ty}")]
    Lexical { ty: String, text: String },

    #[error("Response has no {0} element")]
    MissingElement(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unable to resolve schema entry")]
    SchemaResolution(#[from] NotFoundError),

    #[error("Unable to write request")]
    Xml(#[from] XmlError),

    #[error("{method} takes {expected} arguments, {actual} given")]
    TooManyArguments {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot write a {kind} value as {ty}")]
    Mismatch { ty: String, kind: &'static str },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Wsdl(#[from] WsdlError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
