use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum WsdlError {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to open file")]
    FileOpenError(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("No document registered for {0}")]
    MissingDocument(Url),

    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Document {0} is not a WSDL definition or XML schema")]
    UnexpectedRoot(String),

    #[error("Missing attribute {attribute} on {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Undeclared namespace prefix {0}")]
    UnknownPrefix(String),
}

/// A catalog lookup that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No {kind} named {name}")]
pub struct NotFoundError {
    pub kind: &'static str,
    pub name: String,
}

impl NotFoundError {
    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}
