use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Error parsing XML input")]
    ParseError(#[from] quick_xml::Error),

    #[error("XML document has no root element")]
    EmptyDocument,

    #[error("Missing {0} element in SOAP envelope")]
    MissingElement(&'static str),

    #[error("Unable to write XML output")]
    WriteError(#[from] std::io::Error),

    #[error("Generated XML is not valid UTF-8")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}
