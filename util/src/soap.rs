use super::{
    error::XmlError,
    xml::{Element, XmlWriter, NO_ATTRIBUTES},
};

pub const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const SOAP11_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const SOAP12_ENCODING_NS: &str = "http://www.w3.org/2003/05/soap-encoding";

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSD_1999_NS: &str = "http://www.w3.org/1999/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSI_1999_NS: &str = "http://www.w3.org/1999/XMLSchema-instance";
pub const APACHE_NS: &str = "http://xml.apache.org/xml-soap";

pub const XSD_NAMESPACES: [&str; 2] = [XSD_NS, XSD_1999_NS];
pub const XSI_NAMESPACES: [&str; 2] = [XSI_NS, XSI_1999_NS];
pub const ENCODING_NAMESPACES: [&str; 2] = [SOAP11_ENCODING_NS, SOAP12_ENCODING_NS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl Default for SoapVersion {
    fn default() -> Self {
        SoapVersion::Soap11
    }
}

impl SoapVersion {
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENVELOPE_NS,
            SoapVersion::Soap12 => SOAP12_ENVELOPE_NS,
        }
    }

    pub fn encoding_namespace(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENCODING_NS,
            SoapVersion::Soap12 => SOAP12_ENCODING_NS,
        }
    }

    /// `11` or `12`, as used in request metadata.
    pub fn number(self) -> u8 {
        match self {
            SoapVersion::Soap11 => 11,
            SoapVersion::Soap12 => 12,
        }
    }

    pub fn from_envelope_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            SOAP11_ENVELOPE_NS => Some(SoapVersion::Soap11),
            SOAP12_ENVELOPE_NS => Some(SoapVersion::Soap12),
            _ => None,
        }
    }
}

/// An encoded request, ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
    pub xml: String,
    pub location: String,
    pub action: String,
    pub version: SoapVersion,
    pub one_way: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapResponse {
    xml: String,
}

impl SoapResponse {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Parses the document and returns the `Body` element of the envelope.
    pub fn body(&self) -> Result<Element, XmlError> {
        let envelope = Element::parse(&self.xml)?;
        let is_envelope = envelope.local_name() == "Envelope"
            && envelope
                .namespace()
                .and_then(SoapVersion::from_envelope_namespace)
                .is_some();

        if !is_envelope {
            return Err(XmlError::MissingElement("Envelope"));
        }

        let body = envelope
            .children()
            .find(|child| child.local_name() == "Body" && child.namespace() == envelope.namespace())
            .cloned()
            .ok_or(XmlError::MissingElement("Body"));
        body
    }
}

/// Prefix/namespace pairs declared on the envelope root.
#[derive(Debug, Clone)]
pub struct Envelope {
    version: SoapVersion,
    namespaces: Vec<(String, String)>,
    encoding_style: Option<&'static str>,
}

impl Envelope {
    pub const PREFIX: &'static str = "SOAP-ENV";

    pub fn new(version: SoapVersion) -> Self {
        Self {
            version,
            namespaces: Vec::new(),
            encoding_style: None,
        }
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.namespaces.iter().any(|(existing, _)| *existing == prefix) {
            self.namespaces.push((prefix, namespace.into()));
        }
        self
    }

    /// Marks the body as SOAP encoded (`encodingStyle` on the envelope).
    pub fn encoded(mut self) -> Self {
        self.encoding_style = Some(self.version.encoding_namespace());
        self
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    /// Writes the envelope, delegating the body content to `body`.
    pub fn write<F, E>(&self, body: F) -> Result<String, E>
    where
        F: FnOnce(&mut XmlWriter) -> Result<(), E>,
        E: From<XmlError>,
    {
        let envelope_name = format!("{}:Envelope", Self::PREFIX);
        let body_name = format!("{}:Body", Self::PREFIX);

        let mut attributes = vec![(
            format!("xmlns:{}", Self::PREFIX),
            self.version.envelope_namespace().to_owned(),
        )];
        attributes.extend(
            self.namespaces
                .iter()
                .map(|(prefix, namespace)| (format!("xmlns:{}", prefix), namespace.clone())),
        );
        if let Some(style) = self.encoding_style {
            attributes.push((format!("{}:encodingStyle", Self::PREFIX), style.to_owned()));
        }

        let mut writer = XmlWriter::new();
        writer.declaration()?;
        writer.start(&envelope_name, attributes)?;
        writer.start(&body_name, NO_ATTRIBUTES)?;
        body(&mut writer)?;
        writer.end(&body_name)?;
        writer.end(&envelope_name)?;

        Ok(writer.into_string()?)
    }
}
