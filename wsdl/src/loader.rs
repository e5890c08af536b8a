//! Retrieval of WSDL and schema documents.
//!
//! Loaders only fetch text; they do not cache. Imports and includes are
//! resolved against the URL of the document that references them.

use std::{collections::HashMap, fs, path::Path};
use url::Url;

use super::error::WsdlError;

pub trait Loader: Send + Sync {
    fn load(&self, url: &Url) -> Result<String, WsdlError>;
}

/// Turns a URL or a (possibly relative) filesystem path into a URL.
pub fn to_url(location: &str) -> Result<Url, WsdlError> {
    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::from_file_path(
            &Path::new(location)
                .canonicalize()
                .map_err(|err| WsdlError::PathConversionError(Some(err)))?,
        )
        .map_err(|()| WsdlError::PathConversionError(None)),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, url: &Url) -> Result<String, WsdlError> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| WsdlError::PathConversionError(None))?;
                Ok(fs::read_to_string(path)?)
            }

            other => Err(WsdlError::UnsupportedScheme(other.into())),
        }
    }
}

#[cfg(feature = "http")]
#[derive(Debug, Default, Clone)]
pub struct HttpLoader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpLoader {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl Loader for HttpLoader {
    fn load(&self, url: &Url) -> Result<String, WsdlError> {
        match url.scheme() {
            "http" | "https" => Ok(self
                .client
                .get(url.clone())
                .send()?
                .error_for_status()?
                .text()?),

            other => Err(WsdlError::UnsupportedScheme(other.into())),
        }
    }
}

/// Dispatches on the URL scheme: `file` always, `http(s)` with the `http`
/// feature.
#[derive(Debug, Default, Clone)]
pub struct DefaultLoader {
    file: FileLoader,
    #[cfg(feature = "http")]
    http: HttpLoader,
}

impl Loader for DefaultLoader {
    fn load(&self, url: &Url) -> Result<String, WsdlError> {
        match url.scheme() {
            "file" => self.file.load(url),

            #[cfg(feature = "http")]
            "http" | "https" => self.http.load(url),

            other => Err(WsdlError::UnsupportedScheme(other.into())),
        }
    }
}

/// Serves documents registered up front, for recorded fixtures.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<Url, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: &str, content: impl Into<String>) -> Result<Self, WsdlError> {
        self.documents.insert(Url::parse(url)?, content.into());
        Ok(self)
    }
}

impl Loader for MemoryLoader {
    fn load(&self, url: &Url) -> Result<String, WsdlError> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| WsdlError::MissingDocument(url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_loader_serves_registered_documents() {
        let loader = MemoryLoader::new()
            .with_document("memory://fixtures/a.wsdl", "<definitions/>")
            .unwrap();

        let url = Url::parse("memory://fixtures/a.wsdl").unwrap();
        assert_eq!(loader.load(&url).unwrap(), "<definitions/>");

        let missing = url.join("b.xsd").unwrap();
        assert!(matches!(
            loader.load(&missing),
            Err(WsdlError::MissingDocument(_))
        ));
    }

    #[test]
    fn default_loader_rejects_unknown_schemes() {
        let url = Url::parse("ftp://example.com/service.wsdl").unwrap();
        assert!(matches!(
            DefaultLoader::default().load(&url),
            Err(WsdlError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[test]
    fn absolute_urls_are_kept() {
        let url = to_url("http://example.com/service?wsdl").unwrap();
        assert_eq!(url.scheme(), "http");
    }
}
