//! WSDL and XML Schema reading for lather.
//!
//! [`parse`] produces the raw [`types::Definition`]; [`MetadataProvider`]
//! turns it into the catalog of methods and types used by the codec.

use url::Url;

mod parser;

pub mod error;
pub mod loader;
pub mod metadata;
pub mod types;

pub use error::{NotFoundError, WsdlError};
pub use metadata::{Metadata, MetadataProvider};

/// Parses the WSDL at `location` (a URL or a filesystem path) and everything
/// it imports.
pub fn parse<S: AsRef<str>>(location: S) -> Result<(types::Definition, types::Namespaces), WsdlError> {
    let url = loader::to_url(location.as_ref())?;
    parse_with(&loader::DefaultLoader::default(), url)
}

pub fn parse_with(
    loader: &dyn loader::Loader,
    url: Url,
) -> Result<(types::Definition, types::Namespaces), WsdlError> {
    parser::parse(loader, url)
}
