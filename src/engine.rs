use std::{str::FromStr, sync::Arc};
use url::Url;

use lather_util::soap::{SoapRequest, SoapResponse, SoapVersion};
use lather_wsdl::{
    loader::{to_url, DefaultLoader, Loader},
    Metadata, MetadataProvider, WsdlError,
};

use crate::{
    classmap::ClassMap,
    decoder::Decoder,
    encoder::Encoder,
    error::{DecodeError, EncodeError},
    value::Value,
};

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub class_map: ClassMap,
    /// Binding picked when an operation is bound for both SOAP versions.
    pub soap_version: SoapVersion,
}

impl EngineOptions {
    pub fn with_class_map(self, class_map: ClassMap) -> Self {
        Self { class_map, ..self }
    }

    pub fn with_soap_version(self, soap_version: SoapVersion) -> Self {
        Self {
            soap_version,
            ..self
        }
    }
}

/// A WSDL catalog together with the codec built on it.
#[derive(Debug, Clone)]
pub struct Engine {
    provider: MetadataProvider,
    decoder: Decoder,
    encoder: Encoder,
}

impl Engine {
    /// Loads the WSDL at a URL or filesystem path.
    pub fn from_wsdl(location: &str, options: EngineOptions) -> Result<Self, WsdlError> {
        Self::with_loader(&DefaultLoader::default(), to_url(location)?, options)
    }

    pub fn with_loader(
        loader: &dyn Loader,
        url: Url,
        options: EngineOptions,
    ) -> Result<Self, WsdlError> {
        let provider = MetadataProvider::with_loader(loader, url, options.soap_version)?;
        Ok(Self::from_provider(provider, options.class_map))
    }

    /// Builds an engine from a self-contained WSDL document.
    pub fn from_document(wsdl: &str, options: EngineOptions) -> Result<Self, WsdlError> {
        let provider = MetadataProvider::from_document(wsdl, options.soap_version)?;
        Ok(Self::from_provider(provider, options.class_map))
    }

    pub fn from_provider(provider: MetadataProvider, class_map: ClassMap) -> Self {
        let metadata = provider.shared();

        Self {
            decoder: Decoder::new(Arc::clone(&metadata)).with_class_map(class_map.clone()),
            encoder: Encoder::new(metadata).with_class_map(class_map),
            provider,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        self.provider.get_metadata()
    }

    pub fn encode(&self, method: &str, args: &[Value]) -> Result<SoapRequest, EncodeError> {
        self.encoder.encode(method, args)
    }

    pub fn decode(&self, method: &str, response: &SoapResponse) -> Result<Value, DecodeError> {
        self.decoder.decode(method, response)
    }
}

impl FromStr for Engine {
    type Err = WsdlError;

    fn from_str(wsdl: &str) -> Result<Self, Self::Err> {
        Self::from_document(wsdl, EngineOptions::default())
    }
}
