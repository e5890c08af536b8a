//! The method and type catalog derived from a parsed WSDL.

mod builtin;
mod collection;
mod model;
mod provider;

pub use builtin::builtin_type;
pub use collection::{
    Collection, MethodCollection, Named, ParameterCollection, PropertyCollection, TypeCollection,
};
pub use model::{
    BodyMeta, BodyUse, ElementName, Method, MethodMeta, Parameter, Property, Style, Type,
    TypeShape, XsdType,
};
pub use provider::{Metadata, MetadataProvider};
