use std::ptr;

use lather_util::soap::{APACHE_NS, ENCODING_NAMESPACES, XSD_NAMESPACES};
use lather_wsdl::metadata::{Metadata, Type, TypeShape, XsdType};

use crate::primitive::Primitive;

/// Restriction chains longer than this are treated as cyclic.
const MAX_DEPTH: usize = 32;

/// How a node of a given type is read or written.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolved<'m> {
    Primitive(Primitive),
    Catalog(&'m Type),
    /// `SOAP-ENC:Struct`
    EncStruct,
    /// `SOAP-ENC:Array`
    EncArray,
    /// `apache:Map`
    ApacheMap,
    Untyped,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolver<'m> {
    metadata: &'m Metadata,
}

fn is_untyped_name(name: &str) -> bool {
    matches!(name, "anyType" | "anySimpleType" | "any" | "")
}

impl<'m> Resolver<'m> {
    pub fn new(metadata: &'m Metadata) -> Self {
        Self { metadata }
    }

    /// Resolves a qualified type name, as found in `xsi:type`.
    pub fn resolve_name(&self, namespace: Option<&str>, name: &str) -> Resolved<'m> {
        match namespace {
            Some(namespace) if XSD_NAMESPACES.contains(&namespace) => {
                if is_untyped_name(name) {
                    Resolved::Untyped
                } else {
                    Primitive::from_name(name).map_or(Resolved::Untyped, Resolved::Primitive)
                }
            }

            Some(namespace) if ENCODING_NAMESPACES.contains(&namespace) => {
                if name.eq_ignore_ascii_case("Struct") {
                    Resolved::EncStruct
                } else if name.eq_ignore_ascii_case("Array") {
                    Resolved::EncArray
                } else {
                    Primitive::from_name(name).map_or(Resolved::Untyped, Resolved::Primitive)
                }
            }

            Some(APACHE_NS) if name.eq_ignore_ascii_case("Map") => Resolved::ApacheMap,

            Some(APACHE_NS) => Resolved::Untyped,

            Some(namespace) => self
                .metadata
                .find_type(Some(namespace), name)
                .map_or(Resolved::Untyped, Resolved::Catalog),

            None => self.resolve_local(None, name),
        }
    }

    /// Resolves a bare local name: catalog entries first, then primitives.
    pub fn resolve_local(&self, namespace: Option<&str>, name: &str) -> Resolved<'m> {
        if is_untyped_name(name) {
            return Resolved::Untyped;
        }

        self.metadata
            .find_type(namespace, name)
            .map(Resolved::Catalog)
            .or_else(|| Primitive::from_name(name).map(Resolved::Primitive))
            .unwrap_or(Resolved::Untyped)
    }

    /// Resolves a statically declared parameter or property type.
    pub fn resolve_xsd(&self, ty: &XsdType) -> Resolved<'m> {
        if ty.is_untyped() || ty.name() == "void" {
            return Resolved::Untyped;
        }

        match self.resolve_name(ty.namespace(), ty.name()) {
            Resolved::Untyped => match ty.base_type() {
                Some(base) => self.resolve_local(ty.namespace(), base),
                None => Resolved::Untyped,
            },
            resolved => resolved,
        }
    }

    /// Resolves the item type of a list or array type.
    pub fn resolve_member(&self, ty: &Type) -> Resolved<'m> {
        match ty.xsd_type.member_types().first() {
            Some(member) => self.resolve_local(ty.namespace(), member),
            None => Resolved::Untyped,
        }
    }

    /// Follows a restriction down to the type its values are read as.
    pub fn simple_base(&self, ty: &'m Type) -> Resolved<'m> {
        let mut current = ty;

        for _ in 0..MAX_DEPTH {
            let base = match current.xsd_type.base_type() {
                Some(base) => base,
                None => return Resolved::Untyped,
            };

            match self.metadata.find_type(current.namespace(), base) {
                Some(parent) if ptr::eq(parent, current) => break,
                Some(parent) if parent.shape == TypeShape::Simple => current = parent,
                Some(parent) => return Resolved::Catalog(parent),
                None => {
                    return Primitive::from_name(base).map_or(Resolved::Untyped, Resolved::Primitive)
                }
            }
        }

        current
            .xsd_type
            .base_type()
            .and_then(Primitive::from_name)
            .map_or(Resolved::Untyped, Resolved::Primitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lather_util::soap::{SOAP12_ENCODING_NS, XSD_1999_NS, XSD_NS};
    use lather_wsdl::metadata::Property;

    fn simple(name: &str, base: &str) -> Type {
        Type {
            name: name.to_owned(),
            xsd_type: XsdType::guess(name)
                .with_base_type(base)
                .with_namespace("urn:test"),
            properties: Vec::<Property>::new().into_iter().collect(),
            shape: TypeShape::Simple,
        }
    }

    fn metadata(types: Vec<Type>) -> Metadata {
        Metadata::new(Default::default(), types.into_iter().collect())
    }

    #[test]
    fn resolves_reserved_namespaces() {
        let metadata = metadata(Vec::new());
        let resolver = Resolver::new(&metadata);

        assert!(matches!(
            resolver.resolve_name(Some(XSD_NS), "int"),
            Resolved::Primitive(Primitive::Int)
        ));
        assert!(matches!(
            resolver.resolve_name(Some(XSD_1999_NS), "timeInstant"),
            Resolved::Primitive(Primitive::TimeInstant)
        ));
        assert!(matches!(
            resolver.resolve_name(Some(XSD_NS), "anyType"),
            Resolved::Untyped
        ));
        assert!(matches!(
            resolver.resolve_name(Some(SOAP12_ENCODING_NS), "array"),
            Resolved::EncArray
        ));
        assert!(matches!(
            resolver.resolve_name(Some(APACHE_NS), "Map"),
            Resolved::ApacheMap
        ));
    }

    #[test]
    fn follows_restrictions_to_their_primitive() {
        let metadata = metadata(vec![simple("code", "label"), simple("label", "token")]);
        let resolver = Resolver::new(&metadata);
        let code = metadata.types().fetch_by_name("code").unwrap();

        assert!(matches!(
            resolver.simple_base(code),
            Resolved::Primitive(Primitive::Token)
        ));
    }

    #[test]
    fn stops_at_self_referencing_restrictions() {
        let metadata = metadata(vec![simple("string", "string")]);
        let resolver = Resolver::new(&metadata);
        let ty = metadata.types().fetch_by_name("string").unwrap();

        assert!(matches!(
            resolver.simple_base(ty),
            Resolved::Primitive(Primitive::String)
        ));
    }
}
