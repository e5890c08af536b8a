use log::{debug, warn};
use std::{str::FromStr, sync::Arc};
use url::Url;

use lather_util::soap::{SoapVersion, ENCODING_NAMESPACES, XSD_NAMESPACES, XSD_NS};

use super::{
    builtin::builtin_type,
    collection::{MethodCollection, TypeCollection},
    model::{
        BodyMeta, BodyUse, ElementName, Method, MethodMeta, Parameter, Property, Style, Type,
        TypeShape, XsdType,
    },
};
use crate::{
    error::WsdlError,
    loader::{to_url, DefaultLoader, Loader, MemoryLoader},
    parser,
    types::{self as wsdl, NamespacedName},
};

const INLINE_URL: &str = "memory://inline/service.wsdl";

/// Derivation chains longer than this are treated as cyclic.
const MAX_DEPTH: usize = 32;

/// The method and type catalog of one WSDL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    methods: MethodCollection,
    types: TypeCollection,
}

impl Metadata {
    pub fn new(methods: MethodCollection, types: TypeCollection) -> Self {
        Self { methods, types }
    }

    pub fn methods(&self) -> &MethodCollection {
        &self.methods
    }

    pub fn types(&self) -> &TypeCollection {
        &self.types
    }

    /// Finds a type by name, preferring the entry declared in `namespace`.
    pub fn find_type(&self, namespace: Option<&str>, name: &str) -> Option<&Type> {
        namespace
            .and_then(|namespace| self.types.fetch_by_qualified_name(namespace, name).ok())
            .or_else(|| self.types.fetch_first_by_name(name).ok())
    }
}

#[derive(Debug, Clone)]
pub struct MetadataProvider {
    metadata: Arc<Metadata>,
}

impl MetadataProvider {
    /// Loads a WSDL from a URL or filesystem path.
    pub fn from_url(location: &str) -> Result<Self, WsdlError> {
        Self::with_loader(
            &DefaultLoader::default(),
            to_url(location)?,
            SoapVersion::default(),
        )
    }

    /// Loads a WSDL through `loader`, preferring bindings of `preferred` when an
    /// operation is bound for both SOAP versions.
    pub fn with_loader(
        loader: &dyn Loader,
        url: Url,
        preferred: SoapVersion,
    ) -> Result<Self, WsdlError> {
        let (definition, namespaces) = parser::parse(loader, url)?;
        Ok(Self::from_definition(&definition, &namespaces, preferred))
    }

    /// Parses a self-contained WSDL document. Relative imports cannot be
    /// resolved.
    pub fn from_document(wsdl: &str, preferred: SoapVersion) -> Result<Self, WsdlError> {
        let loader = MemoryLoader::new().with_document(INLINE_URL, wsdl)?;
        Self::with_loader(&loader, Url::parse(INLINE_URL)?, preferred)
    }

    pub fn from_definition(
        definition: &wsdl::Definition,
        namespaces: &wsdl::Namespaces,
        preferred: SoapVersion,
    ) -> Self {
        let builder = CatalogBuilder {
            definition,
            namespaces,
        };

        let metadata = builder.build(preferred);
        debug!(
            "built catalog with {} methods and {} types",
            metadata.methods.len(),
            metadata.types.len()
        );

        Self {
            metadata: Arc::new(metadata),
        }
    }

    pub fn get_metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn shared(&self) -> Arc<Metadata> {
        Arc::clone(&self.metadata)
    }
}

impl FromStr for MetadataProvider {
    type Err = WsdlError;

    fn from_str(wsdl: &str) -> Result<Self, Self::Err> {
        Self::from_document(wsdl, SoapVersion::default())
    }
}

fn untyped() -> XsdType {
    XsdType::guess("anyType").with_namespace(XSD_NS)
}

fn inner_type_name(parent: &str, field: &str) -> String {
    format!("{}.{}", parent, field)
}

struct CatalogBuilder<'d> {
    definition: &'d wsdl::Definition,
    namespaces: &'d wsdl::Namespaces,
}

impl<'d> CatalogBuilder<'d> {
    fn build(&self, preferred: SoapVersion) -> Metadata {
        Metadata {
            methods: self.methods(preferred),
            types: self.types(),
        }
    }

    fn types(&self) -> TypeCollection {
        let mut types = Vec::new();

        for ty in &self.definition.types {
            let mut inner = Vec::new();
            let namespace = self.namespaces.get(&ty.name);

            types.push(self.catalog_type(&ty.name.name, namespace, &ty.kind, &mut inner));
            types.extend(inner);
        }

        types.into_iter().collect()
    }

    fn describe(&self, name: &str, namespace: &str, kind: &wsdl::TypeKind) -> (XsdType, TypeShape) {
        let ty = XsdType::guess(name).with_namespace(namespace);

        match kind {
            wsdl::TypeKind::Complex {
                base: Some(base),
                array_item,
                ..
            } if self.is_encoding_array(base) => {
                let item = array_item
                    .as_ref()
                    .map_or("anyType", |item| item.name.as_str());

                (
                    ty.with_base_type("Array").with_member_types([item]),
                    TypeShape::Array,
                )
            }

            wsdl::TypeKind::Complex { base, .. } => (
                base.as_ref()
                    .map_or(ty.clone(), |base| ty.with_base_type(&base.name)),
                TypeShape::Complex,
            ),

            wsdl::TypeKind::SimpleContent { base, .. } => {
                (ty.with_base_type(&base.name), TypeShape::SimpleContent)
            }

            wsdl::TypeKind::Restriction(base) => (ty.with_base_type(&base.name), TypeShape::Simple),

            wsdl::TypeKind::Union(members) => (
                ty.with_base_type("anyType")
                    .with_member_types(members.iter().map(|member| member.name.clone())),
                TypeShape::Union,
            ),

            wsdl::TypeKind::List(item) => (
                ty.with_base_type("array")
                    .with_member_types([item.name.clone()]),
                TypeShape::List,
            ),
        }
    }

    /// Builds a catalog entry. Anonymous types of nested fields are pushed to
    /// `inner`, named `Parent.field`.
    fn catalog_type(
        &self,
        name: &str,
        namespace: &str,
        kind: &wsdl::TypeKind,
        inner: &mut Vec<Type>,
    ) -> Type {
        let (xsd_type, shape) = self.describe(name, namespace, kind);

        let properties = match kind {
            wsdl::TypeKind::Complex { base, fields, .. } if shape == TypeShape::Complex => {
                let mut properties = base
                    .as_ref()
                    .map(|base| self.inherited_properties(base, 0))
                    .unwrap_or_default();

                properties.extend(
                    fields
                        .iter()
                        .map(|field| self.property(field, name, namespace, inner)),
                );
                properties
            }

            wsdl::TypeKind::SimpleContent { base, attributes } => {
                let mut properties = self.content_properties(base, 0);
                properties.extend(
                    attributes
                        .iter()
                        .map(|attribute| self.property(attribute, name, namespace, inner)),
                );
                properties
            }

            _ => Vec::new(),
        };

        Type {
            name: name.to_owned(),
            xsd_type,
            properties: properties.into_iter().collect(),
            shape,
        }
    }

    /// Properties a complex extension takes over from `base`.
    fn inherited_properties(&self, base: &NamespacedName, depth: usize) -> Vec<Property> {
        if depth > MAX_DEPTH {
            warn!("derivation chain of {} is too deep, ignoring its base", base.name);
            return Vec::new();
        }

        match self.definition.find_type(base) {
            Some(wsdl::Type {
                kind:
                    wsdl::TypeKind::Complex {
                        base: parent,
                        fields,
                        ..
                    },
                ..
            }) => {
                let mut properties = parent
                    .as_ref()
                    .map(|parent| self.inherited_properties(parent, depth + 1))
                    .unwrap_or_default();

                let namespace = self.namespaces.get(base);
                properties.extend(
                    fields
                        .iter()
                        .map(|field| self.property(field, &base.name, namespace, &mut Vec::new())),
                );
                properties
            }

            _ => Vec::new(),
        }
    }

    /// The `_` content property of a simple content type, plus the attributes
    /// inherited from a simple content base.
    fn content_properties(&self, base: &NamespacedName, depth: usize) -> Vec<Property> {
        match self.definition.find_type(base) {
            Some(wsdl::Type {
                kind:
                    wsdl::TypeKind::SimpleContent {
                        base: parent,
                        attributes,
                    },
                ..
            }) if depth <= MAX_DEPTH => {
                let namespace = self.namespaces.get(base);
                let mut properties = self.content_properties(parent, depth + 1);
                properties.extend(
                    attributes
                        .iter()
                        .map(|attribute| {
                            self.property(attribute, &base.name, namespace, &mut Vec::new())
                        }),
                );
                properties
            }

            _ => vec![Property::new(Property::CONTENT, self.xsd_type(base))],
        }
    }

    /// Describes a field of `parent`. An inline field type gets its own
    /// catalog entry, qualified by the parent's name so same-named fields of
    /// different parents stay apart.
    fn property(
        &self,
        field: &wsdl::Field,
        parent: &str,
        namespace: &str,
        inner: &mut Vec<Type>,
    ) -> Property {
        let ty = match &field.ty {
            wsdl::FieldKind::Type(ty) => self.xsd_type(ty),

            wsdl::FieldKind::Inner(kind) => {
                let name = inner_type_name(parent, &field.name);
                let ty = self.catalog_type(&name, namespace, kind, inner);
                let xsd_type = ty.xsd_type.clone();
                inner.push(ty);
                xsd_type
            }

            wsdl::FieldKind::Ref(element) => self.element_type(element),

            wsdl::FieldKind::Untyped => untyped(),
        };

        Property {
            name: field.name.clone(),
            ty,
            namespace: field.qualified.clone(),
            attribute: field.attribute,
        }
    }

    /// Describes a type reference: declared types first, then XSD built-ins.
    fn xsd_type(&self, name: &NamespacedName) -> XsdType {
        let namespace = self.namespaces.get(name);

        if let Some(ty) = self.definition.find_type(name) {
            return self.describe(&name.name, namespace, &ty.kind).0;
        }

        if name.is_in(self.namespaces, &XSD_NAMESPACES) {
            if let Some(builtin) = builtin_type(&name.name) {
                return builtin.with_namespace(namespace);
            }
        }

        XsdType::guess(&name.name).with_namespace(namespace)
    }

    fn element_type(&self, element: &NamespacedName) -> XsdType {
        match self.definition.find_element(element).map(|element| &element.ty) {
            Some(wsdl::ElementType::Named(ty)) => self.xsd_type(ty),

            Some(wsdl::ElementType::Anonymous(index)) => self
                .definition
                .types
                .get(*index)
                .map(|ty| {
                    self.describe(&ty.name.name, self.namespaces.get(&ty.name), &ty.kind)
                        .0
                })
                .unwrap_or_else(untyped),

            Some(wsdl::ElementType::Untyped) => untyped(),

            None => {
                debug!("unresolved element reference {}", element.name);
                untyped()
            }
        }
    }

    fn is_encoding_array(&self, base: &NamespacedName) -> bool {
        base.name == "Array" && base.is_in(self.namespaces, &ENCODING_NAMESPACES)
    }

    fn methods(&self, preferred: SoapVersion) -> MethodCollection {
        let mut bindings: Vec<_> = self
            .definition
            .bindings
            .iter()
            .filter(|binding| binding.version.is_some())
            .collect();
        bindings.sort_by_key(|binding| binding.version != Some(preferred));

        let mut methods: Vec<Method> = Vec::new();

        for binding in bindings {
            let port_type = if let Some(port_type) = self.definition.find_port_type(&binding.ty) {
                port_type
            } else {
                warn!(
                    "binding {} references unknown port type {}",
                    binding.name.name, binding.ty.name
                );
                continue;
            };

            let location = self
                .definition
                .services
                .iter()
                .flat_map(|service| &service.ports)
                .find(|port| port.binding == binding.name)
                .and_then(|port| port.location.clone())
                .unwrap_or_default();

            for operation in &port_type.operations {
                if methods.iter().any(|method| method.name == operation.name.name) {
                    continue;
                }

                let binding_operation = binding
                    .operations
                    .iter()
                    .find(|candidate| candidate.name.name == operation.name.name);

                methods.push(self.method(binding, binding_operation, operation, &location));
            }
        }

        methods.into_iter().collect()
    }

    fn method(
        &self,
        binding: &wsdl::Binding,
        binding_operation: Option<&wsdl::BindingOperation>,
        operation: &wsdl::Operation,
        location: &str,
    ) -> Method {
        let name = operation.name.name.clone();

        let parameters = self.parts(operation.input.as_ref());
        let outputs = self.parts(operation.output.as_ref());

        let return_type = match outputs.as_slice() {
            [] => XsdType::guess("void"),
            [single] => single.ty.clone(),
            _ => XsdType::guess("array"),
        };

        let style = Style::parse(
            binding_operation
                .and_then(|operation| operation.style.as_deref())
                .or(binding.style.as_deref()),
        );

        let action = binding_operation
            .and_then(|operation| operation.action.clone())
            .filter(|action| !action.is_empty())
            .unwrap_or_else(|| format!("{}/{}", location.trim_end_matches('/'), name));

        let meta = MethodMeta {
            location: location.to_owned(),
            action,
            soap_version: binding.version.unwrap_or_default(),
            one_way: operation.output.is_none(),
            style,
            input: self.body_meta(binding_operation.and_then(|operation| operation.input.as_ref())),
            output: self
                .body_meta(binding_operation.and_then(|operation| operation.output.as_ref())),
        };

        Method {
            name,
            parameters: parameters.into_iter().collect(),
            return_type,
            outputs: outputs.into_iter().collect(),
            meta,
            documentation: operation.documentation.clone(),
        }
    }

    fn parts(&self, message: Option<&NamespacedName>) -> Vec<Parameter> {
        let message = match message {
            Some(name) => match self.definition.find_message(name) {
                Some(message) => message,
                None => {
                    warn!("operation references unknown message {}", name.name);
                    return Vec::new();
                }
            },
            None => return Vec::new(),
        };

        message
            .parts
            .iter()
            .map(|part| match &part.kind {
                wsdl::PartKind::Type(ty) => Parameter::new(&part.name, self.xsd_type(ty)),

                wsdl::PartKind::Element(element) => {
                    Parameter::new(&part.name, self.element_type(element)).with_element(
                        ElementName {
                            namespace: self.namespaces.get(element).to_owned(),
                            name: element.name.clone(),
                        },
                    )
                }
            })
            .collect()
    }

    fn body_meta(&self, body: Option<&wsdl::BindingBody>) -> BodyMeta {
        let body_use = match body.and_then(|body| body.body_use.as_deref()) {
            Some("encoded") => BodyUse::Encoded,
            _ => BodyUse::Literal,
        };

        BodyMeta {
            body_use,
            namespace: body
                .and_then(|body| body.namespace.clone())
                .or_else(|| self.definition.target_namespace.clone()),
        }
    }
}
