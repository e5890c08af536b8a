use log::{debug, trace};
use quick_xml::{
    events::{attributes::Attributes, BytesStart, BytesText, Event},
    Reader,
};
use std::{
    collections::{HashMap, HashSet},
    io::BufRead,
};
use url::Url;

use lather_util::{
    soap::{SoapVersion, XSD_NS},
    xml::split_prefixed_name,
};

use super::{
    error::WsdlError,
    loader::Loader,
    types::{
        Binding, BindingBody, BindingOperation, Definition, ElementDecl, ElementType, Field,
        FieldKind, Message, NamespacedName, Namespaces, Operation, Part, PartKind, Port,
        PortType, Service, Type, TypeKind,
    },
};

const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
const WSDL_SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// Reads the attributes listed in `names`, matching on local name.
fn get_attributes<B: BufRead, const N: usize>(
    reader: &Reader<B>,
    attributes: Attributes<'_>,
    names: [&'static str; N],
) -> Result<[Option<String>; N], WsdlError> {
    const INIT: Option<String> = None;
    let mut result = [INIT; N];

    for attribute in attributes {
        let attribute = attribute?;
        let key = reader.decode(attribute.key)?;
        let (prefix, local) = split_prefixed_name(key);

        if prefix == Some("xmlns") {
            continue;
        }

        for (index, name) in names.iter().enumerate() {
            if local == *name {
                result[index] = Some(attribute.unescape_and_decode_value(reader)?);
                break;
            }
        }
    }

    Ok(result)
}

fn required(
    value: Option<String>,
    element: &'static str,
    attribute: &'static str,
) -> Result<String, WsdlError> {
    value.ok_or(WsdlError::MissingAttribute { element, attribute })
}

/// `xsd:string[]` or `xsd:int[][2]` -> `xsd:string` / `xsd:int`.
fn strip_array_dimensions(array_type: &str) -> &str {
    array_type
        .find('[')
        .map_or(array_type, |index| &array_type[..index])
}

fn complex_fields(kind: &mut Option<TypeKind>) -> Option<&mut Vec<Field>> {
    let kind = kind.get_or_insert_with(|| TypeKind::Complex {
        base: None,
        fields: Vec::new(),
        array_item: None,
    });

    match kind {
        TypeKind::Complex { fields, .. } => Some(fields),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Target {
    namespace: String,
    qualified_elements: bool,
}

/// Per-document namespace state: prefix bindings for every open element and
/// the target namespace of every open `definitions`/`schema`.
struct DocumentContext {
    url: Url,
    scopes: Vec<HashMap<Option<String>, String>>,
    targets: Vec<Target>,
}

impl DocumentContext {
    fn new(url: Url, inherited: Option<Target>) -> Self {
        Self {
            url,
            scopes: Vec::new(),
            targets: inherited.into_iter().collect(),
        }
    }

    fn push_scope(&mut self, declared: Vec<(Option<String>, String)>) {
        let mut scope = self.scopes.last().cloned().unwrap_or_default();
        scope.extend(declared);
        self.scopes.push(scope);
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(&prefix.map(ToOwned::to_owned)))
            .cloned()
    }

    fn push_target(&mut self, namespace: Option<String>, qualified_elements: bool) {
        let namespace = namespace.unwrap_or_else(|| self.target());
        self.targets.push(Target {
            namespace,
            qualified_elements,
        });
    }

    fn pop_target(&mut self) {
        self.targets.pop();
    }

    fn target(&self) -> String {
        self.targets
            .last()
            .map(|target| target.namespace.clone())
            .unwrap_or_default()
    }

    fn qualified_elements(&self) -> bool {
        self.targets
            .last()
            .map_or(false, |target| target.qualified_elements)
    }
}

struct Parser<'l> {
    loader: &'l dyn Loader,
    visited: HashSet<Url>,

    definition: Definition,
    namespaces: Namespaces,
}

#[derive(Debug)]
enum ParseState {
    Definitions,

    Types,
    Schema,
    Element {
        name: String,
        ty: Option<NamespacedName>,
        reference: Option<NamespacedName>,
        inner: Option<TypeKind>,
        top_level: bool,
    },
    ComplexType {
        name: Option<String>,
        kind: Option<TypeKind>,
    },
    ComplexContent {
        kind: Option<TypeKind>,
    },
    ComplexDerivation {
        base: NamespacedName,
        fields: Vec<Field>,
        array_item: Option<NamespacedName>,
    },
    SimpleContent {
        kind: Option<TypeKind>,
    },
    SimpleDerivation {
        base: NamespacedName,
        attributes: Vec<Field>,
    },
    Particle(Vec<Field>),
    Attribute {
        name: Option<String>,
        reference: Option<NamespacedName>,
        ty: Option<NamespacedName>,
        inner: Option<TypeKind>,
        array_type: Option<NamespacedName>,
    },
    SimpleType {
        name: Option<String>,
        kind: Option<TypeKind>,
    },
    Restriction {
        base: Option<NamespacedName>,
        inner: Option<TypeKind>,
    },
    Union {
        members: Vec<NamespacedName>,
    },
    List {
        item: Option<NamespacedName>,
        inner: Option<TypeKind>,
    },

    Message {
        name: String,
        parts: Vec<Part>,
    },
    Part(Part),

    PortType {
        name: String,
        operations: Vec<Operation>,
    },
    Operation {
        name: String,
        documentation: Option<String>,
        input: Option<NamespacedName>,
        output: Option<NamespacedName>,
    },
    Documentation(Option<String>),
    Input {
        message: NamespacedName,
    },
    Output {
        message: NamespacedName,
    },

    Binding {
        name: String,
        ty: NamespacedName,
        version: Option<SoapVersion>,
        style: Option<String>,
        operations: Vec<BindingOperation>,
    },
    SoapBinding {
        version: Option<SoapVersion>,
        style: Option<String>,
    },
    BindingOperation {
        name: String,
        action: Option<String>,
        style: Option<String>,
        input: Option<BindingBody>,
        output: Option<BindingBody>,
    },
    OperationAction {
        action: Option<String>,
        style: Option<String>,
    },
    BindingInput(BindingBody),
    BindingOutput(BindingBody),
    BindingBody(BindingBody),

    Service {
        name: String,
        ports: Vec<Port>,
    },
    Port {
        name: String,
        binding: NamespacedName,
        location: Option<String>,
    },
    Address {
        location: String,
    },

    Import,

    Other,
}

impl<'l> Parser<'l> {
    fn new(loader: &'l dyn Loader) -> Self {
        Self {
            loader,
            visited: HashSet::new(),

            definition: Default::default(),
            namespaces: Default::default(),
        }
    }

    fn parse(mut self, url: Url) -> Result<(Definition, Namespaces), WsdlError> {
        self.parse_url(url, None)?;
        Ok((self.definition, self.namespaces))
    }

    /// Parses the document at `url` once. Schemas without a target namespace
    /// take over `inherited` from the including document.
    fn parse_url(&mut self, url: Url, inherited: Option<Target>) -> Result<(), WsdlError> {
        if !self.visited.insert(url.clone()) {
            debug!("skipping already parsed document {}", url);
            return Ok(());
        }

        debug!("parsing document {}", url);
        let text = self.loader.load(&url)?;
        let result = self.parse_xml(DocumentContext::new(url.clone(), inherited), &text);
        debug!("finished parsing document {}", url);

        result
    }

    fn parse_xml(&mut self, mut context: DocumentContext, text: &str) -> Result<(), WsdlError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack = Vec::new();
        let mut buffer = Vec::new();

        loop {
            match reader.read_event(&mut buffer)? {
                Event::Start(start) => {
                    self.handle_start(&mut context, &mut stack, &reader, &start)?
                }
                Event::End(..) => self.handle_end(&mut context, &mut stack)?,

                Event::Empty(start) => {
                    self.handle_start(&mut context, &mut stack, &reader, &start)?;
                    self.handle_end(&mut context, &mut stack)?;
                }

                Event::Text(text) => self.handle_text(&mut stack, &reader, &text)?,

                Event::Eof => break,

                _ => (),
            }

            buffer.clear();
        }

        Ok(())
    }

    fn target_namespaced(&mut self, context: &DocumentContext, name: String) -> NamespacedName {
        NamespacedName::new(&mut self.namespaces, &context.target(), name)
    }

    fn xsd_name(&mut self, name: &str) -> NamespacedName {
        NamespacedName::new(&mut self.namespaces, XSD_NS, name.to_owned())
    }

    fn resolve_namespace(
        &mut self,
        context: &DocumentContext,
        prefixed_name: &str,
    ) -> Result<NamespacedName, WsdlError> {
        let (prefix, local_name) = split_prefixed_name(prefixed_name.trim());

        let namespace = match prefix {
            Some(prefix) => match context.lookup(Some(prefix)) {
                Some(namespace) => namespace,
                None if prefix == "tns" => context.target(),
                None => return Err(WsdlError::UnknownPrefix(prefix.to_owned())),
            },

            None => context
                .lookup(None)
                .unwrap_or_else(|| context.target()),
        };

        Ok(NamespacedName::new(
            &mut self.namespaces,
            &namespace,
            local_name.to_owned(),
        ))
    }

    fn resolve_optional(
        &mut self,
        context: &DocumentContext,
        prefixed_name: Option<String>,
    ) -> Result<Option<NamespacedName>, WsdlError> {
        prefixed_name
            .map(|name| self.resolve_namespace(context, &name))
            .transpose()
    }

    fn import(&mut self, context: &DocumentContext, location: &str) -> Result<(), WsdlError> {
        let url = context.url.join(location)?;
        self.parse_url(url, context.targets.last().cloned())?;
        debug!("back to {}", context.url);
        Ok(())
    }

    fn push_schema<B: BufRead>(
        &mut self,
        context: &mut DocumentContext,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<(), WsdlError> {
        let [namespace, element_form] = get_attributes(
            reader,
            start.attributes(),
            ["targetNamespace", "elementFormDefault"],
        )?;

        context.push_target(namespace, element_form.as_deref() == Some("qualified"));
        Ok(())
    }

    fn element_state<B: BufRead>(
        &mut self,
        context: &DocumentContext,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
        top_level: bool,
    ) -> Result<ParseState, WsdlError> {
        let [name, ty, reference] =
            get_attributes(reader, start.attributes(), ["name", "type", "ref"])?;

        let ty = self.resolve_optional(context, ty)?;
        let reference = self.resolve_optional(context, reference)?;

        let name = match (name, &reference) {
            (Some(name), _) => name,
            (None, Some(reference)) => reference.name.clone(),
            (None, None) => {
                return Err(WsdlError::MissingAttribute {
                    element: "element",
                    attribute: "name",
                })
            }
        };

        Ok(ParseState::Element {
            name,
            ty,
            reference,
            inner: None,
            top_level,
        })
    }

    fn attribute_state<B: BufRead>(
        &mut self,
        context: &DocumentContext,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<ParseState, WsdlError> {
        let [name, ty, reference, array_type] = get_attributes(
            reader,
            start.attributes(),
            ["name", "type", "ref", "arrayType"],
        )?;

        let array_type = array_type
            .map(|array_type| {
                self.resolve_namespace(context, strip_array_dimensions(&array_type))
            })
            .transpose()?;

        Ok(ParseState::Attribute {
            name,
            ty: self.resolve_optional(context, ty)?,
            reference: self.resolve_optional(context, reference)?,
            inner: None,
            array_type,
        })
    }

    fn handle_start<B: BufRead>(
        &mut self,
        context: &mut DocumentContext,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<(), WsdlError> {
        let mut declared = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?;

            match split_prefixed_name(key) {
                (None, "xmlns") => {
                    declared.push((None, attribute.unescape_and_decode_value(reader)?))
                }
                (Some("xmlns"), prefix) => declared.push((
                    Some(prefix.to_owned()),
                    attribute.unescape_and_decode_value(reader)?,
                )),
                _ => (),
            }
        }
        context.push_scope(declared);

        let (prefix, local_name) = split_prefixed_name(reader.decode(start.name())?);
        let element_namespace = context.lookup(prefix);

        let state = stack.pop();
        let mut new_state = ParseState::Other;

        match state {
            None => match local_name {
                "definitions" => {
                    let [namespace] =
                        get_attributes(reader, start.attributes(), ["targetNamespace"])?;

                    if self.definition.target_namespace.is_none() {
                        self.definition.target_namespace = namespace.clone();
                    }

                    context.push_target(namespace, false);
                    new_state = ParseState::Definitions;
                }

                "schema" => {
                    self.push_schema(context, reader, start)?;
                    new_state = ParseState::Schema;
                }

                _ => return Err(WsdlError::UnexpectedRoot(context.url.to_string())),
            },

            Some(ParseState::Definitions) => match local_name {
                "import" => {
                    let [location] = get_attributes(reader, start.attributes(), ["location"])?;

                    if let Some(location) = location {
                        self.import(context, &location)?;
                    }

                    new_state = ParseState::Import;
                }

                "types" => new_state = ParseState::Types,

                "message" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Message {
                        name: required(name, "message", "name")?,
                        parts: Vec::new(),
                    };
                }

                "portType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::PortType {
                        name: required(name, "portType", "name")?,
                        operations: Vec::new(),
                    };
                }

                "binding" => {
                    let [name, ty] = get_attributes(reader, start.attributes(), ["name", "type"])?;

                    let name = required(name, "binding", "name")?;
                    let ty = required(ty, "binding", "type")?;

                    new_state = ParseState::Binding {
                        name,
                        ty: self.resolve_namespace(context, &ty)?,
                        version: None,
                        style: None,
                        operations: Vec::new(),
                    };
                }

                "service" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Service {
                        name: required(name, "service", "name")?,
                        ports: Vec::new(),
                    };
                }

                _ => trace!("found {} inside definitions block", local_name),
            },

            Some(ParseState::Types) => match local_name {
                "schema" => {
                    self.push_schema(context, reader, start)?;
                    new_state = ParseState::Schema;
                }

                _ => trace!("found {} inside types block", local_name),
            },

            Some(ParseState::Schema) => match local_name {
                "element" => new_state = self.element_state(context, reader, start, true)?,

                "complexType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::ComplexType {
                        name: Some(required(name, "complexType", "name")?),
                        kind: None,
                    };
                }

                "simpleType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::SimpleType {
                        name: Some(required(name, "simpleType", "name")?),
                        kind: None,
                    };
                }

                "include" | "import" => {
                    let [location] =
                        get_attributes(reader, start.attributes(), ["schemaLocation"])?;

                    if let Some(location) = location {
                        self.import(context, &location)?;
                    }

                    new_state = ParseState::Import;
                }

                _ => trace!("found {} inside schema block", local_name),
            },

            Some(ParseState::Element { .. }) => match local_name {
                "complexType" => {
                    new_state = ParseState::ComplexType {
                        name: None,
                        kind: None,
                    }
                }

                "simpleType" => {
                    new_state = ParseState::SimpleType {
                        name: None,
                        kind: None,
                    }
                }

                _ => trace!("found {} inside element block", local_name),
            },

            Some(ParseState::ComplexType { .. }) => match local_name {
                "sequence" | "all" | "choice" => new_state = ParseState::Particle(Vec::new()),

                "complexContent" => new_state = ParseState::ComplexContent { kind: None },

                "simpleContent" => new_state = ParseState::SimpleContent { kind: None },

                "attribute" => new_state = self.attribute_state(context, reader, start)?,

                _ => trace!("found {} inside complex type block", local_name),
            },

            Some(ParseState::ComplexContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = required(base, "complexContent", "base")?;

                    new_state = ParseState::ComplexDerivation {
                        base: self.resolve_namespace(context, &base)?,
                        fields: Vec::new(),
                        array_item: None,
                    };
                }

                _ => trace!("found {} inside complex content block", local_name),
            },

            Some(ParseState::ComplexDerivation { .. }) => match local_name {
                "sequence" | "all" | "choice" => new_state = ParseState::Particle(Vec::new()),

                "attribute" => new_state = self.attribute_state(context, reader, start)?,

                _ => trace!("found {} inside complex derivation block", local_name),
            },

            Some(ParseState::SimpleContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = required(base, "simpleContent", "base")?;

                    new_state = ParseState::SimpleDerivation {
                        base: self.resolve_namespace(context, &base)?,
                        attributes: Vec::new(),
                    };
                }

                _ => trace!("found {} inside simple content block", local_name),
            },

            Some(ParseState::SimpleDerivation { .. }) => match local_name {
                "attribute" => new_state = self.attribute_state(context, reader, start)?,

                _ => trace!("found {} inside simple derivation block", local_name),
            },

            Some(ParseState::Particle(_)) => match local_name {
                "element" => new_state = self.element_state(context, reader, start, false)?,

                "sequence" | "all" | "choice" => new_state = ParseState::Particle(Vec::new()),

                _ => trace!("found {} inside particle block", local_name),
            },

            Some(
                ParseState::Attribute { .. }
                | ParseState::Restriction { .. }
                | ParseState::Union { .. }
                | ParseState::List { .. },
            ) => match local_name {
                "simpleType" => {
                    new_state = ParseState::SimpleType {
                        name: None,
                        kind: None,
                    }
                }

                _ => trace!("found {} inside simple type content", local_name),
            },

            Some(ParseState::SimpleType { .. }) => match local_name {
                "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;

                    new_state = ParseState::Restriction {
                        base: self.resolve_optional(context, base)?,
                        inner: None,
                    };
                }

                "union" => {
                    let [member_types] =
                        get_attributes(reader, start.attributes(), ["memberTypes"])?;

                    let members = member_types
                        .unwrap_or_default()
                        .split_whitespace()
                        .map(|member| self.resolve_namespace(context, member))
                        .collect::<Result<Vec<_>, _>>()?;

                    new_state = ParseState::Union { members };
                }

                "list" => {
                    let [item] = get_attributes(reader, start.attributes(), ["itemType"])?;

                    new_state = ParseState::List {
                        item: self.resolve_optional(context, item)?,
                        inner: None,
                    };
                }

                _ => trace!("found {} inside simple type block", local_name),
            },

            Some(ParseState::Message { .. }) => match local_name {
                "part" => {
                    let [name, element, ty] =
                        get_attributes(reader, start.attributes(), ["name", "element", "type"])?;

                    let name = required(name, "part", "name")?;
                    let kind = match (element, ty) {
                        (Some(element), _) => {
                            PartKind::Element(self.resolve_namespace(context, &element)?)
                        }
                        (None, Some(ty)) => PartKind::Type(self.resolve_namespace(context, &ty)?),
                        (None, None) => {
                            return Err(WsdlError::MissingAttribute {
                                element: "part",
                                attribute: "type",
                            })
                        }
                    };

                    new_state = ParseState::Part(Part { name, kind });
                }

                _ => trace!("found {} inside message block", local_name),
            },

            Some(ParseState::PortType { .. }) => match local_name {
                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Operation {
                        name: required(name, "operation", "name")?,
                        documentation: None,
                        input: None,
                        output: None,
                    };
                }

                _ => trace!("found {} inside port type block", local_name),
            },

            Some(ParseState::Operation { .. }) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "input" | "output" => {
                    let [message] = get_attributes(reader, start.attributes(), ["message"])?;

                    let message = required(message, "operation", "message")?;
                    let message = self.resolve_namespace(context, &message)?;

                    if local_name == "input" {
                        new_state = ParseState::Input { message }
                    } else {
                        new_state = ParseState::Output { message }
                    }
                }

                _ => trace!("found {} inside operation block", local_name),
            },

            Some(ParseState::Binding { .. }) => match local_name {
                "binding" => {
                    let [style] = get_attributes(reader, start.attributes(), ["style"])?;

                    let version = match element_namespace.as_deref() {
                        Some(WSDL_SOAP11_NS) => Some(SoapVersion::Soap11),
                        Some(WSDL_SOAP12_NS) => Some(SoapVersion::Soap12),
                        _ => None,
                    };

                    new_state = ParseState::SoapBinding { version, style };
                }

                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::BindingOperation {
                        name: required(name, "operation", "name")?,
                        action: None,
                        style: None,
                        input: None,
                        output: None,
                    };
                }

                _ => trace!("found {} inside binding block", local_name),
            },

            Some(ParseState::BindingOperation { .. }) => match local_name {
                "operation" => {
                    let [action, style] =
                        get_attributes(reader, start.attributes(), ["soapAction", "style"])?;

                    new_state = ParseState::OperationAction { action, style };
                }

                "input" => new_state = ParseState::BindingInput(BindingBody::default()),
                "output" => new_state = ParseState::BindingOutput(BindingBody::default()),

                _ => trace!("found {} inside binding operation block", local_name),
            },

            Some(ParseState::BindingInput(_) | ParseState::BindingOutput(_)) => {
                match local_name {
                    "body" => {
                        let [body_use, namespace] =
                            get_attributes(reader, start.attributes(), ["use", "namespace"])?;

                        new_state = ParseState::BindingBody(BindingBody {
                            body_use,
                            namespace,
                        });
                    }

                    _ => trace!("found {} inside binding message block", local_name),
                }
            }

            Some(ParseState::Service { .. }) => match local_name {
                "port" => {
                    let [name, binding] =
                        get_attributes(reader, start.attributes(), ["name", "binding"])?;

                    let name = required(name, "port", "name")?;
                    let binding = required(binding, "port", "binding")?;

                    new_state = ParseState::Port {
                        name,
                        binding: self.resolve_namespace(context, &binding)?,
                        location: None,
                    };
                }

                _ => trace!("found {} inside service block", local_name),
            },

            Some(ParseState::Port { .. }) => match local_name {
                "address" => {
                    let [location] = get_attributes(reader, start.attributes(), ["location"])?;

                    new_state = ParseState::Address {
                        location: required(location, "address", "location")?,
                    };
                }

                _ => trace!("found {} inside port block", local_name),
            },

            Some(ref other) => trace!("found {} inside {:?}", local_name, other),
        }

        stack.extend(state);
        stack.push(new_state);

        Ok(())
    }

    fn handle_end(
        &mut self,
        context: &mut DocumentContext,
        stack: &mut Vec<ParseState>,
    ) -> Result<(), WsdlError> {
        context.pop_scope();

        let finished_state = stack.pop();
        let mut next_state = stack.pop();

        match finished_state {
            Some(ParseState::Definitions | ParseState::Schema) => context.pop_target(),

            Some(ParseState::Element {
                name,
                ty,
                reference,
                inner,
                top_level,
            }) => {
                if top_level {
                    let name = self.target_namespaced(context, name);

                    let ty = if let Some(kind) = inner {
                        let index = self.definition.types.len();
                        self.definition.types.push(Type {
                            name: name.clone(),
                            kind,
                            anonymous: true,
                        });
                        ElementType::Anonymous(index)
                    } else if let Some(ty) = ty {
                        ElementType::Named(ty)
                    } else {
                        ElementType::Untyped
                    };

                    self.definition.elements.push(ElementDecl { name, ty });
                } else if let Some(ParseState::Particle(ref mut fields)) = next_state {
                    let qualified = match &reference {
                        Some(reference) => Some(self.namespaces.get(reference).to_owned()),
                        None if context.qualified_elements() => Some(context.target()),
                        None => None,
                    }
                    .filter(|namespace| !namespace.is_empty());

                    let ty = match (inner, ty, reference) {
                        (Some(kind), _, _) => FieldKind::Inner(kind),
                        (None, Some(ty), _) => FieldKind::Type(ty),
                        (None, None, Some(reference)) => FieldKind::Ref(reference),
                        (None, None, None) => FieldKind::Untyped,
                    };

                    fields.push(Field {
                        name,
                        ty,
                        attribute: false,
                        qualified,
                    });
                }
            }

            Some(ParseState::ComplexType { name, kind }) => {
                let kind = kind.unwrap_or(TypeKind::Complex {
                    base: None,
                    fields: Vec::new(),
                    array_item: None,
                });

                match next_state {
                    Some(ParseState::Element { ref mut inner, .. }) => *inner = Some(kind),

                    Some(ParseState::Schema) => {
                        if let Some(name) = name {
                            let name = self.target_namespaced(context, name);
                            self.definition.types.push(Type {
                                name,
                                kind,
                                anonymous: false,
                            });
                        }
                    }

                    _ => trace!("dropping complex type outside of schema or element"),
                }
            }

            Some(ParseState::Particle(fields)) => match next_state {
                Some(ParseState::ComplexType { ref mut kind, .. }) => {
                    if let Some(complex) = complex_fields(kind) {
                        complex.extend(fields)
                    }
                }

                Some(
                    ParseState::ComplexDerivation {
                        fields: ref mut parent,
                        ..
                    }
                    | ParseState::Particle(ref mut parent),
                ) => parent.extend(fields),

                _ => (),
            },

            Some(ParseState::ComplexContent { kind }) => {
                if let Some(ParseState::ComplexType {
                    kind: ref mut parent,
                    ..
                }) = next_state
                {
                    *parent = kind;
                }
            }

            Some(ParseState::ComplexDerivation {
                base,
                fields,
                array_item,
            }) => {
                if let Some(ParseState::ComplexContent { ref mut kind }) = next_state {
                    *kind = Some(TypeKind::Complex {
                        base: Some(base),
                        fields,
                        array_item,
                    });
                }
            }

            Some(ParseState::SimpleContent { kind }) => {
                if let Some(ParseState::ComplexType {
                    kind: ref mut parent,
                    ..
                }) = next_state
                {
                    *parent = kind;
                }
            }

            Some(ParseState::SimpleDerivation { base, attributes }) => {
                if let Some(ParseState::SimpleContent { ref mut kind }) = next_state {
                    *kind = Some(TypeKind::SimpleContent { base, attributes });
                }
            }

            Some(ParseState::Attribute {
                name,
                reference,
                ty,
                inner,
                array_type,
            }) => {
                if let (Some(array_type), Some(ParseState::ComplexDerivation { array_item, .. })) =
                    (&array_type, &mut next_state)
                {
                    *array_item = Some(array_type.clone());
                } else if let Some(name) =
                    name.or_else(|| reference.as_ref().map(|reference| reference.name.clone()))
                {
                    let ty = match (inner, ty, reference) {
                        (Some(kind), _, _) => FieldKind::Inner(kind),
                        (None, Some(ty), _) => FieldKind::Type(ty),
                        (None, None, Some(reference)) => FieldKind::Ref(reference),
                        (None, None, None) => FieldKind::Untyped,
                    };

                    let field = Field {
                        name,
                        ty,
                        attribute: true,
                        qualified: None,
                    };

                    match next_state {
                        Some(ParseState::ComplexType { ref mut kind, .. }) => {
                            if let Some(fields) = complex_fields(kind) {
                                fields.push(field)
                            }
                        }

                        Some(
                            ParseState::ComplexDerivation {
                                fields: ref mut parent,
                                ..
                            }
                            | ParseState::SimpleDerivation {
                                attributes: ref mut parent,
                                ..
                            },
                        ) => parent.push(field),

                        _ => (),
                    }
                }
            }

            Some(ParseState::SimpleType { name, kind }) => {
                let kind = match kind {
                    Some(kind) => kind,
                    None => {
                        trace!("dropping simple type without content");
                        stack.extend(next_state);
                        return Ok(());
                    }
                };

                match next_state {
                    Some(ParseState::Schema) => {
                        if let Some(name) = name {
                            let name = self.target_namespaced(context, name);
                            self.definition.types.push(Type {
                                name,
                                kind,
                                anonymous: false,
                            });
                        }
                    }

                    Some(
                        ParseState::Element { ref mut inner, .. }
                        | ParseState::Attribute { ref mut inner, .. }
                        | ParseState::Restriction { ref mut inner, .. }
                        | ParseState::List { ref mut inner, .. },
                    ) => *inner = Some(kind),

                    Some(ParseState::Union { ref mut members }) => {
                        let member = match kind {
                            TypeKind::Restriction(base) => base,
                            _ => self.xsd_name("anySimpleType"),
                        };
                        members.push(member);
                    }

                    _ => (),
                }
            }

            Some(ParseState::Restriction { base, inner }) => {
                let base = base.or(match inner {
                    Some(TypeKind::Restriction(base)) => Some(base),
                    _ => None,
                });

                if let (Some(base), Some(ParseState::SimpleType { kind, .. })) =
                    (base, &mut next_state)
                {
                    *kind = Some(TypeKind::Restriction(base));
                }
            }

            Some(ParseState::Union { members }) => {
                if let Some(ParseState::SimpleType { ref mut kind, .. }) = next_state {
                    *kind = Some(TypeKind::Union(members));
                }
            }

            Some(ParseState::List { item, inner }) => {
                let item = item.or(match inner {
                    Some(TypeKind::Restriction(base)) => Some(base),
                    _ => None,
                });

                if let (Some(item), Some(ParseState::SimpleType { kind, .. })) =
                    (item, &mut next_state)
                {
                    *kind = Some(TypeKind::List(item));
                }
            }

            Some(ParseState::Message { name, parts }) => {
                let name = self.target_namespaced(context, name);
                self.definition.messages.push(Message { name, parts })
            }

            Some(ParseState::Part(part)) => {
                if let Some(ParseState::Message { ref mut parts, .. }) = next_state {
                    parts.push(part)
                }
            }

            Some(ParseState::PortType { name, operations }) => {
                let name = self.target_namespaced(context, name);
                self.definition
                    .port_types
                    .push(PortType { name, operations })
            }

            Some(ParseState::Operation {
                name,
                input,
                output,
                documentation,
            }) => {
                if let Some(ParseState::PortType {
                    ref mut operations, ..
                }) = next_state
                {
                    operations.push(Operation {
                        name: self.target_namespaced(context, name),
                        input,
                        output,
                        documentation,
                    })
                }
            }

            Some(ParseState::Documentation(text)) => {
                if let Some(ParseState::Operation {
                    ref mut documentation,
                    ..
                }) = next_state
                {
                    *documentation = text
                }
            }

            Some(ParseState::Input { message }) => {
                if let Some(ParseState::Operation { ref mut input, .. }) = next_state {
                    *input = Some(message)
                }
            }

            Some(ParseState::Output { message }) => {
                if let Some(ParseState::Operation { ref mut output, .. }) = next_state {
                    *output = Some(message)
                }
            }

            Some(ParseState::SoapBinding {
                version: soap_version,
                style: soap_style,
            }) => {
                if let Some(ParseState::Binding {
                    ref mut version,
                    ref mut style,
                    ..
                }) = next_state
                {
                    *version = soap_version;
                    *style = soap_style;
                }
            }

            Some(ParseState::Binding {
                name,
                ty,
                version,
                style,
                operations,
            }) => {
                let name = self.target_namespaced(context, name);
                self.definition.bindings.push(Binding {
                    name,
                    ty,
                    version,
                    style,
                    operations,
                })
            }

            Some(ParseState::BindingOperation {
                name,
                action,
                style,
                input,
                output,
            }) => {
                if let Some(ParseState::Binding {
                    ref mut operations, ..
                }) = next_state
                {
                    operations.push(BindingOperation {
                        name: self.target_namespaced(context, name),
                        action,
                        style,
                        input,
                        output,
                    })
                }
            }

            Some(ParseState::OperationAction { action, style }) => {
                if let Some(ParseState::BindingOperation {
                    action: ref mut a,
                    style: ref mut s,
                    ..
                }) = next_state
                {
                    *a = action;
                    *s = style;
                }
            }

            Some(ParseState::BindingInput(body)) => {
                if let Some(ParseState::BindingOperation { ref mut input, .. }) = next_state {
                    *input = Some(body)
                }
            }

            Some(ParseState::BindingOutput(body)) => {
                if let Some(ParseState::BindingOperation { ref mut output, .. }) = next_state {
                    *output = Some(body)
                }
            }

            Some(ParseState::BindingBody(body)) => match next_state {
                Some(ParseState::BindingInput(ref mut parent) | ParseState::BindingOutput(ref mut parent)) => {
                    *parent = body
                }
                _ => (),
            },

            Some(ParseState::Service { name, ports }) => {
                let name = self.target_namespaced(context, name);
                self.definition.services.push(Service { name, ports })
            }

            Some(ParseState::Port {
                name,
                binding,
                location,
            }) => {
                if let Some(ParseState::Service { ref mut ports, .. }) = next_state {
                    ports.push(Port {
                        name: self.target_namespaced(context, name),
                        binding,
                        location,
                    })
                }
            }

            Some(ParseState::Address { location }) => {
                if let Some(ParseState::Port {
                    location: ref mut address,
                    ..
                }) = next_state
                {
                    *address = Some(location)
                }
            }

            _ => (),
        }

        stack.extend(next_state);
        Ok(())
    }

    fn handle_text<B: BufRead>(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        text: &BytesText<'_>,
    ) -> Result<(), WsdlError> {
        if let Some(ParseState::Documentation(docs)) = stack.last_mut() {
            let text = text.unescape_and_decode(reader)?;
            docs.get_or_insert_with(String::new).push_str(&text);
        }

        Ok(())
    }
}

pub fn parse(loader: &dyn Loader, url: Url) -> Result<(Definition, Namespaces), WsdlError> {
    Parser::new(loader).parse(url)
}
