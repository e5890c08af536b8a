use log::debug;
use std::sync::Arc;

use lather_util::{
    soap::{Envelope, SoapRequest, SoapVersion, APACHE_NS, XSD_NS, XSI_NS},
    xml::{XmlWriter, NO_ATTRIBUTES},
};
use lather_wsdl::metadata::{BodyUse, Metadata, Method, Style, Type, TypeShape};

use crate::{
    classmap::ClassMap,
    error::EncodeError,
    guess::{TypeGuesser, TypeTag},
    primitive::Primitive,
    resolve::{Resolved, Resolver},
    value::Value,
};

const ITEM: &str = "item";

/// Writes call arguments as SOAP request envelopes.
#[derive(Debug, Clone)]
pub struct Encoder {
    metadata: Arc<Metadata>,
    class_map: ClassMap,
}

impl Encoder {
    pub fn new(metadata: Arc<Metadata>) -> Self {
        Self {
            metadata,
            class_map: ClassMap::default(),
        }
    }

    pub fn with_class_map(self, class_map: ClassMap) -> Self {
        Self { class_map, ..self }
    }

    /// Encodes a call of `method`. Missing trailing arguments are written as
    /// nil.
    pub fn encode(&self, method: &str, args: &[Value]) -> Result<SoapRequest, EncodeError> {
        let method = self.metadata.methods().fetch_by_name(method)?;

        if args.len() > method.parameters.len() {
            return Err(EncodeError::TooManyArguments {
                method: method.name.clone(),
                expected: method.parameters.len(),
                actual: args.len(),
            });
        }

        debug!("encoding {} request", method.name);

        let version = method.meta.soap_version;
        let prefixes = self.prefixes(method, version);

        let mut envelope = prefixes
            .declared
            .iter()
            .fold(Envelope::new(version), |envelope, (prefix, namespace)| {
                envelope.with_namespace(prefix, namespace)
            });
        if method.meta.input.body_use == BodyUse::Encoded {
            envelope = envelope.encoded();
        }

        let writer = ValueWriter {
            resolver: Resolver::new(&self.metadata),
            class_map: &self.class_map,
            guesser: TypeGuesser::new(version),
            prefixes: &prefixes,
        };

        let xml = envelope.write(|xml| writer.body(xml, method, args))?;

        Ok(SoapRequest {
            xml,
            location: method.meta.location.clone(),
            action: method.meta.action.clone(),
            version,
            one_way: method.meta.one_way,
        })
    }

    /// Envelope prefixes: the body namespace, the reserved namespaces, then
    /// every namespace a written element or type may need.
    fn prefixes(&self, method: &Method, version: SoapVersion) -> Prefixes {
        let mut prefixes = Prefixes::default();

        if let Some(namespace) = &method.meta.input.namespace {
            prefixes.declare("ns1", namespace);
        }
        prefixes.declare("xsd", XSD_NS);
        prefixes.declare("xsi", XSI_NS);
        prefixes.declare("SOAP-ENC", version.encoding_namespace());
        prefixes.declare("apache", APACHE_NS);

        for parameter in &method.parameters {
            if let Some(element) = &parameter.element {
                prefixes.generate(&element.namespace);
            }
        }
        for ty in self.metadata.types() {
            if let Some(namespace) = ty.namespace() {
                prefixes.generate(namespace);
            }
            for property in &ty.properties {
                if let Some(namespace) = &property.namespace {
                    prefixes.generate(namespace);
                }
            }
        }

        prefixes
    }
}

#[derive(Debug, Default)]
struct Prefixes {
    declared: Vec<(String, String)>,
    generated: usize,
}

impl Prefixes {
    fn declare(&mut self, prefix: &str, namespace: &str) {
        if !namespace.is_empty() && self.prefix(namespace).is_none() {
            self.declared.push((prefix.to_owned(), namespace.to_owned()));
        }
    }

    fn generate(&mut self, namespace: &str) {
        if !namespace.is_empty() && self.prefix(namespace).is_none() {
            self.generated += 1;
            let prefix = format!("ns{}", self.generated + 1);
            self.declared.push((prefix, namespace.to_owned()));
        }
    }

    fn prefix(&self, namespace: &str) -> Option<&str> {
        self.declared
            .iter()
            .find(|(_, candidate)| candidate == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    fn qualify(&self, namespace: Option<&str>, local: &str) -> String {
        match namespace.and_then(|namespace| self.prefix(namespace)) {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_owned(),
        }
    }
}

type Attributes = Vec<(String, String)>;

struct ValueWriter<'m> {
    resolver: Resolver<'m>,
    class_map: &'m ClassMap,
    guesser: TypeGuesser,
    prefixes: &'m Prefixes,
}

impl<'m> ValueWriter<'m> {
    fn body(&self, xml: &mut XmlWriter, method: &Method, args: &[Value]) -> Result<(), EncodeError> {
        match method.meta.style {
            Style::Rpc => {
                let wrapper = self
                    .prefixes
                    .qualify(method.meta.input.namespace.as_deref(), &method.name);

                xml.start(&wrapper, NO_ATTRIBUTES)?;
                for (index, parameter) in method.parameters.iter().enumerate() {
                    let value = args.get(index).unwrap_or(&Value::Null);
                    let declared = self.resolver.resolve_xsd(&parameter.ty);
                    self.element(xml, &parameter.name, value, declared)?;
                }
                xml.end(&wrapper)?;
            }

            Style::Document => {
                for (index, parameter) in method.parameters.iter().enumerate() {
                    let value = args.get(index).unwrap_or(&Value::Null);
                    let declared = self.resolver.resolve_xsd(&parameter.ty);
                    let name = match &parameter.element {
                        Some(element) => self
                            .prefixes
                            .qualify(Some(&element.namespace), &element.name),
                        None => parameter.name.clone(),
                    };

                    self.element(xml, &name, value, declared)?;
                }
            }
        }

        Ok(())
    }

    fn type_attribute(&self, namespace: Option<&str>, name: &str) -> (String, String) {
        (
            self.prefixes.qualify(Some(XSI_NS), "type"),
            self.prefixes.qualify(namespace, name),
        )
    }

    fn tag_attribute(&self, tag: TypeTag) -> (String, String) {
        self.type_attribute(Some(tag.namespace), tag.name)
    }

    fn mismatch(ty: impl Into<String>, value: &Value) -> EncodeError {
        EncodeError::Mismatch {
            ty: ty.into(),
            kind: value.kind(),
        }
    }

    /// Writes `value` as element `name` of the declared type.
    fn element(
        &self,
        xml: &mut XmlWriter,
        name: &str,
        value: &Value,
        declared: Resolved<'m>,
    ) -> Result<(), EncodeError> {
        if value.is_null() {
            xml.empty(name, [(self.prefixes.qualify(Some(XSI_NS), "nil"), "true")])?;
            return Ok(());
        }

        match declared {
            Resolved::Primitive(primitive) => {
                let text = primitive
                    .encode(value)
                    .ok_or_else(|| Self::mismatch(primitive.name(), value))?;
                xml.text_element(name, NO_ATTRIBUTES, &text)?;
            }

            Resolved::Catalog(ty) => self.catalog(xml, name, value, ty, Vec::new())?,

            Resolved::EncArray => match value {
                Value::List(items) => self.encoded_array(xml, name, items)?,
                _ => return Err(Self::mismatch("Array", value)),
            },

            Resolved::ApacheMap => {
                let fields = value.fields().ok_or_else(|| Self::mismatch("Map", value))?;
                self.apache_map(xml, name, &fields)?;
            }

            Resolved::EncStruct => {
                let fields = value
                    .fields()
                    .ok_or_else(|| Self::mismatch("Struct", value))?;
                self.encoded_struct(xml, name, &fields)?;
            }

            Resolved::Untyped => self.guessed(xml, name, value)?,
        }

        Ok(())
    }

    /// Writes a value without a declared type, tagging it with `xsi:type`.
    fn guessed(&self, xml: &mut XmlWriter, name: &str, value: &Value) -> Result<(), EncodeError> {
        if value.is_null() {
            return self.element(xml, name, value, Resolved::Untyped);
        }

        if let Value::Object { class, .. } = value {
            let mapped = self
                .class_map
                .type_for(class)
                .map(|type_name| self.resolver.resolve_local(None, type_name));

            if let Some(Resolved::Catalog(ty)) = mapped {
                let attribute = self.type_attribute(ty.namespace(), &ty.name);
                return self.catalog(xml, name, value, ty, vec![attribute]);
            }
        }

        if let Some(primitive) = TypeGuesser::guess_primitive(value) {
            let text = primitive
                .encode(value)
                .ok_or_else(|| Self::mismatch(primitive.name(), value))?;
            xml.text_element(name, [self.tag_attribute(TypeTag::xsd(primitive))], &text)?;
            return Ok(());
        }

        match value {
            Value::List(items) => self.encoded_array(xml, name, items),
            Value::Map(_) => self.apache_map(xml, name, &value.fields().unwrap_or_default()),
            _ => self.encoded_struct(xml, name, &value.fields().unwrap_or_default()),
        }
    }

    fn encoded_array(&self, xml: &mut XmlWriter, name: &str, items: &[Value]) -> Result<(), EncodeError> {
        let mut tags = items.iter().map(|item| self.guesser.guess(item));
        let common = match tags.next().flatten() {
            Some(first) if tags.all(|tag| tag == Some(first)) => first,
            _ => TypeTag::xsd_any(),
        };

        let attributes = vec![
            self.tag_attribute(TypeTag::encoding(self.guesser.version(), "Array")),
            (
                self.prefixes
                    .qualify(Some(self.guesser.version().encoding_namespace()), "arrayType"),
                format!(
                    "{}[{}]",
                    self.prefixes.qualify(Some(common.namespace), common.name),
                    items.len()
                ),
            ),
        ];

        xml.start(name, attributes)?;
        for item in items {
            self.guessed(xml, ITEM, item)?;
        }
        xml.end(name)?;
        Ok(())
    }

    fn apache_map(
        &self,
        xml: &mut XmlWriter,
        name: &str,
        entries: &[(&str, &Value)],
    ) -> Result<(), EncodeError> {
        xml.start(
            name,
            [self.type_attribute(Some(APACHE_NS), "Map")],
        )?;
        for (key, value) in entries {
            xml.start(ITEM, NO_ATTRIBUTES)?;
            self.guessed(xml, "key", &Value::String((*key).to_owned()))?;
            self.guessed(xml, "value", value)?;
            xml.end(ITEM)?;
        }
        xml.end(name)?;
        Ok(())
    }

    fn encoded_struct(
        &self,
        xml: &mut XmlWriter,
        name: &str,
        fields: &[(&str, &Value)],
    ) -> Result<(), EncodeError> {
        xml.start(
            name,
            [self.tag_attribute(TypeTag::encoding(self.guesser.version(), "Struct"))],
        )?;
        for (field, value) in fields {
            self.guessed(xml, field, value)?;
        }
        xml.end(name)?;
        Ok(())
    }

    /// Lexical form of a value of a simple type.
    fn text(&self, value: &Value, resolved: Resolved<'m>) -> Result<String, EncodeError> {
        match resolved {
            Resolved::Primitive(primitive) => primitive
                .encode(value)
                .ok_or_else(|| Self::mismatch(primitive.name(), value)),

            Resolved::Catalog(ty) => match ty.shape {
                TypeShape::Simple => match self.resolver.simple_base(ty) {
                    Resolved::Catalog(base) if base.shape == TypeShape::Simple => {
                        Primitive::String
                            .encode(value)
                            .ok_or_else(|| Self::mismatch(&ty.name, value))
                    }
                    base => self.text(value, base),
                },

                TypeShape::List => {
                    let items = value
                        .as_list()
                        .ok_or_else(|| Self::mismatch(&ty.name, value))?;
                    let item = self.resolver.resolve_member(ty);

                    Ok(items
                        .iter()
                        .map(|member| self.text(member, item))
                        .collect::<Result<Vec<_>, _>>()?
                        .join(" "))
                }

                TypeShape::Union => TypeGuesser::guess_primitive(value)
                    .and_then(|primitive| primitive.encode(value))
                    .ok_or_else(|| Self::mismatch(&ty.name, value)),

                _ => Err(Self::mismatch(&ty.name, value)),
            },

            Resolved::Untyped => TypeGuesser::guess_primitive(value)
                .and_then(|primitive| primitive.encode(value))
                .ok_or_else(|| Self::mismatch("anySimpleType", value)),

            _ => Err(Self::mismatch("simple type", value)),
        }
    }

    fn catalog(
        &self,
        xml: &mut XmlWriter,
        name: &str,
        value: &Value,
        ty: &'m Type,
        mut attributes: Attributes,
    ) -> Result<(), EncodeError> {
        match ty.shape {
            TypeShape::Complex => {
                let fields = value
                    .fields()
                    .ok_or_else(|| Self::mismatch(&ty.name, value))?;

                if ty.properties.is_empty() {
                    xml.start(name, attributes)?;
                    for (field, value) in &fields {
                        self.guessed(xml, field, value)?;
                    }
                    xml.end(name)?;
                    return Ok(());
                }

                let field = |name: &str| {
                    fields
                        .iter()
                        .find(|(field, _)| *field == name)
                        .map(|(_, value)| *value)
                };

                for property in ty.properties.iter().filter(|property| property.attribute) {
                    if let Some(value) = field(&property.name).filter(|value| !value.is_null()) {
                        let text = self.text(value, self.resolver.resolve_xsd(&property.ty))?;
                        attributes.push((property.name.clone(), text));
                    }
                }

                xml.start(name, attributes)?;
                for property in ty.properties.iter().filter(|property| !property.attribute) {
                    let value = match field(&property.name) {
                        Some(value) => value,
                        None => continue,
                    };

                    let child = self
                        .prefixes
                        .qualify(property.namespace.as_deref(), &property.name);
                    let declared = self.resolver.resolve_xsd(&property.ty);

                    match (value, declared) {
                        (Value::List(items), Resolved::Primitive(_))
                        | (Value::List(items), Resolved::Catalog(Type {
                            shape:
                                TypeShape::Complex | TypeShape::SimpleContent | TypeShape::Simple | TypeShape::Union,
                            ..
                        })) => {
                            for item in items {
                                self.element(xml, &child, item, declared)?;
                            }
                        }
                        _ => self.element(xml, &child, value, declared)?,
                    }
                }
                xml.end(name)?;
            }

            TypeShape::SimpleContent => {
                let fields = value.fields();
                let mut content = None;

                for property in &ty.properties {
                    let declared = self.resolver.resolve_xsd(&property.ty);

                    if property.is_content() {
                        let own = match &fields {
                            Some(fields) => fields
                                .iter()
                                .find(|(field, _)| *field == property.name)
                                .map(|(_, value)| *value),
                            None => Some(value),
                        };
                        content = own.map(|own| self.text(own, declared)).transpose()?;
                    } else if let Some(own) = fields.as_ref().and_then(|fields| {
                        fields
                            .iter()
                            .find(|(field, _)| *field == property.name)
                            .map(|(_, value)| *value)
                    }) {
                        if !own.is_null() {
                            attributes.push((property.name.clone(), self.text(own, declared)?));
                        }
                    }
                }

                match content {
                    Some(text) => xml.text_element(name, attributes, &text)?,
                    None => xml.empty(name, attributes)?,
                }
            }

            TypeShape::Simple | TypeShape::Union | TypeShape::List => {
                let text = self.text(value, Resolved::Catalog(ty))?;
                xml.text_element(name, attributes, &text)?;
            }

            TypeShape::Array => {
                let items = value
                    .as_list()
                    .ok_or_else(|| Self::mismatch(&ty.name, value))?;

                let item = self.resolver.resolve_member(ty);
                let item_name = match item {
                    Resolved::Primitive(primitive) => {
                        self.prefixes.qualify(Some(XSD_NS), primitive.name())
                    }
                    Resolved::Catalog(member) => {
                        self.prefixes.qualify(member.namespace(), &member.name)
                    }
                    _ => self.prefixes.qualify(Some(XSD_NS), "anyType"),
                };

                attributes.push((
                    self.prefixes
                        .qualify(Some(self.guesser.version().encoding_namespace()), "arrayType"),
                    format!("{}[{}]", item_name, items.len()),
                ));

                xml.start(name, attributes)?;
                for member in items {
                    self.element(xml, ITEM, member, item)?;
                }
                xml.end(name)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lather_util::soap::SOAP12_ENCODING_NS;

    #[test]
    fn generates_prefixes_for_new_namespaces_only() {
        let mut prefixes = Prefixes::default();
        prefixes.declare("ns1", "urn:body");
        prefixes.declare("SOAP-ENC", SOAP12_ENCODING_NS);
        prefixes.generate("urn:types");
        prefixes.generate("urn:body");
        prefixes.generate("urn:more");

        assert_eq!(prefixes.prefix("urn:types"), Some("ns2"));
        assert_eq!(prefixes.prefix("urn:more"), Some("ns3"));
        assert_eq!(prefixes.qualify(Some("urn:body"), "call"), "ns1:call");
        assert_eq!(prefixes.qualify(None, "input"), "input");
        assert_eq!(prefixes.qualify(Some("urn:unknown"), "input"), "input");
    }
}
