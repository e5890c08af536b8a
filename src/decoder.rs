use log::{debug, warn};
use std::{collections::BTreeMap, sync::Arc};

use lather_util::{
    soap::{SoapResponse, APACHE_NS, ENCODING_NAMESPACES, XSD_NAMESPACES, XSI_NAMESPACES},
    xml::Element,
};
use lather_wsdl::metadata::{Metadata, Parameter, Style, Type, TypeShape};

use crate::{
    classmap::ClassMap,
    error::DecodeError,
    resolve::{Resolved, Resolver},
    value::Value,
};

/// Reads SOAP responses into [`Value`]s.
#[derive(Debug, Clone)]
pub struct Decoder {
    metadata: Arc<Metadata>,
    class_map: ClassMap,
}

impl Decoder {
    pub fn new(metadata: Arc<Metadata>) -> Self {
        Self {
            metadata,
            class_map: ClassMap::default(),
        }
    }

    pub fn with_class_map(self, class_map: ClassMap) -> Self {
        Self { class_map, ..self }
    }

    /// Decodes the response of `method`.
    ///
    /// A single output part decodes to its value, several to a struct keyed
    /// by part name, none to [`Value::Null`].
    pub fn decode(&self, method: &str, response: &SoapResponse) -> Result<Value, DecodeError> {
        let method = self.metadata.methods().fetch_by_name(method)?;
        let body = response.body()?;

        if let Some(fault) = body
            .children()
            .find(|child| child.local_name() == "Fault" && child.namespace() == body.namespace())
        {
            return Err(fault_error(fault));
        }

        debug!("decoding {} response", method.name);

        let nodes: Vec<&Element> = match method.meta.style {
            Style::Rpc => body
                .children()
                .next()
                .map(|wrapper| wrapper.children().collect())
                .unwrap_or_default(),
            Style::Document => body.children().collect(),
        };

        let reader = ValueReader {
            resolver: Resolver::new(&self.metadata),
            class_map: &self.class_map,
        };

        let mut values = Vec::with_capacity(method.outputs.len());
        for (index, part) in method.outputs.iter().enumerate() {
            let name = accessor_name(part, method.meta.style);

            let node = nodes
                .iter()
                .find(|node| node.local_name() == name)
                .or_else(|| {
                    let node = nodes.get(index);
                    if let Some(node) = node {
                        warn!(
                            "no {} element in {} response, using {} at position {}",
                            name,
                            method.name,
                            node.local_name(),
                            index
                        );
                    }
                    node
                });

            let value = match node {
                Some(node) => reader.node(node, reader.resolver.resolve_xsd(&part.ty))?,
                None => {
                    debug!("{} response has no {} part", method.name, part.name);
                    Value::Null
                }
            };

            values.push((part.name.clone(), value));
        }

        Ok(match values.len() {
            0 => Value::Null,
            1 => values.pop().map_or(Value::Null, |(_, value)| value),
            _ => Value::Struct(values),
        })
    }
}

fn accessor_name(part: &Parameter, style: Style) -> &str {
    match (style, &part.element) {
        (Style::Document, Some(element)) => element.name.as_str(),
        _ => part.name.as_str(),
    }
}

fn child_text(element: &Element, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(element, |current, name| current.child(name))
        .map(|found| found.text().trim().to_owned())
}

fn fault_error(fault: &Element) -> DecodeError {
    let code = child_text(fault, &["faultcode"])
        .or_else(|| child_text(fault, &["Code", "Value"]))
        .unwrap_or_default();
    let message = child_text(fault, &["faultstring"])
        .or_else(|| child_text(fault, &["Reason", "Text"]))
        .unwrap_or_default();

    DecodeError::Fault { code, message }
}

fn is_nil(node: &Element) -> bool {
    matches!(node.attribute_ns(&XSI_NAMESPACES, "nil"), Some("true" | "1"))
}

/// Child elements grouped by local name, in order of first appearance.
fn grouped_children(node: &Element) -> Vec<(&str, Vec<&Element>)> {
    let mut groups: Vec<(&str, Vec<&Element>)> = Vec::new();

    for child in node.children() {
        match groups
            .iter_mut()
            .find(|(name, _)| *name == child.local_name())
        {
            Some((_, members)) => members.push(child),
            None => groups.push((child.local_name(), vec![child])),
        }
    }

    groups
}

fn strip_dimensions(array_type: &str) -> &str {
    array_type
        .find('[')
        .map_or(array_type, |index| &array_type[..index])
}

struct ValueReader<'m> {
    resolver: Resolver<'m>,
    class_map: &'m ClassMap,
}

impl<'m> ValueReader<'m> {
    fn node(&self, node: &Element, declared: Resolved<'m>) -> Result<Value, DecodeError> {
        if is_nil(node) {
            return Ok(Value::Null);
        }

        match self.node_type(node, declared) {
            Resolved::Primitive(primitive) => self.text(&node.text(), Resolved::Primitive(primitive)),
            Resolved::Catalog(ty) => self.catalog(node, ty),
            Resolved::EncStruct => Ok(Value::Struct(self.untyped_fields(node)?)),
            Resolved::EncArray => self.encoded_array(node),
            Resolved::ApacheMap => self.apache_map(node),
            Resolved::Untyped => self.untyped(node),
        }
    }

    /// The type named on the node itself wins over the declared one.
    fn node_type(&self, node: &Element, declared: Resolved<'m>) -> Resolved<'m> {
        if let Some(value) = node.attribute_ns(&XSI_NAMESPACES, "type") {
            let name = node.resolve_qname(value);

            let resolved = if name.is_unresolved() {
                warn!("undeclared prefix in type {}, looking it up by name", value);
                self.resolver.resolve_local(None, &name.local)
            } else {
                self.resolver
                    .resolve_name(name.namespace.as_deref(), &name.local)
            };

            if !matches!(resolved, Resolved::Untyped) {
                return resolved;
            }
        }

        // Some servers write the SOAP-ENC type without the xsi namespace.
        if let Some(value) = node.attribute("type") {
            let name = node.resolve_qname(value);
            let reserved = name.namespace.as_deref().map_or(false, |namespace| {
                XSD_NAMESPACES.contains(&namespace)
                    || ENCODING_NAMESPACES.contains(&namespace)
                    || namespace == APACHE_NS
            });

            if reserved {
                return self
                    .resolver
                    .resolve_name(name.namespace.as_deref(), &name.local);
            }
        }

        declared
    }

    /// Reads character data as a value of a simple type.
    fn text(&self, text: &str, resolved: Resolved<'m>) -> Result<Value, DecodeError> {
        match resolved {
            Resolved::Primitive(primitive) => {
                primitive.decode(text).ok_or_else(|| DecodeError::Lexical {
                    ty: primitive.name().to_owned(),
                    text: text.to_owned(),
                })
            }

            Resolved::Catalog(ty) => match ty.shape {
                TypeShape::Simple => match self.resolver.simple_base(ty) {
                    Resolved::Catalog(base) if base.shape == TypeShape::Simple => {
                        Ok(Value::String(text.to_owned()))
                    }
                    base => self.text(text, base),
                },
                TypeShape::List => self.list(text, ty),
                _ => Ok(Value::String(text.to_owned())),
            },

            _ => Ok(Value::String(text.to_owned())),
        }
    }

    fn list(&self, text: &str, ty: &'m Type) -> Result<Value, DecodeError> {
        let item = self.resolver.resolve_member(ty);

        text.split_whitespace()
            .map(|token| self.text(token, item))
            .collect::<Result<_, _>>()
            .map(Value::List)
    }

    fn catalog(&self, node: &Element, ty: &'m Type) -> Result<Value, DecodeError> {
        match ty.shape {
            TypeShape::Complex if ty.properties.is_empty() => {
                Ok(self.class_map.hydrate(&ty.name, self.untyped_fields(node)?))
            }

            TypeShape::Complex => {
                let mut fields = Vec::new();

                for property in &ty.properties {
                    let declared = self.resolver.resolve_xsd(&property.ty);

                    if property.attribute {
                        if let Some(text) = node.attribute(&property.name) {
                            fields.push((property.name.clone(), self.text(text, declared)?));
                        }
                        continue;
                    }

                    let mut values = node
                        .children()
                        .filter(|child| child.local_name() == property.name)
                        .map(|child| self.node(child, declared))
                        .collect::<Result<Vec<_>, _>>()?;

                    let value = match values.len() {
                        0 => continue,
                        1 => values.pop().unwrap_or(Value::Null),
                        _ => Value::List(values),
                    };
                    fields.push((property.name.clone(), value));
                }

                Ok(self.class_map.hydrate(&ty.name, fields))
            }

            TypeShape::SimpleContent => {
                let mut fields = Vec::new();

                for property in &ty.properties {
                    let declared = self.resolver.resolve_xsd(&property.ty);

                    if property.is_content() {
                        fields.push((property.name.clone(), self.text(&node.text(), declared)?));
                    } else if let Some(text) = node.attribute(&property.name) {
                        fields.push((property.name.clone(), self.text(text, declared)?));
                    }
                }

                Ok(self.class_map.hydrate(&ty.name, fields))
            }

            TypeShape::Simple | TypeShape::List => self.text(&node.text(), Resolved::Catalog(ty)),

            TypeShape::Union => Ok(Value::String(node.text())),

            TypeShape::Array => {
                let item = self.resolver.resolve_member(ty);
                node.children()
                    .map(|child| self.node(child, item))
                    .collect::<Result<_, _>>()
                    .map(Value::List)
            }
        }
    }

    fn encoded_array(&self, node: &Element) -> Result<Value, DecodeError> {
        let item = node
            .attribute_ns(&ENCODING_NAMESPACES, "arrayType")
            .or_else(|| node.attribute_ns(&ENCODING_NAMESPACES, "itemType"))
            .map_or(Resolved::Untyped, |array_type| {
                let name = node.resolve_qname(strip_dimensions(array_type));
                match name.namespace.as_deref() {
                    Some(namespace) => self.resolver.resolve_name(Some(namespace), &name.local),
                    None => self.resolver.resolve_local(None, &name.local),
                }
            });

        node.children()
            .map(|child| self.node(child, item))
            .collect::<Result<_, _>>()
            .map(Value::List)
    }

    fn apache_map(&self, node: &Element) -> Result<Value, DecodeError> {
        let mut entries = BTreeMap::new();

        for item in node.children() {
            let key = item
                .child("key")
                .ok_or_else(|| DecodeError::MissingElement("key".to_owned()))?;

            let value = match item.child("value") {
                Some(value) => self.node(value, Resolved::Untyped)?,
                None => Value::Null,
            };

            entries.insert(key.text(), value);
        }

        Ok(Value::Map(entries))
    }

    fn untyped(&self, node: &Element) -> Result<Value, DecodeError> {
        if node.has_children() {
            Ok(Value::Struct(self.untyped_fields(node)?))
        } else {
            Ok(Value::String(node.text()))
        }
    }

    /// Children as fields; repeated names collect into a list.
    fn untyped_fields(&self, node: &Element) -> Result<Vec<(String, Value)>, DecodeError> {
        grouped_children(node)
            .into_iter()
            .map(|(name, members)| {
                let mut values = members
                    .into_iter()
                    .map(|member| self.node(member, Resolved::Untyped))
                    .collect::<Result<Vec<_>, _>>()?;

                let value = if values.len() == 1 {
                    values.pop().unwrap_or(Value::Null)
                } else {
                    Value::List(values)
                };

                Ok((name.to_owned(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_array_dimensions() {
        assert_eq!(strip_dimensions("xsd:string[2]"), "xsd:string");
        assert_eq!(strip_dimensions("string[]"), "string");
        assert_eq!(strip_dimensions("xsd:int"), "xsd:int");
    }

    #[test]
    fn reads_soap11_and_soap12_faults() {
        let soap11 = Element::parse(
            "<Fault><faultcode>Server</faultcode><faultstring> boom </faultstring></Fault>",
        )
        .unwrap();
        assert!(matches!(
            fault_error(&soap11),
            DecodeError::Fault { code, message } if code == "Server" && message == "boom"
        ));

        let soap12 = Element::parse(
            "<Fault><Code><Value>Receiver</Value></Code><Reason><Text>boom</Text></Reason></Fault>",
        )
        .unwrap();
        assert!(matches!(
            fault_error(&soap12),
            DecodeError::Fault { code, message } if code == "Receiver" && message == "boom"
        ));
    }

    #[test]
    fn groups_repeated_children() {
        let node = Element::parse("<r><a/><b/><a/></r>").unwrap();
        let groups: Vec<_> = grouped_children(&node)
            .into_iter()
            .map(|(name, members)| (name, members.len()))
            .collect();
        assert_eq!(groups, [("a", 2), ("b", 1)]);
    }
}
