use std::{
    collections::HashMap,
    io::{BufRead, Cursor},
    sync::Arc,
};

pub use quick_xml::{events, Writer};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader,
};

use super::error::XmlError;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Attribute list for elements written without attributes.
pub const NO_ATTRIBUTES: [(&str, &str); 0] = [];

type Scope = Arc<HashMap<Option<String>, String>>;

pub fn split_prefixed_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, prefixed_name),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Read-only element tree with every name resolved against the namespace
/// declarations in scope where it appeared.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    namespaces: Scope,
}

impl QName {
    fn resolve(namespaces: &Scope, prefixed_name: &str, use_default: bool) -> Self {
        let (prefix, local) = split_prefixed_name(prefixed_name);

        let namespace = match prefix {
            Some("xml") => Some(XML_NS.to_owned()),
            Some(prefix) => namespaces.get(&Some(prefix.to_owned())).cloned(),
            None if use_default => namespaces.get(&None).cloned(),
            None => None,
        }
        .filter(|namespace| !namespace.is_empty());

        Self {
            prefix: prefix.map(ToOwned::to_owned),
            local: local.to_owned(),
            namespace,
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }

    /// Whether a prefix was written but could not be mapped to a namespace.
    pub fn is_unresolved(&self) -> bool {
        self.prefix.is_some() && self.namespace.is_none()
    }
}

impl Element {
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let root_scope: Scope = Default::default();
        let mut stack: Vec<Element> = Vec::new();
        let mut buffer = Vec::new();

        loop {
            let finished = match reader.read_event(&mut buffer)? {
                Event::Start(start) => {
                    let scope = stack.last().map_or(&root_scope, |parent| &parent.namespaces);
                    let element = Self::open(&reader, &start, scope)?;
                    stack.push(element);
                    None
                }

                Event::Empty(start) => {
                    let scope = stack.last().map_or(&root_scope, |parent| &parent.namespaces);
                    let element = Self::open(&reader, &start, scope)?;
                    Self::close(&mut stack, element)
                }

                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::EmptyDocument)?;
                    Self::close(&mut stack, element)
                }

                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .children
                            .push(Node::Text(text.unescape_and_decode(&reader)?));
                    }
                    None
                }

                Event::CData(text) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .children
                            .push(Node::Text(reader.decode(&text)?.to_owned()));
                    }
                    None
                }

                Event::Eof => return Err(XmlError::EmptyDocument),

                _ => None,
            };

            if let Some(root) = finished {
                return Ok(root);
            }

            buffer.clear();
        }
    }

    fn open<B: BufRead>(
        reader: &Reader<B>,
        start: &BytesStart<'_>,
        parent_scope: &Scope,
    ) -> Result<Self, XmlError> {
        let mut declared = Vec::new();
        let mut plain = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?.to_owned();
            let value = attribute.unescape_and_decode_value(reader)?;

            match split_prefixed_name(&key) {
                (None, "xmlns") => declared.push((None, value)),
                (Some("xmlns"), prefix) => declared.push((Some(prefix.to_owned()), value)),
                _ => plain.push((key, value)),
            }
        }

        let namespaces = if declared.is_empty() {
            parent_scope.clone()
        } else {
            let mut scope = (**parent_scope).clone();
            scope.extend(declared);
            Arc::new(scope)
        };

        let name = QName::resolve(&namespaces, reader.decode(start.name())?, true);
        let attributes = plain
            .into_iter()
            .map(|(key, value)| Attribute {
                name: QName::resolve(&namespaces, &key, false),
                value,
            })
            .collect();

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            namespaces,
        })
    }

    fn close(stack: &mut Vec<Element>, element: Element) -> Option<Element> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(Node::Element(element));
                None
            }
            None => Some(element),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace.as_deref()
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    /// Unqualified attribute by local name.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.prefix.is_none() && attribute.name.local == local)
            .map(|attribute| attribute.value.as_str())
    }

    /// Attribute in any of the given namespaces.
    pub fn attribute_ns(&self, namespaces: &[&str], local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| {
                attribute.name.local == local
                    && attribute
                        .name
                        .namespace
                        .as_deref()
                        .map_or(false, |namespace| namespaces.contains(&namespace))
            })
            .map(|attribute| attribute.value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children().find(|child| child.local_name() == local)
    }

    pub fn has_children(&self) -> bool {
        self.children().next().is_some()
    }

    /// Concatenated character data of this element, excluding descendants.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Resolves a prefixed name appearing in content (e.g. an `xsi:type`
    /// value) against the namespaces in scope on this element.
    pub fn resolve_qname(&self, value: &str) -> QName {
        QName::resolve(&self.namespaces, value.trim(), true)
    }

    /// Prefix currently bound to `namespace`, if any.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(_, uri)| uri.as_str() == namespace)
            .and_then(|(prefix, _)| prefix.as_deref())
    }
}

pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    pub fn declaration(&mut self) -> Result<(), XmlError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)))?;
        Ok(())
    }

    pub fn start<I, K, V>(&mut self, name: &str, attributes: I) -> Result<(), XmlError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let start = Self::bytes_start(name, attributes);
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn empty<I, K, V>(&mut self, name: &str, attributes: I) -> Result<(), XmlError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let start = Self::bytes_start(name, attributes);
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<(), XmlError> {
        self.writer
            .write_event(Event::Text(BytesText::from_plain_str(text)))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<(), XmlError> {
        self.writer
            .write_event(Event::End(BytesEnd::borrowed(name.as_bytes())))?;
        Ok(())
    }

    /// Writes `<name ...>text</name>`.
    pub fn text_element<I, K, V>(
        &mut self,
        name: &str,
        attributes: I,
        text: &str,
    ) -> Result<(), XmlError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn into_string(self) -> Result<String, XmlError> {
        Ok(String::from_utf8(self.writer.into_inner().into_inner())?)
    }

    fn bytes_start<I, K, V>(name: &str, attributes: I) -> BytesStart<'_>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut start = BytesStart::borrowed_name(name.as_bytes());
        for (key, value) in attributes {
            start.push_attribute((key.as_ref(), value.as_ref()));
        }
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<root xmlns="urn:default" xmlns:a="urn:a">
        <a:child a:kind="x" plain="y">one &amp; two</a:child>
        <inner xmlns:a="urn:other"><a:leaf/></inner>
    </root>"#;

    #[test]
    fn resolves_element_and_attribute_namespaces() {
        let root = Element::parse(DOCUMENT).unwrap();
        assert!(root.is("urn:default", "root"));

        let child = root.child("child").unwrap();
        assert_eq!(child.namespace(), Some("urn:a"));
        assert_eq!(child.attribute("plain"), Some("y"));
        assert_eq!(child.attribute("kind"), None);
        assert_eq!(child.attribute_ns(&["urn:a"], "kind"), Some("x"));
        assert_eq!(child.text(), "one & two");
    }

    #[test]
    fn inner_declarations_shadow_outer_prefixes() {
        let root = Element::parse(DOCUMENT).unwrap();
        let leaf = root.child("inner").unwrap().child("leaf").unwrap();
        assert_eq!(leaf.namespace(), Some("urn:other"));
        assert_eq!(root.child("child").unwrap().namespace(), Some("urn:a"));
    }

    #[test]
    fn resolves_prefixed_content_values() {
        let root = Element::parse(DOCUMENT).unwrap();
        let name = root.resolve_qname("a:Thing");
        assert_eq!(name.namespace.as_deref(), Some("urn:a"));
        assert_eq!(name.local, "Thing");

        let unknown = root.resolve_qname("zz:Thing");
        assert!(unknown.is_unresolved());
        assert_eq!(root.prefix_for("urn:a"), Some("a"));
    }

    #[test]
    fn preserves_significant_whitespace() {
        let root = Element::parse("<v> a\nb </v>").unwrap();
        assert_eq!(root.text(), " a\nb ");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(Element::parse(""), Err(XmlError::EmptyDocument)));
    }

    #[test]
    fn writer_escapes_text_and_attributes() {
        let mut writer = XmlWriter::new();
        writer
            .text_element("v", [("note", "\"q\"")], "<'&'>")
            .unwrap();
        let output = writer.into_string().unwrap();
        assert!(!output.contains("<'&'>"));

        let parsed = Element::parse(&output).unwrap();
        assert_eq!(parsed.text(), "<'&'>");
        assert_eq!(parsed.attribute("note"), Some("\"q\""));
    }
}
