//! Raw WSDL/XSD declarations, as they appear in the documents.
//!
//! Nothing here is resolved: type references are kept as namespaced names and
//! looked up when the metadata catalog is built.

use lather_util::soap::SoapVersion;

#[derive(Default, Debug, Clone)]
pub struct Namespaces(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    namespace_idx: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Element particles and attributes, optionally derived from `base`.
    Complex {
        base: Option<NamespacedName>,
        fields: Vec<Field>,
        array_item: Option<NamespacedName>,
    },
    SimpleContent {
        base: NamespacedName,
        attributes: Vec<Field>,
    },
    Restriction(NamespacedName),
    Union(Vec<NamespacedName>),
    List(NamespacedName),
}

#[derive(Debug, Clone)]
pub struct Type {
    pub name: NamespacedName,
    pub kind: TypeKind,
    /// Declared inline on a top-level element rather than by name.
    pub anonymous: bool,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Type(NamespacedName),
    Inner(TypeKind),
    Ref(NamespacedName),
    Untyped,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldKind,
    pub attribute: bool,
    /// Namespace the element must be qualified with, if any.
    pub qualified: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ElementType {
    Named(NamespacedName),
    /// Index into [`Definition::types`].
    Anonymous(usize),
    Untyped,
}

#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: NamespacedName,
    pub ty: ElementType,
}

#[derive(Debug, Clone)]
pub enum PartKind {
    Type(NamespacedName),
    Element(NamespacedName),
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub kind: PartKind,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Default)]
pub struct BindingBody {
    pub body_use: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub name: NamespacedName,
    pub action: Option<String>,
    pub style: Option<String>,
    pub input: Option<BindingBody>,
    pub output: Option<BindingBody>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    /// `None` for non-SOAP (e.g. HTTP) bindings.
    pub version: Option<SoapVersion>,
    pub style: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: NamespacedName,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: NamespacedName,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub target_namespace: Option<String>,
    pub types: Vec<Type>,
    pub elements: Vec<ElementDecl>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

impl Namespaces {
    pub fn namespaces(&self) -> &[String] {
        &self.0
    }

    pub fn add_or_get(&mut self, namespace: &str) -> usize {
        if let Some(index) = self.index_of(namespace) {
            index
        } else {
            let index = self.0.len();
            self.0.push(namespace.to_owned());
            index
        }
    }

    pub fn get(&self, name: &NamespacedName) -> &str {
        self.0
            .get(name.namespace_idx)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn index_of(&self, namespace: &str) -> Option<usize> {
        self.0.iter().position(|value| value == namespace)
    }
}

impl NamespacedName {
    pub fn new(namespaces: &mut Namespaces, namespace: &str, name: String) -> Self {
        Self {
            namespace_idx: namespaces.add_or_get(namespace),
            name,
        }
    }

    pub fn index(&self) -> usize {
        self.namespace_idx
    }

    pub fn is_in(&self, namespaces: &Namespaces, candidates: &[&str]) -> bool {
        candidates.contains(&namespaces.get(self))
    }
}

impl Definition {
    pub fn find_type(&self, name: &NamespacedName) -> Option<&Type> {
        self.types
            .iter()
            .find(|ty| !ty.anonymous && ty.name == *name)
    }

    pub fn find_element(&self, name: &NamespacedName) -> Option<&ElementDecl> {
        self.elements.iter().find(|element| element.name == *name)
    }

    pub fn find_message(&self, name: &NamespacedName) -> Option<&Message> {
        self.messages.iter().find(|message| message.name == *name)
    }

    pub fn find_port_type(&self, name: &NamespacedName) -> Option<&PortType> {
        self.port_types.iter().find(|port_type| port_type.name == *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_namespaces_are_shared() {
        let mut namespaces = Namespaces::default();
        let first = NamespacedName::new(&mut namespaces, "urn:a", "One".into());
        let second = NamespacedName::new(&mut namespaces, "urn:a", "Two".into());
        let other = NamespacedName::new(&mut namespaces, "urn:b", "One".into());

        assert_eq!(first.index(), second.index());
        assert_ne!(first, other);
        assert_eq!(namespaces.get(&other), "urn:b");
        assert!(first.is_in(&namespaces, &["urn:x", "urn:a"]));
        assert_eq!(namespaces.namespaces().len(), 2);
    }
}
