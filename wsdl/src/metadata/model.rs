use std::fmt;

use lather_util::soap::SoapVersion;

use super::collection::{Named, ParameterCollection, PropertyCollection};

/// Identity of a schema type plus the inheritance facts the codec needs.
///
/// Values are never mutated; the `with_*` methods hand back an updated copy.
#[derive(Debug, Clone, Default)]
pub struct XsdType {
    name: String,
    base_type: Option<String>,
    member_types: Option<Vec<String>>,
    namespace: Option<String>,
}

impl XsdType {
    /// A type known only by name.
    pub fn guess(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_base_type(&self, base_type: impl Into<String>) -> Self {
        Self {
            base_type: Some(base_type.into()),
            ..self.clone()
        }
    }

    pub fn with_member_types<I, S>(&self, member_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            member_types: Some(member_types.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_type(&self) -> Option<&str> {
        self.base_type.as_deref()
    }

    pub fn member_types(&self) -> &[String] {
        self.member_types.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `anyType`, `anySimpleType` and friends carry no static information.
    pub fn is_untyped(&self) -> bool {
        matches!(self.name.as_str(), "anyType" | "anySimpleType" | "any" | "")
    }
}

/// Names always have to agree; base and member types only when both sides
/// know them.
impl PartialEq for XsdType {
    fn eq(&self, other: &Self) -> bool {
        fn agrees<T: PartialEq>(left: &Option<T>, right: &Option<T>) -> bool {
            match (left, right) {
                (Some(left), Some(right)) => left == right,
                _ => true,
            }
        }

        self.name == other.name
            && agrees(&self.base_type, &other.base_type)
            && agrees(&self.member_types, &other.member_types)
    }
}

impl fmt::Display for XsdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Qualified name of the element a document-style part is written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementName {
    pub namespace: String,
    pub name: String,
}

/// One call argument or result part.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: XsdType,
    pub element: Option<ElementName>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: XsdType) -> Self {
        Self {
            name: name.into(),
            ty,
            element: None,
        }
    }

    pub fn with_element(self, element: ElementName) -> Self {
        Self {
            element: Some(element),
            ..self
        }
    }
}

/// One field of a structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: XsdType,
    /// Namespace the child element is qualified with.
    pub namespace: Option<String>,
    /// Written as an XML attribute rather than a child element.
    pub attribute: bool,
}

impl Property {
    /// Name of the property holding the text of a simple content type.
    pub const CONTENT: &'static str = "_";

    pub fn new(name: impl Into<String>, ty: XsdType) -> Self {
        Self {
            name: name.into(),
            ty,
            namespace: None,
            attribute: false,
        }
    }

    pub fn is_content(&self) -> bool {
        self.name == Self::CONTENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Complex,
    SimpleContent,
    /// Restriction of another simple type.
    Simple,
    Union,
    List,
    /// SOAP-encoded array; the item type is the single member type.
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub name: String,
    pub xsd_type: XsdType,
    pub properties: PropertyCollection,
    pub shape: TypeShape,
}

impl Type {
    pub fn namespace(&self) -> Option<&str> {
        self.xsd_type.namespace()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Rpc,
    Document,
}

impl Style {
    pub fn parse(style: Option<&str>) -> Self {
        match style {
            Some("rpc") => Style::Rpc,
            _ => Style::Document,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyUse {
    Literal,
    Encoded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyMeta {
    pub body_use: BodyUse,
    pub namespace: Option<String>,
}

impl Default for BodyMeta {
    fn default() -> Self {
        Self {
            body_use: BodyUse::Literal,
            namespace: None,
        }
    }
}

/// Where and how a method is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    pub location: String,
    pub action: String,
    pub soap_version: SoapVersion,
    pub one_way: bool,
    pub style: Style,
    pub input: BodyMeta,
    pub output: BodyMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub parameters: ParameterCollection,
    pub return_type: XsdType,
    /// Output message parts, in declaration order.
    pub outputs: ParameterCollection,
    pub meta: MethodMeta,
    pub documentation: Option<String>,
}

impl Named for Parameter {
    const KIND: &'static str = "parameter";

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.element.as_ref().map(|element| element.namespace.as_str())
    }
}

impl Named for Property {
    const KIND: &'static str = "property";

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl Named for Type {
    const KIND: &'static str = "type";

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.xsd_type.namespace()
    }
}

impl Named for Method {
    const KIND: &'static str = "method";

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.meta.input.namespace.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_return_updated_copies() {
        let original = XsdType::guess("sizes");
        let union = original
            .with_base_type("anyType")
            .with_member_types(["int", "string"]);

        assert_eq!(original.base_type(), None);
        assert!(original.member_types().is_empty());
        assert_eq!(union.base_type(), Some("anyType"));
        assert_eq!(union.member_types(), ["int", "string"]);
    }

    #[test]
    fn equality_ignores_unknown_facts() {
        let bare = XsdType::guess("int");
        let full = XsdType::guess("int").with_base_type("long");

        assert_eq!(bare, full);
        assert_eq!(full, bare);
        assert_ne!(full, XsdType::guess("int").with_base_type("integer"));
        assert_ne!(bare, XsdType::guess("long"));
        assert_ne!(
            XsdType::guess("u").with_member_types(["a"]),
            XsdType::guess("u").with_member_types(["b"])
        );
    }

    #[test]
    fn untyped_names() {
        assert!(XsdType::guess("anyType").is_untyped());
        assert!(!XsdType::guess("string").is_untyped());
    }
}
