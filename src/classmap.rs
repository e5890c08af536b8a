use crate::value::Value;

/// Maps schema type names to application class names.
///
/// Decoded structs of a mapped type become [`Value::Object`]; encoded objects
/// carry the schema type of their class. When several types share a class,
/// objects of that class are written as the type registered first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    classes: Vec<(String, String)>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `type_name` to `class`, replacing an earlier class of that type.
    pub fn with(mut self, type_name: impl Into<String>, class: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let class = class.into();

        match self.classes.iter_mut().find(|(name, _)| *name == type_name) {
            Some((_, existing)) => *existing = class,
            None => self.classes.push((type_name, class)),
        }
        self
    }

    pub fn class_for(&self, type_name: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|(name, _)| name == type_name)
            .map(|(_, class)| class.as_str())
    }

    pub fn type_for(&self, class: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, candidate)| candidate == class)
            .map(|(type_name, _)| type_name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn hydrate(&self, type_name: &str, fields: Vec<(String, Value)>) -> Value {
        match self.class_for(type_name) {
            Some(class) => Value::Object {
                class: class.to_owned(),
                properties: fields,
            },
            None => Value::Struct(fields),
        }
    }
}
