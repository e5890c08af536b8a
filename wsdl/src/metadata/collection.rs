use std::{iter::FromIterator, slice};

use super::model::{Method, Parameter, Property, Type};
use crate::error::NotFoundError;

/// Entries that can be looked up by name.
pub trait Named {
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn namespace(&self) -> Option<&str> {
        None
    }
}

/// Catalog entries in declaration order.
///
/// Duplicate names are kept as separate entries. Lookups by name return the
/// first one; [`Collection::fetch_by_qualified_name`] and
/// [`Collection::fetch_all_by_name`] reach the others.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

pub type MethodCollection = Collection<Method>;
pub type TypeCollection = Collection<Type>;
pub type ParameterCollection = Collection<Parameter>;
pub type PropertyCollection = Collection<Property>;

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Named> Collection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn fetch_by_name(&self, name: &str) -> Result<&T, NotFoundError> {
        self.fetch_first_by_name(name)
    }

    pub fn fetch_first_by_name(&self, name: &str) -> Result<&T, NotFoundError> {
        self.items
            .iter()
            .find(|item| item.name() == name)
            .ok_or_else(|| NotFoundError::new(T::KIND, name))
    }

    pub fn fetch_by_qualified_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<&T, NotFoundError> {
        self.items
            .iter()
            .find(|item| item.name() == name && item.namespace() == Some(namespace))
            .ok_or_else(|| NotFoundError::new(T::KIND, format!("{{{}}}{}", namespace, name)))
    }

    pub fn fetch_all_by_name<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s T> + 'n
    where
        's: 'n,
    {
        self.items.iter().filter(move |item| item.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name() == name)
    }
}

impl<T> Collection<T> {
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::model::XsdType;

    fn property(name: &str, namespace: &str) -> Property {
        Property {
            namespace: Some(namespace.into()),
            ..Property::new(name, XsdType::guess("string"))
        }
    }

    #[test]
    fn keeps_duplicates_in_order() {
        let properties: PropertyCollection = vec![
            property("id", "urn:a"),
            property("name", "urn:a"),
            property("id", "urn:b"),
        ]
        .into_iter()
        .collect();

        assert_eq!(properties.len(), 3);
        assert_eq!(properties.fetch_by_name("id").unwrap().namespace.as_deref(), Some("urn:a"));
        assert_eq!(properties.fetch_all_by_name("id").count(), 2);
        assert_eq!(
            properties.fetch_by_qualified_name("urn:b", "id").unwrap(),
            properties.get(2).unwrap()
        );
    }

    #[test]
    fn found_entries_outlive_the_lookup_name() {
        let properties: PropertyCollection =
            vec![property("id", "urn:a"), property("id", "urn:b")].into_iter().collect();

        let first = {
            let name = String::from("id");
            properties.fetch_first_by_name(&name).unwrap()
        };
        let qualified = {
            let name = String::from("id");
            properties.fetch_by_qualified_name("urn:b", &name).unwrap()
        };

        assert_eq!(first.namespace.as_deref(), Some("urn:a"));
        assert_eq!(qualified.namespace.as_deref(), Some("urn:b"));
    }

    #[test]
    fn misses_report_kind_and_name() {
        let properties = PropertyCollection::default();
        let error = properties.fetch_by_name("missing").unwrap_err();

        assert_eq!(error, NotFoundError::new("property", "missing"));
        assert_eq!(error.to_string(), "No property named missing");
        assert!(properties.fetch_by_qualified_name("urn:a", "missing").is_err());
    }
}
