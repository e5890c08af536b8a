use lather_util::soap::{SoapVersion, APACHE_NS, XSD_NS};

use crate::{primitive::Primitive, value::Value};

/// Qualified type name written as `xsi:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
    pub namespace: &'static str,
    pub name: &'static str,
}

impl TypeTag {
    pub fn xsd(primitive: Primitive) -> Self {
        Self {
            namespace: XSD_NS,
            name: primitive.name(),
        }
    }

    pub fn xsd_any() -> Self {
        Self {
            namespace: XSD_NS,
            name: "anyType",
        }
    }

    /// A type of the SOAP encoding namespace of `version`.
    pub fn encoding(version: SoapVersion, name: &'static str) -> Self {
        Self {
            namespace: version.encoding_namespace(),
            name,
        }
    }
}

/// Picks a wire type for values that have no declared schema type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeGuesser {
    version: SoapVersion,
}

impl TypeGuesser {
    pub fn new(version: SoapVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    /// The primitive a scalar value is written as.
    pub fn guess_primitive(value: &Value) -> Option<Primitive> {
        Some(match value {
            Value::Bool(_) => Primitive::Boolean,
            Value::Int(number) if i32::try_from(*number).is_ok() => Primitive::Int,
            Value::Int(_) => Primitive::Long,
            Value::UInt(number) if u32::try_from(*number).is_ok() => Primitive::UnsignedInt,
            Value::UInt(_) => Primitive::UnsignedLong,
            Value::Float(_) => Primitive::Double,
            Value::String(_) => Primitive::String,
            Value::Bytes(_) => Primitive::Base64Binary,
            Value::DateTime(_) => Primitive::DateTime,
            Value::Date(_) => Primitive::Date,
            _ => return None,
        })
    }

    /// `None` for null, which is written as `xsi:nil` instead.
    pub fn guess(&self, value: &Value) -> Option<TypeTag> {
        if let Some(primitive) = Self::guess_primitive(value) {
            return Some(TypeTag::xsd(primitive));
        }

        match value {
            Value::List(_) => Some(TypeTag::encoding(self.version, "Array")),
            Value::Map(_) => Some(TypeTag {
                namespace: APACHE_NS,
                name: "Map",
            }),
            Value::Struct(_) | Value::Object { .. } => Some(TypeTag::encoding(self.version, "Struct")),
            _ => None,
        }
    }
}
