use lather_util::soap::XSD_NS;

use super::model::XsdType;

/// Base of each XML Schema built-in type.
const HIERARCHY: &[(&str, &str)] = &[
    ("anySimpleType", "anyType"),
    ("string", "anySimpleType"),
    ("normalizedString", "string"),
    ("token", "normalizedString"),
    ("language", "token"),
    ("Name", "token"),
    ("NMTOKEN", "token"),
    ("NCName", "Name"),
    ("ID", "NCName"),
    ("IDREF", "NCName"),
    ("ENTITY", "NCName"),
    ("NMTOKENS", "anySimpleType"),
    ("IDREFS", "anySimpleType"),
    ("ENTITIES", "anySimpleType"),
    ("boolean", "anySimpleType"),
    ("float", "anySimpleType"),
    ("double", "anySimpleType"),
    ("decimal", "anySimpleType"),
    ("integer", "decimal"),
    ("nonPositiveInteger", "integer"),
    ("negativeInteger", "nonPositiveInteger"),
    ("long", "integer"),
    ("int", "long"),
    ("short", "int"),
    ("byte", "short"),
    ("nonNegativeInteger", "integer"),
    ("unsignedLong", "nonNegativeInteger"),
    ("unsignedInt", "unsignedLong"),
    ("unsignedShort", "unsignedInt"),
    ("unsignedByte", "unsignedShort"),
    ("positiveInteger", "nonNegativeInteger"),
    ("duration", "anySimpleType"),
    ("dateTime", "anySimpleType"),
    ("time", "anySimpleType"),
    ("date", "anySimpleType"),
    ("gYearMonth", "anySimpleType"),
    ("gYear", "anySimpleType"),
    ("gMonthDay", "anySimpleType"),
    ("gDay", "anySimpleType"),
    ("gMonth", "anySimpleType"),
    ("hexBinary", "anySimpleType"),
    ("base64Binary", "anySimpleType"),
    ("anyURI", "anySimpleType"),
    ("QName", "anySimpleType"),
    ("NOTATION", "anySimpleType"),
];

/// The built-in type called `name`, with its base filled in.
pub fn builtin_type(name: &str) -> Option<XsdType> {
    let ty = XsdType::guess(name).with_namespace(XSD_NS);

    if name == "anyType" {
        return Some(ty);
    }

    HIERARCHY
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, base)| ty.with_base_type(*base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bases() {
        assert_eq!(builtin_type("int").unwrap().base_type(), Some("long"));
        assert_eq!(builtin_type("integer").unwrap().base_type(), Some("decimal"));
        assert_eq!(builtin_type("string").unwrap().base_type(), Some("anySimpleType"));
        assert_eq!(builtin_type("anyType").unwrap().base_type(), None);
        assert_eq!(builtin_type("int").unwrap().namespace(), Some(XSD_NS));
        assert!(builtin_type("Order").is_none());
    }
}
