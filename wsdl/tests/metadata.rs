use lather_util::soap::SoapVersion;
use lather_wsdl::{
    loader::{to_url, FileLoader},
    metadata::{BodyUse, Parameter, Property, Style, TypeShape, XsdType},
    MetadataProvider, NotFoundError,
};
use std::{path::PathBuf, str::FromStr};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("wsdl");
    path.push(name);
    path
}

fn load(name: &str) -> MetadataProvider {
    load_preferring(name, SoapVersion::Soap11)
}

fn load_preferring(name: &str, version: SoapVersion) -> MetadataProvider {
    let path = fixture_path(name);
    let url = to_url(&path.to_string_lossy())
        .unwrap_or_else(|e| panic!("Invalid fixture path {:?}: {}", path, e));

    MetadataProvider::with_loader(&FileLoader, url, version)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

fn property_names(provider: &MetadataProvider, ty: &str) -> Vec<String> {
    provider
        .get_metadata()
        .types()
        .fetch_by_name(ty)
        .unwrap()
        .properties
        .iter()
        .map(|property| property.name.clone())
        .collect()
}

#[test]
fn loads_wsdl_methods() {
    let provider = load("string.wsdl");
    let methods = provider.get_metadata().methods();

    assert_eq!(methods.len(), 1);

    let method = methods.fetch_by_name("validate").unwrap();
    assert_eq!(
        method.parameters.iter().cloned().collect::<Vec<_>>(),
        vec![Parameter::new("input", XsdType::guess("string"))]
    );
    assert_eq!(method.return_type, XsdType::guess("string"));
    assert_eq!(method.documentation.as_deref(), Some("Echoes the input string"));

    let meta = &method.meta;
    assert_eq!(meta.location, "http://soapinterop.org/");
    assert_eq!(meta.action, "http://soapinterop.org/validate");
    assert_eq!(meta.soap_version, SoapVersion::Soap11);
    assert_eq!(meta.style, Style::Rpc);
    assert_eq!(meta.input.body_use, BodyUse::Encoded);
    assert_eq!(meta.input.namespace.as_deref(), Some("http://soapinterop.org/"));
    assert!(!meta.one_way);
}

#[test]
fn builtin_types_carry_their_base() {
    let provider = load("string.wsdl");
    let method = provider.get_metadata().methods().fetch_by_name("validate").unwrap();
    let input = method.parameters.fetch_by_name("input").unwrap();

    assert_eq!(input.ty.base_type(), Some("anySimpleType"));
    assert_eq!(input.ty.namespace(), Some("http://www.w3.org/2001/XMLSchema"));
}

#[test]
fn collapses_multiple_response_parts_to_array() {
    let provider = load("multiArgumentResponse.wsdl");
    let method = provider.get_metadata().methods().fetch_by_name("validate").unwrap();

    assert_eq!(method.return_type, XsdType::guess("array"));
    assert_eq!(method.outputs.len(), 2);
    assert_eq!(method.outputs.get(1).unwrap().ty, XsdType::guess("int"));
    // An empty soapAction falls back to the location.
    assert_eq!(method.meta.action, "http://soapinterop.org/validate");
}

#[test]
fn loads_union_types_in_methods() {
    let provider = load("union.wsdl");
    let method = provider.get_metadata().methods().fetch_by_name("validate").unwrap();

    let jeans = XsdType::guess("jeansSize")
        .with_base_type("anyType")
        .with_member_types(["sizebyno", "sizebystring"]);

    assert_eq!(method.parameters.fetch_by_name("input").unwrap().ty, jeans);
    assert_eq!(method.return_type, jeans);
    assert_eq!(method.return_type.member_types(), ["sizebyno", "sizebystring"]);
}

#[test]
fn loads_union_types() {
    let provider = load("union.wsdl");
    let types = provider.get_metadata().types();

    let jeans = types.fetch_by_name("jeansSize").unwrap();
    assert_eq!(jeans.shape, TypeShape::Union);
    assert!(jeans.properties.is_empty());

    let container = types.fetch_by_name("jeansSizeContainer").unwrap();
    assert_eq!(
        container.properties.fetch_by_name("jeansSize").unwrap().ty,
        XsdType::guess("jeansSize")
            .with_base_type("anyType")
            .with_member_types(["sizebyno", "sizebystring"])
    );

    let by_number = types.fetch_by_name("sizebyno").unwrap();
    assert_eq!(by_number.shape, TypeShape::Simple);
    assert_eq!(by_number.xsd_type.base_type(), Some("positiveInteger"));
}

#[test]
fn loads_list_types() {
    let provider = load("list.wsdl");
    let list = XsdType::guess("valuelist")
        .with_base_type("array")
        .with_member_types(["integer"]);

    let method = provider.get_metadata().methods().fetch_by_name("validate").unwrap();
    assert_eq!(method.parameters.fetch_by_name("input").unwrap().ty, list);
    assert_eq!(method.return_type, list);

    let container = provider
        .get_metadata()
        .types()
        .fetch_by_name("valuelistContainer")
        .unwrap();
    assert_eq!(container.properties.fetch_by_name("valuelist").unwrap().ty, list);
}

#[test]
fn loads_simple_content_types() {
    let provider = load("simpleContent.wsdl");
    let types = provider.get_metadata().types();

    assert_eq!(types.len(), 1);

    let ty = types.fetch_by_name("SimpleContent").unwrap();
    assert_eq!(ty.shape, TypeShape::SimpleContent);
    assert_eq!(ty.xsd_type.base_type(), Some("integer"));
    assert_eq!(property_names(&provider, "SimpleContent"), ["_", "country"]);

    let content = ty.properties.fetch_by_name(Property::CONTENT).unwrap();
    assert_eq!(content.ty, XsdType::guess("integer").with_base_type("decimal"));
    assert!(!content.attribute);
    assert!(ty.properties.fetch_by_name("country").unwrap().attribute);
}

#[test]
fn loads_complex_types() {
    let provider = load("complex-type-request-response.wsdl");
    let types = provider.get_metadata().types();

    assert_eq!(types.len(), 2);

    let request = types.fetch_by_name("ValidateRequest").unwrap();
    assert_eq!(request.xsd_type, XsdType::guess("ValidateRequest"));
    assert_eq!(request.namespace(), Some("http://soapinterop.org/xsd"));
    assert_eq!(
        request.properties.iter().cloned().collect::<Vec<_>>(),
        vec![Property::new(
            "input",
            XsdType::guess("string").with_base_type("anySimpleType")
        )]
    );

    let response = types.fetch_by_name("ValidateResponse").unwrap();
    assert_eq!(
        response.properties.fetch_by_name("output").unwrap().ty,
        XsdType::guess("string").with_base_type("anySimpleType")
    );
}

#[test]
fn keeps_duplicate_type_declarations() {
    let provider = load("duplicate-typenames.wsdl");
    let types = provider.get_metadata().types();

    // store1.xsd is imported twice but parsed once.
    assert_eq!(types.len(), 2);

    let first = types.get(0).unwrap();
    let second = types.get(1).unwrap();
    assert_eq!(first.name, "Store");
    assert_eq!(second.name, "Store");
    assert_eq!(first.xsd_type, XsdType::guess("Store"));

    assert_eq!(types.fetch_first_by_name("Store").unwrap(), first);
    assert_eq!(types.fetch_by_name("Store").unwrap(), first);
    assert_eq!(types.fetch_all_by_name("Store").count(), 2);

    let second_by_namespace = types
        .fetch_by_qualified_name("http://soapinterop.org/store2", "Store")
        .unwrap();
    assert_eq!(second_by_namespace, second);
    assert!(second.properties.fetch_by_name("Attribute2").is_ok());
    assert!(first.properties.fetch_by_name("Attribute2").is_err());
}

#[test]
fn missing_entries_are_not_found() {
    let provider = load("string.wsdl");
    let metadata = provider.get_metadata();

    assert_eq!(
        metadata.methods().fetch_by_name("missing").unwrap_err(),
        NotFoundError::new("method", "missing")
    );
    assert_eq!(
        metadata.types().fetch_by_name("missing").unwrap_err(),
        NotFoundError::new("type", "missing")
    );
}

#[test]
fn reads_document_literal_soap11_binding_by_default() {
    let provider = load("soap12.wsdl");
    let methods = provider.get_metadata().methods();

    assert_eq!(methods.len(), 2);

    let get_order = methods.fetch_by_name("GetOrder").unwrap();
    assert_eq!(get_order.meta.soap_version, SoapVersion::Soap11);
    assert_eq!(get_order.meta.location, "http://localhost/orders/soap11");
    assert_eq!(get_order.meta.action, "urn:orders/GetOrder");
    assert_eq!(get_order.meta.style, Style::Document);
    assert_eq!(get_order.meta.input.body_use, BodyUse::Literal);
    assert_eq!(get_order.return_type, XsdType::guess("GetOrderResponse"));

    let parameter = get_order.parameters.fetch_by_name("parameters").unwrap();
    let element = parameter.element.as_ref().unwrap();
    assert_eq!(element.name, "GetOrder");
    assert_eq!(element.namespace, "urn:orders");
    assert_eq!(parameter.ty.namespace(), Some("urn:orders"));
}

#[test]
fn detects_one_way_operations() {
    let provider = load("soap12.wsdl");
    let notify = provider.get_metadata().methods().fetch_by_name("Notify").unwrap();

    assert!(notify.meta.one_way);
    assert_eq!(notify.return_type, XsdType::guess("void"));
    assert!(notify.outputs.is_empty());
    assert_eq!(
        notify.parameters.fetch_by_name("parameters").unwrap().ty,
        XsdType::guess("string")
    );
}

#[test]
fn prefers_the_requested_soap_version() {
    let provider = load_preferring("soap12.wsdl", SoapVersion::Soap12);
    let get_order = provider.get_metadata().methods().fetch_by_name("GetOrder").unwrap();

    assert_eq!(get_order.meta.soap_version, SoapVersion::Soap12);
    assert_eq!(get_order.meta.location, "http://localhost/orders/soap12");
}

#[test]
fn resolves_extensions_and_anonymous_types() {
    let provider = load("soap12.wsdl");
    let types = provider.get_metadata().types();

    let names: Vec<_> = types.iter().map(|ty| ty.name.as_str()).collect();
    assert_eq!(
        names,
        ["Party", "Customer", "GetOrder", "GetOrderResponse", "GetOrderResponse.lines"]
    );

    let customer = types.fetch_by_name("Customer").unwrap();
    assert_eq!(customer.xsd_type.base_type(), Some("Party"));
    assert_eq!(property_names(&provider, "Customer"), ["name", "email", "vip"]);

    let name = customer.properties.fetch_by_name("name").unwrap();
    assert_eq!(name.namespace.as_deref(), Some("urn:orders"));
    assert!(customer.properties.fetch_by_name("vip").unwrap().attribute);

    let response = types.fetch_by_name("GetOrderResponse").unwrap();
    assert_eq!(
        response.properties.fetch_by_name("lines").unwrap().ty,
        XsdType::guess("GetOrderResponse.lines")
    );
}

#[test]
fn names_inline_types_after_their_parent() {
    let wsdl = std::fs::read_to_string(fixture_path("string.wsdl"))
        .unwrap()
        .replace(
            "<message name=\"validateRequest\">",
            r#"<types>
        <xsd:schema targetNamespace="http://soapinterop.org/xsd">
            <xsd:complexType name="Person">
                <xsd:sequence>
                    <xsd:element name="Address">
                        <xsd:complexType>
                            <xsd:sequence>
                                <xsd:element name="street" type="xsd:string"/>
                            </xsd:sequence>
                        </xsd:complexType>
                    </xsd:element>
                </xsd:sequence>
            </xsd:complexType>
            <xsd:complexType name="Company">
                <xsd:sequence>
                    <xsd:element name="Address">
                        <xsd:complexType>
                            <xsd:sequence>
                                <xsd:element name="zip" type="xsd:int"/>
                            </xsd:sequence>
                        </xsd:complexType>
                    </xsd:element>
                </xsd:sequence>
            </xsd:complexType>
        </xsd:schema>
    </types>
    <message name="validateRequest">"#,
        );
    let provider = MetadataProvider::from_str(&wsdl).unwrap();
    let types = provider.get_metadata().types();

    let names: Vec<_> = types.iter().map(|ty| ty.name.as_str()).collect();
    assert_eq!(names, ["Person", "Person.Address", "Company", "Company.Address"]);

    let company = types.fetch_by_name("Company").unwrap();
    assert_eq!(
        company.properties.fetch_by_name("Address").unwrap().ty.name(),
        "Company.Address"
    );
    assert_eq!(property_names(&provider, "Company.Address"), ["zip"]);
    assert_eq!(property_names(&provider, "Person.Address"), ["street"]);
}

#[test]
fn parses_inline_documents() {
    let wsdl = std::fs::read_to_string(fixture_path("string.wsdl")).unwrap();
    let provider = MetadataProvider::from_str(&wsdl).unwrap();

    assert!(provider.get_metadata().methods().contains("validate"));
}
