#![allow(dead_code)]

use std::path::PathBuf;

use lather::{Engine, EngineOptions, SoapRequest, SoapResponse};
use lather_util::{soap::XSI_NS, xml::Element};

pub const SCHEMA_NS: &str = "http://soapinterop.org/xsd";

pub fn fixture_path(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("wsdl");
    path.push(name);
    path.to_string_lossy().into_owned()
}

pub fn fixture(name: &str) -> Engine {
    fixture_with(name, EngineOptions::default())
}

pub fn fixture_with(name: &str, options: EngineOptions) -> Engine {
    Engine::from_wsdl(&fixture_path(name), options)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// An rpc/encoded `validate` operation taking and returning one part.
pub fn service(schema: &str, part_type: &str) -> String {
    let types = if schema.is_empty() {
        String::new()
    } else {
        format!(
            r#"<types><xsd:schema targetNamespace="{}">{}</xsd:schema></types>"#,
            SCHEMA_NS, schema
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions name="Functional"
    targetNamespace="http://soapinterop.org/"
    xmlns="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsd1999="http://www.w3.org/1999/XMLSchema"
    xmlns:soapenc="http://schemas.xmlsoap.org/soap/encoding/"
    xmlns:apache="http://xml.apache.org/xml-soap"
    xmlns:s="http://soapinterop.org/xsd"
    xmlns:tns="http://soapinterop.org/">
    {types}
    <message name="validateRequest">
        <part name="input" type="{part}"/>
    </message>
    <message name="validateResponse">
        <part name="output" type="{part}"/>
    </message>
    <portType name="FunctionalPortType">
        <operation name="validate">
            <input message="tns:validateRequest"/>
            <output message="tns:validateResponse"/>
        </operation>
    </portType>
    <binding name="FunctionalBinding" type="tns:FunctionalPortType">
        <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
        <operation name="validate">
            <soap:operation soapAction=""/>
            <input><soap:body use="encoded" namespace="http://soapinterop.org/"/></input>
            <output><soap:body use="encoded" namespace="http://soapinterop.org/"/></output>
        </operation>
    </binding>
    <service name="FunctionalService">
        <port name="FunctionalPort" binding="tns:FunctionalBinding">
            <soap:address location="http://soapinterop.org/"/>
        </port>
    </service>
</definitions>"#,
        types = types,
        part = part_type
    )
}

pub fn engine(part_type: &str) -> Engine {
    engine_with_schema("", part_type)
}

pub fn engine_with_schema(schema: &str, part_type: &str) -> Engine {
    service(schema, part_type)
        .parse()
        .unwrap_or_else(|e| panic!("Failed to build service for {}: {}", part_type, e))
}

/// Wraps `body` in an envelope declaring the usual interop prefixes.
pub fn response(body: &str) -> SoapResponse {
    SoapResponse::new(format!(
        r#"<SOAP-ENV:Envelope
    xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:application="http://soapinterop.org/"
    xmlns:s="http://soapinterop.org/xsd"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsd1999="http://www.w3.org/1999/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/"
    xmlns:enc="http://www.w3.org/2003/05/soap-encoding"
    xmlns:apache="http://xml.apache.org/xml-soap"
    SOAP-ENV:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
    <SOAP-ENV:Body>
        {}
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        body
    ))
}

/// Response to `validate` with a single `output` element.
pub fn output(element: &str) -> SoapResponse {
    response(&format!(
        "<application:validate>{}</application:validate>",
        element
    ))
}

pub fn request_body(request: &SoapRequest) -> Element {
    SoapResponse::new(request.xml.clone())
        .body()
        .unwrap_or_else(|e| panic!("Request is not a SOAP envelope: {}", e))
}

/// Follows a path of local names below the request body.
pub fn request_element(request: &SoapRequest, path: &[&str]) -> Element {
    let body = request_body(request);
    let mut current = &body;
    for name in path {
        current = current
            .child(name)
            .unwrap_or_else(|| panic!("No {} element in {}", name, request.xml));
    }
    current.clone()
}

/// The n-th child called `name`.
pub fn nth_child(element: &Element, name: &str, index: usize) -> Element {
    element
        .children()
        .filter(|child| child.local_name() == name)
        .nth(index)
        .unwrap_or_else(|| panic!("No {} element at {}", name, index))
        .clone()
}

pub fn xsi_type(element: &Element) -> Option<&str> {
    element.attribute_ns(&[XSI_NS], "type")
}

/// Asserts the request metadata every `validate` request shares.
pub fn assert_validate_request(request: &SoapRequest) {
    let wrapper = request_body(request)
        .children()
        .next()
        .cloned()
        .expect("request has no wrapper element");

    assert!(wrapper.is("http://soapinterop.org/", "validate"));
    assert_eq!(request.location, "http://soapinterop.org/");
    assert_eq!(request.action, "http://soapinterop.org/validate");
    assert!(!request.one_way);
}
