//! JSON → SOAP envelope rendering.
//!
//! Parameters map onto XML by shape:
//! - object keys become child elements, in document order;
//! - an `attributes` object becomes XML attributes of its parent element;
//! - a `$value` entry becomes the parent's text content;
//! - arrays repeat the element once per item;
//! - `null` renders as `xsi:nil="true"`;
//! - scalars become escaped text.
//!
//! Keys must be valid XML names; anything else is rejected rather than
//! written into the document.

use crate::soap::wsdl::{OperationInfo, SoapVersion};
use crate::soap::SoapError;
use quick_xml::escape::escape;
use serde_json::{Map, Value};

pub const ENVELOPE_PREFIX: &str = "soap";
const OPERATION_PREFIX: &str = "ns1";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

const ATTRIBUTES_KEY: &str = "attributes";
const VALUE_KEY: &str = "$value";

/// Builds the full request envelope for `operation`.
pub fn build_envelope(
    version: SoapVersion,
    operation: &OperationInfo,
    params: &Value,
    security_header: Option<&str>,
) -> Result<String, SoapError> {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><{p}:Envelope xmlns:{p}=\"{}\" xmlns:xsi=\"{}\">",
        version.envelope_namespace(),
        XSI_NS,
        p = ENVELOPE_PREFIX
    );

    if let Some(header) = security_header {
        xml.push_str(&format!("<{p}:Header>{header}</{p}:Header>", p = ENVELOPE_PREFIX));
    }

    xml.push_str(&format!("<{}:Body>", ENVELOPE_PREFIX));
    write_operation(&mut xml, operation, params)?;
    xml.push_str(&format!("</{}:Body></{}:Envelope>", ENVELOPE_PREFIX, ENVELOPE_PREFIX));
    Ok(xml)
}

fn write_operation(
    out: &mut String,
    operation: &OperationInfo,
    params: &Value,
) -> Result<(), SoapError> {
    let element = &operation.request_element;
    // qualified children inherit the namespace through a default declaration
    let (tag, declaration) = if operation.qualified_children {
        (
            element.local.clone(),
            format!(" xmlns=\"{}\"", escape(element.namespace.as_str())),
        )
    } else {
        (
            format!("{}:{}", OPERATION_PREFIX, element.local),
            format!(
                " xmlns:{}=\"{}\"",
                OPERATION_PREFIX,
                escape(element.namespace.as_str())
            ),
        )
    };

    match params {
        Value::Object(map) => write_object(out, &tag, &declaration, map)?,
        Value::Null => out.push_str(&format!("<{tag}{declaration}/>")),
        Value::Array(items) => {
            // a bare array has no element names of its own
            out.push_str(&format!("<{tag}{declaration}>"));
            for item in items {
                write_value(out, "item", item)?;
            }
            out.push_str(&format!("</{tag}>"));
        }
        scalar => out.push_str(&format!(
            "<{tag}{declaration}>{}</{tag}>",
            scalar_text(scalar)
        )),
    }
    Ok(())
}

/// Renders `value` as one or more `<name>` elements.
pub fn write_value(out: &mut String, name: &str, value: &Value) -> Result<(), SoapError> {
    check_name(name)?;
    match value {
        Value::Object(map) => write_object(out, name, "", map)?,
        Value::Array(items) => {
            for item in items {
                write_value(out, name, item)?;
            }
        }
        Value::Null => out.push_str(&format!("<{name} xsi:nil=\"true\"/>")),
        scalar => out.push_str(&format!("<{name}>{}</{name}>", scalar_text(scalar))),
    }
    Ok(())
}

fn write_object(
    out: &mut String,
    name: &str,
    declaration: &str,
    map: &Map<String, Value>,
) -> Result<(), SoapError> {
    out.push('<');
    out.push_str(name);
    out.push_str(declaration);
    if let Some(Value::Object(attrs)) = map.get(ATTRIBUTES_KEY) {
        for (key, value) in attrs {
            check_name(key)?;
            out.push_str(&format!(" {}=\"{}\"", key, scalar_text(value)));
        }
    }
    out.push('>');

    for (key, value) in map {
        match key.as_str() {
            ATTRIBUTES_KEY if value.is_object() => {}
            VALUE_KEY => out.push_str(&scalar_text(value)),
            _ => write_value(out, key, value)?,
        }
    }

    out.push_str(&format!("</{name}>"));
    Ok(())
}

fn check_name(name: &str) -> Result<(), SoapError> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(SoapError::InvalidName(name.to_string()))
    }
}

/// The `Name` production of XML 1.0 (fifth edition).
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => escape(s.as_str()).into_owned(),
        Value::Null => String::new(),
        other => escape(other.to_string().as_str()).into_owned(),
    }
}
