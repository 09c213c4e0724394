//! SOAP response → JSON decoding.

use crate::soap::wsdl::{attributes, local_name};
use crate::soap::SoapError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn open(e: &BytesStart) -> Result<Self, SoapError> {
        Ok(Node {
            name: local_name(e),
            attrs: attributes(e)?,
            ..Default::default()
        })
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn is_nil(&self) -> bool {
        self.attrs
            .iter()
            .any(|(k, v)| local_part(k) == "nil" && (v == "true" || v == "1"))
    }
}

/// Decodes a SOAP response envelope.
///
/// Returns the decoded content of the first element inside `Body`, or
/// [`SoapError::Fault`] when that element is a SOAP fault.
pub fn parse_response(xml: &str) -> Result<Value, SoapError> {
    let root = parse_tree(xml)?;
    if root.name != "Envelope" {
        return Err(SoapError::Xml(format!(
            "expected SOAP Envelope, found <{}>",
            root.name
        )));
    }
    let body = root
        .child("Body")
        .ok_or_else(|| SoapError::Xml("SOAP Envelope has no Body".to_string()))?;

    let Some(first) = body.children.first() else {
        return Ok(Value::Null);
    };
    if first.name == "Fault" {
        return Err(fault(first));
    }
    if first.children.is_empty() && visible_attributes(first).is_empty() && first.text.is_empty() {
        return Ok(Value::Null);
    }
    Ok(to_json(first))
}

fn parse_tree(xml: &str) -> Result<Node, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(Node::open(e)?),
            Event::Empty(ref e) => {
                let node = Node::open(e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(ref t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| SoapError::Xml("empty response document".to_string()))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Reads SOAP 1.1 (`faultcode`/`faultstring`) and SOAP 1.2
/// (`Code/Value`, `Reason/Text`) faults.
fn fault(node: &Node) -> SoapError {
    let code = node
        .child("faultcode")
        .or_else(|| node.child("Code").and_then(|c| c.child("Value")))
        .map(|n| n.text.clone())
        .unwrap_or_else(|| "Fault".to_string());
    let reason = node
        .child("faultstring")
        .or_else(|| node.child("Reason").and_then(|r| r.child("Text")))
        .map(|n| n.text.clone())
        .unwrap_or_default();
    SoapError::Fault { code, reason }
}

fn visible_attributes(node: &Node) -> Map<String, Value> {
    node.attrs
        .iter()
        .filter(|(k, _)| !k.starts_with("xmlns") && !k.starts_with("xsi:"))
        .map(|(k, v)| (local_part(k).to_string(), Value::String(v.clone())))
        .collect()
}

fn to_json(node: &Node) -> Value {
    if node.is_nil() {
        return Value::Null;
    }
    let attrs = visible_attributes(node);
    if node.children.is_empty() && attrs.is_empty() {
        return Value::String(node.text.clone());
    }

    let mut map = Map::new();
    if !attrs.is_empty() {
        map.insert("attributes".to_string(), Value::Object(attrs));
    }
    for child in &node.children {
        let value = to_json(child);
        match map.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(child.name.clone(), value);
            }
        }
    }
    if !node.text.is_empty() {
        map.insert("$value".to_string(), Value::String(node.text.clone()));
    }
    Value::Object(map)
}

fn local_part(key: &str) -> &str {
    key.split_once(':').map_or(key, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_result_element() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns:sprawdzPrzesylkeResponse xmlns:ns="http://sledzenie.pocztapolska.pl">
      <ns:return status="0">
        <ns:numer>00359007738914012345</ns:numer>
        <ns:zdarzenia>
          <ns:zdarzenie><ns:nazwa>Nadanie</ns:nazwa></ns:zdarzenie>
          <ns:zdarzenie><ns:nazwa>Doręczenie &amp; odbiór</ns:nazwa></ns:zdarzenie>
        </ns:zdarzenia>
        <ns:uwagi xsi:nil="true" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"/>
      </ns:return>
    </ns:sprawdzPrzesylkeResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

        let value = parse_response(xml).expect("decoded");

        assert_eq!(
            value,
            json!({
                "return": {
                    "attributes": { "status": "0" },
                    "numer": "00359007738914012345",
                    "zdarzenia": {
                        "zdarzenie": [
                            { "nazwa": "Nadanie" },
                            { "nazwa": "Doręczenie & odbiór" }
                        ]
                    },
                    "uwagi": null
                }
            })
        );
    }

    #[test]
    fn decodes_soap11_fault() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>Invalid credentials</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

        let err = parse_response(xml).unwrap_err();
        assert_eq!(err.to_string(), "soap:Client: Invalid credentials");
    }

    #[test]
    fn decodes_soap12_fault() {
        let xml = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body>
    <env:Fault>
      <env:Code><env:Value>env:Sender</env:Value></env:Code>
      <env:Reason><env:Text xml:lang="en">Unknown shipment</env:Text></env:Reason>
    </env:Fault>
  </env:Body>
</env:Envelope>"#;

        match parse_response(xml).unwrap_err() {
            SoapError::Fault { code, reason } => {
                assert_eq!(code, "env:Sender");
                assert_eq!(reason, "Unknown shipment");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn empty_body_and_empty_response_are_null() {
        let empty_body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body/></soap:Envelope>"#;
        assert_eq!(parse_response(empty_body).unwrap(), Value::Null);

        let empty_response = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><clearResponse xmlns="urn:x"/></soap:Body></soap:Envelope>"#;
        assert_eq!(parse_response(empty_response).unwrap(), Value::Null);
    }

    #[test]
    fn rejects_non_envelope_documents() {
        assert!(matches!(
            parse_response("<html><body>502 Bad Gateway</body></html>"),
            Err(SoapError::Xml(_))
        ));
        assert!(parse_response("").is_err());
    }
}
