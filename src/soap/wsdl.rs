//! WSDL 1.1 discovery.
//!
//! Only what the gateway needs to call an operation is extracted: the
//! service address, the SOAP version of the binding, and for every
//! operation its `soapAction` and the qualified name of its request element.
//! Imported or included documents are not followed.

use crate::soap::SoapError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};

pub const SOAP11_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
pub const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENVELOPE_NS,
            SoapVersion::Soap12 => SOAP12_ENVELOPE_NS,
        }
    }
}

/// A namespace-qualified element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub namespace: String,
    pub local: String,
}

/// Everything needed to invoke one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: String,
    pub soap_action: Option<String>,
    /// Element placed directly inside the SOAP body.
    pub request_element: QualifiedName,
    /// Whether child elements share the request element's namespace
    /// (`elementFormDefault="qualified"`).
    pub qualified_children: bool,
}

/// The parts of a WSDL contract the gateway uses.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub target_namespace: String,
    pub endpoint: Option<String>,
    pub version: SoapVersion,
    pub operations: HashMap<String, OperationInfo>,
}

impl ServiceDescription {
    pub fn operation(&self, name: &str) -> Option<&OperationInfo> {
        self.operations.get(name)
    }

    /// Operation names, sorted for stable output.
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Default)]
struct Binding {
    /// Set once a SOAP 1.1 or 1.2 `binding` child is seen.
    soap: bool,
    style: Option<String>,
}

struct BindingOperation {
    name: String,
    /// Index into `Scan::bindings`; `None` for portType fallbacks.
    binding: Option<usize>,
    soap_action: Option<String>,
    style: Option<String>,
}

#[derive(Default)]
struct Scan {
    target_namespace: String,
    prefixes: HashMap<String, String>,
    qualified_namespaces: HashSet<String>,
    current_message: Option<String>,
    current_port_operation: Option<String>,
    /// message name -> element QName of its first part
    message_elements: HashMap<String, Option<String>>,
    /// portType operation name -> input message QName
    port_inputs: HashMap<String, String>,
    bindings: Vec<Binding>,
    binding_operations: Vec<BindingOperation>,
    addresses: Vec<(SoapVersion, String)>,
}

/// Parses a WSDL document.
pub fn parse_wsdl(xml: &str) -> Result<ServiceDescription, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut scan = Scan::default();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                scan.visit(e, &stack)?;
                stack.push(local_name(e));
            }
            Ok(Event::Empty(ref e)) => scan.visit(e, &stack)?,
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SoapError::Wsdl(format!("XML parse error: {}", e))),
            _ => {}
        }
    }

    scan.finish()
}

impl Scan {
    fn visit(&mut self, e: &BytesStart, stack: &[String]) -> Result<(), SoapError> {
        let name = local_name(e);
        let attrs = attributes(e)?;

        for (key, value) in &attrs {
            if let Some(p) = key.strip_prefix("xmlns:") {
                self.prefixes
                    .entry(p.to_string())
                    .or_insert_with(|| value.clone());
            } else if key == "xmlns" {
                self.prefixes
                    .entry(String::new())
                    .or_insert_with(|| value.clone());
            }
        }
        let attr = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let parent = stack.last().map(String::as_str);
        let grandparent = stack
            .len()
            .checked_sub(2)
            .and_then(|i| stack.get(i))
            .map(String::as_str);

        match (name.as_str(), parent, grandparent) {
            ("definitions", None, _) => {
                self.target_namespace = attr("targetNamespace").unwrap_or_default();
            }
            ("schema", _, _) => {
                if attr("elementFormDefault").as_deref() == Some("qualified") {
                    if let Some(ns) = attr("targetNamespace") {
                        self.qualified_namespaces.insert(ns);
                    }
                }
            }
            ("message", Some("definitions"), _) => {
                self.current_message = attr("name");
                if let Some(message) = &self.current_message {
                    self.message_elements.entry(message.clone()).or_insert(None);
                }
            }
            ("part", Some("message"), _) => {
                if let Some(message) = &self.current_message {
                    let slot = self.message_elements.entry(message.clone()).or_insert(None);
                    if slot.is_none() {
                        *slot = attr("element");
                    }
                }
            }
            ("operation", Some("portType"), _) => {
                self.current_port_operation = attr("name");
            }
            ("input", Some("operation"), Some("portType")) => {
                if let (Some(op), Some(message)) = (&self.current_port_operation, attr("message")) {
                    self.port_inputs.insert(op.clone(), message);
                }
            }
            ("binding", Some("definitions"), _) => {
                self.bindings.push(Binding::default());
            }
            ("binding", Some("binding"), _) => {
                if self.soap_version(e).is_some() {
                    if let Some(binding) = self.bindings.last_mut() {
                        binding.soap = true;
                        binding.style = attr("style");
                    }
                }
            }
            ("operation", Some("binding"), _) => {
                if let Some(op) = attr("name") {
                    self.binding_operations.push(BindingOperation {
                        name: op,
                        binding: self.bindings.len().checked_sub(1),
                        soap_action: None,
                        style: None,
                    });
                }
            }
            ("operation", Some("operation"), Some("binding")) => {
                if self.soap_version(e).is_none() {
                    return Ok(());
                }
                if let Some(last) = self.binding_operations.last_mut() {
                    last.soap_action = attr("soapAction").filter(|a| !a.is_empty());
                    last.style = attr("style");
                }
            }
            ("address", Some("port"), _) => {
                if let (Some(version), Some(location)) = (self.soap_version(e), attr("location")) {
                    self.addresses.push((version, location));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The SOAP version of a binding-namespace element such as
    /// `soap12:address`, or `None` for other extensions (`http:`, `mime:`).
    fn soap_version(&self, e: &BytesStart) -> Option<SoapVersion> {
        let prefix = e
            .name()
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
            .unwrap_or_default();
        match self.prefixes.get(&prefix).map(String::as_str) {
            Some(SOAP11_BINDING_NS) => Some(SoapVersion::Soap11),
            Some(SOAP12_BINDING_NS) => Some(SoapVersion::Soap12),
            _ => None,
        }
    }

    fn finish(self) -> Result<ServiceDescription, SoapError> {
        let (version, endpoint) = self
            .addresses
            .iter()
            .find(|(v, _)| *v == SoapVersion::Soap11)
            .or_else(|| self.addresses.first())
            .map(|(v, location)| (*v, Some(location.clone())))
            .unwrap_or((SoapVersion::Soap11, None));

        let soap_operations: Vec<&BindingOperation> = self
            .binding_operations
            .iter()
            .filter(|op| {
                op.binding
                    .and_then(|i| self.bindings.get(i))
                    .is_some_and(|binding| binding.soap)
            })
            .collect();

        let mut binding: Vec<BindingOperation> = Vec::new();
        if soap_operations.is_empty() {
            let mut names: Vec<&String> = self.port_inputs.keys().collect();
            names.sort();
            binding.extend(names.into_iter().map(|name| BindingOperation {
                name: name.clone(),
                binding: None,
                soap_action: None,
                style: None,
            }));
        }

        let mut operations = HashMap::new();
        for op in soap_operations.into_iter().chain(binding.iter()) {
            if operations.contains_key(&op.name) {
                continue;
            }
            let binding_style = op
                .binding
                .and_then(|i| self.bindings.get(i))
                .and_then(|binding| binding.style.as_deref());
            let style = op.style.as_deref().or(binding_style);
            let request_element = if style == Some("rpc") {
                QualifiedName {
                    namespace: self.target_namespace.clone(),
                    local: op.name.clone(),
                }
            } else {
                self.document_element(&op.name)
            };
            let qualified_children = self
                .qualified_namespaces
                .contains(&request_element.namespace);

            operations.insert(
                op.name.clone(),
                OperationInfo {
                    name: op.name.clone(),
                    soap_action: op.soap_action.clone(),
                    request_element,
                    qualified_children,
                },
            );
        }

        if operations.is_empty() {
            return Err(SoapError::Wsdl("no operations found in WSDL".to_string()));
        }

        Ok(ServiceDescription {
            target_namespace: self.target_namespace,
            endpoint,
            version,
            operations,
        })
    }

    /// Resolves the request element of a document-style operation through
    /// portType input → message → first part element.
    fn document_element(&self, operation: &str) -> QualifiedName {
        self.port_inputs
            .get(operation)
            .and_then(|message| self.message_elements.get(strip_prefix(message)))
            .and_then(|element| element.as_deref())
            .map(|element| self.resolve(element))
            .unwrap_or_else(|| QualifiedName {
                namespace: self.target_namespace.clone(),
                local: operation.to_string(),
            })
    }

    fn resolve(&self, qname: &str) -> QualifiedName {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", qname),
        };
        let namespace = self
            .prefixes
            .get(prefix)
            .cloned()
            .unwrap_or_else(|| self.target_namespace.clone());
        QualifiedName {
            namespace,
            local: local.to_string(),
        }
    }
}

fn strip_prefix(qname: &str) -> &str {
    qname.split_once(':').map_or(qname, |(_, local)| local)
}

pub(crate) fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Attributes as `(qualified key, unescaped value)` pairs.
pub(crate) fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, SoapError> {
    let mut out = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}
