//! Owned XML element tree
//!
//! Messages are decoded from and encoded to [`XElement`] values. Parsing goes
//! through quick-xml's namespace-resolving reader so documents using a
//! default namespace and documents using prefixes decode identically.
//! Writing declares every namespace used in the tree on the root element.

use std::fmt;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Writer;

use super::namespaces::{self, preferred_prefix};
use crate::support::errors::{truncate_fragment, CodecError};

/// Namespace-qualified name. Attributes are usually unqualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XName {
    pub namespace: Option<String>,
    pub local: String,
}

impl XName {
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            local: local.to_string(),
        }
    }

    pub fn unqualified(local: &str) -> Self {
        Self {
            namespace: None,
            local: local.to_string(),
        }
    }

    /// Name in the OCHP 1.4 namespace
    pub fn ochp(local: &str) -> Self {
        Self::new(namespaces::OCHP, local)
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }
}

impl fmt::Display for XName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// An element with attributes and either child elements or text.
#[derive(Debug, Clone, PartialEq)]
pub struct XElement {
    pub name: XName,
    pub attributes: Vec<(XName, String)>,
    pub children: Vec<XElement>,
    /// `None` and no children writes a self-closing tag; `Some("")` writes
    /// an explicit empty pair.
    pub text: Option<String>,
}

impl XElement {
    pub fn new(name: XName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attr(mut self, local: &str, value: impl Into<String>) -> Self {
        self.attributes
            .push((XName::unqualified(local), value.into()));
        self
    }

    pub fn with_qualified_attr(mut self, name: XName, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    /// Adds the attribute only when a value is present.
    pub fn with_opt_attr(self, local: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_attr(local, value),
            None => self,
        }
    }

    pub fn with_child(mut self, child: XElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_opt_child(mut self, child: Option<XElement>) -> Self {
        self.children.extend(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = XElement>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn push(&mut self, child: XElement) {
        self.children.push(child);
    }

    pub fn child(&self, name: &XName) -> Option<&XElement> {
        self.children.iter().find(|c| &c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &XName) -> impl Iterator<Item = &'a XElement> + 'a {
        let name = name.clone();
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Unqualified attribute value
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.namespace.is_none() && name.local == local)
            .map(|(_, value)| value.as_str())
    }

    pub fn qualified_attr(&self, name: &XName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    // ── Reading ────────────────────────────────────────────

    /// Parse a complete document and return its root element.
    pub fn parse_str(input: &str) -> Result<XElement, CodecError> {
        let mut reader = NsReader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XElement> = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(xml_error)?;
            let namespace = owned_namespace(resolved)?;

            match event {
                Event::Start(start) => {
                    stack.push(open_element(&reader, namespace, &start)?);
                }
                Event::Empty(start) => {
                    let element = open_element(&reader, namespace, &start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| CodecError::Xml("unbalanced closing tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(xml_error)?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(xml_error)?;
                    append_text(&mut stack, text);
                }
                Event::Eof => {
                    return Err(CodecError::Xml(if stack.is_empty() {
                        "document has no root element".into()
                    } else {
                        "unexpected end of document".into()
                    }))
                }
                _ => {}
            }
        }
    }

    // ── Writing ────────────────────────────────────────────

    pub fn to_xml_string(&self) -> Result<String, CodecError> {
        self.to_xml_string_with(&[])
    }

    /// Serialize, declaring `extra_namespaces` on the root even when unused.
    /// The root's own namespace is declared first, then the extras, then
    /// any other namespace in document order.
    pub fn to_xml_string_with(&self, extra_namespaces: &[&str]) -> Result<String, CodecError> {
        let mut used: Vec<&str> = Vec::new();
        if let Some(ns) = &self.name.namespace {
            used.push(ns);
        }
        for ns in extra_namespaces {
            if !used.contains(ns) {
                used.push(ns);
            }
        }
        self.collect_namespaces(&mut used);

        let scope = PrefixScope::assign(&used);
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer, &scope, true)?;
        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    /// Serialized form for error messages; never fails.
    pub(crate) fn fragment(&self) -> String {
        truncate_fragment(
            self.to_xml_string()
                .unwrap_or_else(|_| format!("<{}/>", self.name)),
        )
    }

    fn collect_namespaces<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(ns) = &self.name.namespace {
            if !out.contains(&ns.as_str()) {
                out.push(ns);
            }
        }
        for (name, _) in &self.attributes {
            if let Some(ns) = &name.namespace {
                if !out.contains(&ns.as_str()) {
                    out.push(ns);
                }
            }
        }
        for child in &self.children {
            child.collect_namespaces(out);
        }
    }

    fn write_into(
        &self,
        writer: &mut Writer<Vec<u8>>,
        scope: &PrefixScope,
        declare: bool,
    ) -> Result<(), CodecError> {
        let qname = scope.qualify(&self.name);
        let mut start = BytesStart::new(qname.clone());

        if declare {
            for (prefix, ns) in &scope.bindings {
                let key = format!("xmlns:{}", prefix);
                start.push_attribute((key.as_str(), ns.as_str()));
            }
        }
        for (name, value) in &self.attributes {
            let key = scope.qualify(name);
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?;
        }
        for child in &self.children {
            child.write_into(writer, scope, false)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(qname)))
            .map_err(xml_error)?;
        Ok(())
    }
}

/// Prefix bindings declared on the root of a written document
struct PrefixScope {
    bindings: Vec<(String, String)>,
}

impl PrefixScope {
    fn assign(namespaces: &[&str]) -> Self {
        let mut generated = 0;
        let bindings = namespaces
            .iter()
            .map(|ns| {
                let prefix = match preferred_prefix(ns) {
                    Some(prefix) => prefix.to_string(),
                    None => {
                        generated += 1;
                        format!("x{}", generated)
                    }
                };
                (prefix, ns.to_string())
            })
            .collect();
        Self { bindings }
    }

    fn qualify(&self, name: &XName) -> String {
        let prefix = name.namespace.as_deref().and_then(|ns| {
            self.bindings
                .iter()
                .find(|(_, bound)| bound == ns)
                .map(|(prefix, _)| prefix.as_str())
        });
        match prefix {
            Some(prefix) => format!("{}:{}", prefix, name.local),
            None => name.local.clone(),
        }
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<XElement, CodecError> {
    let local = utf8(start.local_name().as_ref())?;
    let mut element = XElement::new(XName { namespace, local });

    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attribute.key);
        let namespace = owned_namespace(resolved)?;
        let value = attribute.unescape_value().map_err(xml_error)?;
        element.attributes.push((
            XName {
                namespace,
                local: utf8(local.as_ref())?,
            },
            value.into_owned(),
        ));
    }

    Ok(element)
}

fn append_text(stack: &mut [XElement], text: &str) {
    if let Some(current) = stack.last_mut() {
        current
            .text
            .get_or_insert_with(String::new)
            .push_str(text);
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, CodecError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(CodecError::Xml(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, CodecError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(xml_error)
}

fn xml_error(e: impl fmt::Display) -> CodecError {
    CodecError::Xml(e.to_string())
}
