//! Namespace-aware XML element tree with path-exact lookup.
//!
//! The vendor schemas reuse element names at different nesting depths
//! with different meanings, so this layer deliberately exposes only
//! strict child-chain resolution ([`XmlElement::resolve`]): a field can
//! only be reached through its declared ancestor chain, and there is no
//! find-anywhere API to fall back to.

use std::io::BufRead;

use anyhow::{anyhow, bail};
use hashbrown::HashMap;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

/// A materialized XML element: resolved local name, namespace URI,
/// attributes, concatenated text content and child elements in document
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    namespace: Option<String>,
    attributes: HashMap<String, String>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(
        name: String,
        namespace: Option<String>,
        attributes: HashMap<String, String>,
    ) -> Self {
        XmlElement {
            name,
            namespace,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Local (prefix-stripped) element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI the element resolved to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Attribute value by local attribute name.
    pub fn attr(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Trimmed text content; `None` when the element carries none.
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// First direct child with the given local name.
    pub fn child(
        &self,
        name: &str,
    ) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name, in document order.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Descends an explicit chain of child local names from this node.
    ///
    /// Each step takes the first matching direct child; the lookup never
    /// scans other depths. This is the only way fields are reached, so a
    /// same-named element outside the declared chain cannot be matched
    /// by accident.
    pub fn resolve(
        &self,
        path: &[&str],
    ) -> Option<&XmlElement> {
        let mut node = self;
        for name in path {
            node = node.child(name)?;
        }
        Some(node)
    }

    /// Like [`resolve`](Self::resolve), but returns every direct child
    /// matching the final path segment (intermediate segments still take
    /// the first match). Empty when the parent chain does not resolve.
    pub fn resolve_all(
        &self,
        path: &[&str],
    ) -> Vec<&XmlElement> {
        match path.split_last() {
            None => vec![self],
            Some((last, parents)) => {
                self.resolve(parents)
                    .map(|parent| parent.children_named(last).collect())
                    .unwrap_or_default()
            },
        }
    }
}

/// Parses a whole XML document into its root [`XmlElement`].
pub fn parse_document<R: BufRead>(reader: R) -> anyhow::Result<XmlElement> {
    let mut reader = NsReader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        let (resolution, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(start) => {
                let element = element_from_start(&resolution, &start)?;
                stack.push(element);
            },
            Event::Empty(start) => {
                let element = element_from_start(&resolution, &start)?;
                attach(&mut stack, &mut root, element)?;
            },
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| anyhow!("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            },
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            },
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            },
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no
            // extractable content.
            _ => {},
        }
        buf.clear();
    }

    if !stack.is_empty() {
        bail!("document ended with {} unclosed element(s)", stack.len());
    }
    root.ok_or_else(|| anyhow!("document contains no root element"))
}

/// Parses a document held in memory.
pub fn parse_str(content: &str) -> anyhow::Result<XmlElement> {
    parse_document(content.as_bytes())
}

fn element_from_start(
    resolution: &ResolveResult,
    start: &quick_xml::events::BytesStart,
) -> anyhow::Result<XmlElement> {
    let name =
        String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let namespace = match resolution {
        ResolveResult::Bound(Namespace(uri)) => {
            Some(String::from_utf8_lossy(uri).into_owned())
        },
        _ => None,
    };

    let mut attributes = HashMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref())
            .into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(XmlElement::new(name, namespace, attributes))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> anyhow::Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
    else if root.is_none() {
        *root = Some(element);
    }
    else {
        bail!("document contains more than one root element");
    }
    Ok(())
}
