//! Thin wrapper around the HTML tree library.
//!
//! Markup-level response actions operate on a parsed document, not on raw
//! text. This module is the only place the HTML crate is touched: the rest
//! of the engine sees [`Document`] and [`Element`] and the small contract
//! they expose (parse, tag selection in document order, attribute access,
//! text replacement, child appending, rendering back to text).
//!
//! The tree is reference-counted with interior mutability, so elements can
//! be mutated through shared handles; a [`Document`] and every [`Element`]
//! selected from it share one underlying tree.

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use std::fmt;
use tracing::warn;

/// A parsed HTML document.
pub struct Document {
    root: NodeRef,
    base_url: String,
}

impl Document {
    /// Parse an HTML document from text.
    ///
    /// `base_url` is the URL the markup was fetched from; it is kept for
    /// diagnostics and for callers that resolve relative references.
    pub fn parse(text: &str, base_url: &str) -> Document {
        Document {
            root: kuchiki::parse_html().one(text),
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All elements with the given tag name, in document order.
    pub fn select(&self, tag: &str) -> Vec<Element> {
        match self.root.select(tag) {
            Ok(matches) => matches
                .map(|data| Element::from_node(data.as_node().clone()))
                .collect(),
            Err(()) => {
                warn!("invalid selector {:?}, selecting nothing", tag);
                Vec::new()
            }
        }
    }

    /// The first element with the given tag name, in document order.
    pub fn select_first(&self, tag: &str) -> Option<Element> {
        self.root
            .select_first(tag)
            .ok()
            .map(|data| Element::from_node(data.as_node().clone()))
    }

    /// The `<body>` element, if the document has one.
    pub fn body(&self) -> Option<Element> {
        self.select_first("body")
    }

    /// Serialize the document back to HTML text.
    pub fn render(&self) -> String {
        let mut bytes = Vec::new();
        if self.root.serialize(&mut bytes).is_err() {
            warn!("failed to serialize document parsed from {}", self.base_url);
            return String::new();
        }
        String::from_utf8(bytes).unwrap_or_default()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// A handle to a single element inside a [`Document`].
///
/// Handles are cheap to clone and mutate the shared tree in place.
#[derive(Clone)]
pub struct Element {
    node: NodeRef,
}

impl Element {
    fn from_node(node: NodeRef) -> Element {
        Element { node }
    }

    /// Build a detached element with the given tag name and inner HTML.
    ///
    /// Returns `None` when the fragment cannot be parsed into an element,
    /// e.g. for an empty tag name. The tag name is lowercased, matching
    /// how the parser normalizes element names.
    pub fn from_html(tag: &str, inner_html: &str) -> Option<Element> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return None;
        }
        let fragment =
            kuchiki::parse_html().one(format!("<{}>{}</{}>", tag, inner_html, tag).as_str());
        let element = fragment.select_first(tag.as_str()).ok()?;
        let node = element.as_node().clone();
        node.detach();
        Some(Element::from_node(node))
    }

    /// The element's tag name.
    pub fn name(&self) -> String {
        self.node
            .as_element()
            .map(|data| data.name.local.to_string())
            .unwrap_or_default()
    }

    /// An attribute value, if present.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.node
            .as_element()
            .and_then(|data| data.attributes.borrow().get(name).map(str::to_string))
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&self, name: &str, value: &str) {
        if let Some(data) = self.node.as_element() {
            data.attributes
                .borrow_mut()
                .insert(name, value.to_string());
        }
    }

    /// The concatenated text of the element and its descendants.
    pub fn text(&self) -> String {
        self.node.text_contents()
    }

    /// Replace the element's children with a single text node.
    pub fn set_text(&self, text: &str) {
        let children: Vec<NodeRef> = self.node.children().collect();
        for child in children {
            child.detach();
        }
        self.node.append(NodeRef::new_text(text));
    }

    /// Append a child element, detaching it from wherever it was.
    pub fn append_child(&self, child: &Element) {
        child.node.detach();
        self.node.append(child.node.clone());
    }

    /// Serialize the element (including its own tag) to HTML text.
    pub fn html(&self) -> String {
        let mut bytes = Vec::new();
        if self.node.serialize(&mut bytes).is_err() {
            return String::new();
        }
        String::from_utf8(bytes).unwrap_or_default()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><head><title>t</title></head><body>\
                        <p class=\"lead\">one</p><p>two</p><div id=\"x\">three</div>\
                        </body></html>";

    #[test]
    fn test_select_in_document_order() {
        let document = Document::parse(PAGE, "http://localhost");
        let paragraphs = document.select("p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text(), "one");
        assert_eq!(paragraphs[1].text(), "two");
    }

    #[test]
    fn test_select_unknown_tag_is_empty() {
        let document = Document::parse(PAGE, "http://localhost");
        assert!(document.select("article").is_empty());
    }

    #[test]
    fn test_attribute_access() {
        let document = Document::parse(PAGE, "http://localhost");
        let div = document.select_first("div").unwrap();
        assert_eq!(div.attribute("id").as_deref(), Some("x"));
        assert_eq!(div.attribute("missing"), None);

        div.set_attribute("id", "y");
        div.set_attribute("data-extra", "1");
        assert_eq!(div.attribute("id").as_deref(), Some("y"));
        assert_eq!(div.attribute("data-extra").as_deref(), Some("1"));
    }

    #[test]
    fn test_set_text_replaces_children() {
        let document = Document::parse(
            "<html><body><p>old <b>markup</b></p></body></html>",
            "http://localhost",
        );
        let paragraph = document.select_first("p").unwrap();
        paragraph.set_text("new");
        assert_eq!(paragraph.text(), "new");
        assert!(document.render().contains("<p>new</p>"));
    }

    #[test]
    fn test_append_built_element_to_body() {
        let document = Document::parse(PAGE, "http://localhost");
        let aside = Element::from_html("aside", "<span>hi</span>").unwrap();
        document.body().unwrap().append_child(&aside);

        let selected = document.select("aside");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].text(), "hi");
        assert!(document.render().contains("<aside><span>hi</span></aside>"));
    }

    #[test]
    fn test_from_html_rejects_empty_tag() {
        assert!(Element::from_html("", "content").is_none());
        assert!(Element::from_html("   ", "content").is_none());
    }

    #[test]
    fn test_render_round_trip_is_whitespace_stable() {
        let document = Document::parse(PAGE, "http://localhost");
        let collapse = |s: &str| s.split_whitespace().collect::<String>();
        assert_eq!(collapse(&document.render()), collapse(PAGE));
    }
}
