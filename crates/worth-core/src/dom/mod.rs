//! Candidate texts read from DOM nodes.
//!
//! The analyzer only reads the tree. It never follows more than one level of
//! children or siblings and caps both the number and the length of the
//! attribute and assembled texts it hands to the pattern passes. The plain
//! text of a node is never cut.

use scraper::{ElementRef, Node};

use crate::models::ExtractionConfig;

/// Attributes that may carry a price, in lookup order.
pub const PRICE_ATTRIBUTES: &[&str] = &[
    "aria-label",
    "data-price",
    "data-price-amount",
    "data-amount",
    "data-value",
];

/// Attribute naming the currency of a bare `data-price` amount.
pub const CURRENCY_ATTRIBUTE: &str = "data-currency";

pub const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Where a candidate text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// Value of the named attribute.
    Attribute(&'static str),
    /// Child or sibling texts concatenated without separators.
    Assembled,
    /// Child or sibling texts joined by single spaces.
    AssembledSpaced,
    /// Whole text content of the node.
    TextContent,
}

impl TextSource {
    /// Attribute values meant for machines rather than display.
    pub fn is_machine_readable(self) -> bool {
        matches!(self, TextSource::Attribute(name) if name.starts_with("data-") || name == "content")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateText {
    pub text: String,
    pub source: TextSource,
}

impl CandidateText {
    fn new(text: String, source: TextSource) -> Self {
        Self { text, source }
    }
}

/// Reads attribute, assembled and plain texts from a node.
#[derive(Debug, Clone)]
pub struct DomStructureAnalyzer {
    max_children: usize,
    max_text_length: usize,
    max_candidates: usize,
}

impl Default for DomStructureAnalyzer {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl DomStructureAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            max_children: config.max_children.max(2),
            max_text_length: config.max_text_length.max(1),
            max_candidates: config.max_candidate_texts.max(1),
        }
    }

    /// All candidate texts, cheapest and most specific first.
    pub fn candidate_texts(&self, node: ElementRef<'_>) -> Vec<CandidateText> {
        let mut texts = self.attribute_texts(node);
        texts.extend(self.assembled_texts(node));
        texts.extend(
            self.text_content(node)
                .map(|t| CandidateText::new(self.truncate(t), TextSource::TextContent)),
        );

        let mut seen: Vec<String> = Vec::new();
        texts.retain(|c| {
            let fresh = !seen.contains(&c.text);
            if fresh {
                seen.push(c.text.clone());
            }
            fresh
        });
        texts.truncate(self.max_candidates);
        texts
    }

    /// Non-empty price attributes, plus `content` on `itemprop="price"`.
    pub fn attribute_texts(&self, node: ElementRef<'_>) -> Vec<CandidateText> {
        let element = node.value();
        let mut texts: Vec<CandidateText> = PRICE_ATTRIBUTES
            .iter()
            .filter_map(|&name| {
                let value = element.attr(name)?;
                let value = self.truncate(self.collapse(value));
                (!value.is_empty()).then(|| CandidateText::new(value, TextSource::Attribute(name)))
            })
            .collect();

        if element.attr("itemprop").is_some_and(|p| p.trim().eq_ignore_ascii_case("price")) {
            if let Some(content) = element.attr("content").map(|c| self.truncate(self.collapse(c))) {
                if !content.is_empty() {
                    texts.push(CandidateText::new(content, TextSource::Attribute("content")));
                }
            }
        }

        texts
    }

    /// Child texts concatenated in document order, first without and then
    /// with single spaces. A node without element children is assembled from
    /// its siblings instead.
    pub fn assembled_texts(&self, node: ElementRef<'_>) -> Vec<CandidateText> {
        let has_element_children = node.children().any(|c| ElementRef::wrap(c).is_some());
        let pieces = if has_element_children {
            self.pieces(node)
        } else {
            match node.parent().and_then(ElementRef::wrap) {
                Some(parent) => self.pieces(parent),
                None => Vec::new(),
            }
        };

        if pieces.len() < 2 {
            return Vec::new();
        }

        let glued = self.truncate(pieces.concat());
        let spaced = self.truncate(pieces.join(" "));

        let mut texts = vec![CandidateText::new(glued, TextSource::Assembled)];
        if spaced != texts[0].text {
            texts.push(CandidateText::new(spaced, TextSource::AssembledSpaced));
        }
        texts
    }

    /// Whitespace-collapsed visible text of the node, at full length.
    pub fn text_content(&self, node: ElementRef<'_>) -> Option<String> {
        let mut raw = String::new();
        visible_text(node, &mut raw);
        let text = self.collapse(&raw);
        (!text.is_empty()).then_some(text)
    }

    /// Collapse whitespace runs into single spaces.
    pub fn collapse(&self, text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.max_text_length) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        }
    }

    fn pieces(&self, parent: ElementRef<'_>) -> Vec<String> {
        parent
            .children()
            .filter_map(|child| {
                let mut raw = String::new();
                match child.value() {
                    Node::Text(text) => raw.push_str(text),
                    Node::Element(element) if SKIPPED_TAGS.contains(&element.name()) => {}
                    Node::Element(_) => {
                        if let Some(element) = ElementRef::wrap(child) {
                            visible_text(element, &mut raw);
                        }
                    }
                    _ => {}
                }
                let piece = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                (!piece.is_empty()).then_some(piece)
            })
            .take(self.max_children)
            .collect()
    }
}

fn visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if SKIPPED_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    visible_text(child, out);
                }
            }
            _ => {}
        }
    }
}
