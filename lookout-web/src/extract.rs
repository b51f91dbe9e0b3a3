use scraper::{ElementRef, Html, Node};

/// Elements whose whole subtree is dropped before collecting text.
const HIDDEN_TAGS: [&str; 2] = ["script", "style"];

/// Visible text of an HTML document.
///
/// `<script>` and `<style>` subtrees are removed; every other text node is
/// concatenated in document order exactly as parsed (entities decoded,
/// whitespace and line breaks left untouched). Comments are not text.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    collect_text(&document.root_element(), &mut out);
    out
}

fn collect_text(element: &ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if HIDDEN_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// The first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
/// No word or sentence awareness.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
