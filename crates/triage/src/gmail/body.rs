//! Message body extraction
//!
//! Gmail delivers bodies as a tree of parts whose leaves carry
//! base64url-encoded data. Extraction picks the first data-bearing part in
//! level order, bounded by depth, decodes it and reduces any markup to
//! newline-separated plain text.

use std::collections::VecDeque;

use base64::prelude::*;
use log::warn;
use scraper::Html;

use super::api::{GmailMessage, Header, MessagePart};

/// Depth searched for inline data: the payload itself (0) and its direct parts (1).
///
/// Data nested deeper than this is not found; such messages yield an empty body.
pub const BODY_SEARCH_DEPTH: usize = 1;

/// Extract the plain-text body of a message
///
/// Returns an empty string when no inline data is reachable within
/// [`BODY_SEARCH_DEPTH`] or when the data cannot be decoded.
pub fn extract_body(message: &GmailMessage) -> String {
    let Some(payload) = &message.payload else {
        return String::new();
    };

    let Some(data) = find_inline_data(payload, BODY_SEARCH_DEPTH) else {
        return String::new();
    };

    match decode_base64_body(data) {
        Some(decoded) => strip_markup(&decoded),
        None => {
            warn!("Message {} has undecodable body data", message.id);
            String::new()
        }
    }
}

/// Find the first part carrying inline data, searching level by level
///
/// Depth 0 is `root` itself. Parts deeper than `max_depth` are never visited.
pub fn find_inline_data(root: &MessagePart, max_depth: usize) -> Option<&str> {
    let mut queue = VecDeque::from([(root, 0usize)]);

    while let Some((part, depth)) = queue.pop_front() {
        if let Some(data) = part.inline_data() {
            return Some(data);
        }
        if depth < max_depth {
            queue.extend(part.children().iter().map(|child| (child, depth + 1)));
        }
    }

    None
}

/// Look up a header value by name; the first match wins
///
/// Names compare ignoring ASCII case, so a lowercase `subject` header is
/// found by a lookup for `Subject`.
pub fn extract_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    let bytes = decoders.iter().find_map(|decoder| decoder.decode(data).ok())?;

    Some(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Strip markup, returning the text content
///
/// Every text node becomes its own line. Comments and the contents of
/// `<script>` and `<style>` are dropped, entities are decoded by the parser
/// and the result is trimmed. Text without markup comes back unchanged apart
/// from trimming.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let blocks: Vec<&str> = fragment
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, &**text)))
        .filter(|(_, text)| !text.trim().is_empty())
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| matches!(el.name(), "script" | "style"))
            })
        })
        .map(|(_, text)| text)
        .collect();

    blocks.join("\n").trim().to_string()
}
