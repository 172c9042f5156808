use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;

use super::dto::MessagePart;

/// Gmail bodies are base64url, sometimes padded and sometimes not.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static SCRIPT_OR_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(br|/p|/div|/li|/tr|/h[1-6])[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static EXTRA_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Decodes a base64url body; anything undecodable becomes an empty string.
pub fn decode_base64url(data: &str) -> String {
    match GMAIL_BASE64.decode(data.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Failed to decode message body: {}", e);
            String::new()
        }
    }
}

pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, "");
    let text = BREAK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = BLANK_RUN.replace_all(&text, " ");
    EXTRA_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}

fn decode_part(part: &MessagePart, data: &str) -> String {
    let decoded = decode_base64url(data);
    if part.mime_type.eq_ignore_ascii_case("text/html") {
        strip_html(&decoded)
    } else {
        decoded
    }
}

/// Plain-text body of a message payload.
///
/// A body attached directly to the part wins. Otherwise `text/plain` parts are
/// concatenated, nested multiparts are walked, and `text/html` is only used while
/// no text has been found yet.
pub fn extract_body(part: &MessagePart) -> String {
    if let Some(data) = part.data() {
        return decode_part(part, data);
    }

    let mut body = String::new();
    for child in &part.parts {
        let mime = child.mime_type.to_ascii_lowercase();
        match child.data() {
            Some(data) if mime == "text/plain" => body.push_str(&decode_base64url(data)),
            Some(data) if mime == "text/html" => {
                if body.is_empty() {
                    body = strip_html(&decode_base64url(data));
                }
            }
            _ if !child.parts.is_empty() => body.push_str(&extract_body(child)),
            _ => {}
        }
    }
    body
}
