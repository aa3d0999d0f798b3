//! Header encoding helpers: RFC 2047 encoded-words, address-list
//! folding, and base64 body wrapping.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::model::address::EmailAddress;

/// Maximum number of UTF-8 bytes encoded into a single encoded-word.
/// 45 source bytes → 60 base64 chars, comfortably under the 75-char
/// encoded-word limit with the `=?utf-8?B?...?=` framing.
const ENCODED_WORD_CHUNK: usize = 45;

/// Wrap column for base64-encoded binary content (RFC 2045 §6.8).
const BASE64_LINE_LEN: usize = 76;

/// Encode header text as-is when it is printable ASCII, or as one or
/// more RFC 2047 B-encoded words otherwise.
pub fn encode_header_text(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encode_word(&chunk));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(encode_word(&chunk));
    }
    // Whitespace between adjacent encoded-words is ignored by decoders.
    words.join("\r\n ")
}

fn encode_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", BASE64.encode(chunk.as_bytes()))
}

/// Render one address for a header, encoding the display name if needed.
pub fn encode_address(addr: &EmailAddress) -> String {
    if addr.display_name.is_empty() {
        return addr.address.clone();
    }
    let name = if addr
        .display_name
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control())
    {
        // Quote names carrying address-list specials.
        if addr.display_name.contains([',', ';', '<', '>', '"', '(', ')', ':', '@']) {
            format!("\"{}\"", addr.display_name.replace('"', "\\\""))
        } else {
            addr.display_name.clone()
        }
    } else {
        encode_header_text(&addr.display_name)
    };
    format!("{} <{}>", name, addr.address)
}

/// Render a `Name: addr1, addr2, ...` header line, folded so that each
/// continuation line stays under 78 characters where possible.
pub fn address_header(name: &str, addrs: &[EmailAddress]) -> String {
    let mut out = format!("{name}: ");
    let mut line_len = out.len();
    for (i, addr) in addrs.iter().enumerate() {
        let rendered = encode_address(addr);
        let sep = if i > 0 { ", " } else { "" };
        if i > 0 && line_len + sep.len() + rendered.len() > 78 {
            out.push(',');
            out.push_str("\r\n ");
            line_len = 1;
        } else {
            out.push_str(sep);
            line_len += sep.len();
        }
        line_len += rendered.len();
        out.push_str(&rendered);
    }
    out
}

/// Base64-encode binary content wrapped at 76 columns with CRLF line
/// endings, ready to place inside a MIME part.
pub fn base64_body(data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LEN * 2 + 2);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        // Chunks of an ASCII string are valid UTF-8.
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push_str("\r\n");
    }
    out
}
