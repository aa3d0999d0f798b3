//! Render an [`OutgoingMessage`] into RFC 5322 message bytes.
//!
//! The output is a complete `.eml` document: a header block, then either
//! a single-part body or a `multipart/mixed` body with base64-encoded
//! attachment parts. Any standards-conforming MIME parser must accept
//! the result.

use crate::error::Result;
use crate::model::outgoing::OutgoingMessage;

use super::encode;

/// Serialize a message to its on-disk `.eml` byte representation.
pub fn serialize_message(msg: &OutgoingMessage) -> Result<Vec<u8>> {
    let mut out = String::new();

    out.push_str(&format!("From: {}\r\n", encode::encode_address(&msg.from)));
    if !msg.to.is_empty() {
        out.push_str(&encode::address_header("To", &msg.to));
        out.push_str("\r\n");
    }
    if !msg.cc.is_empty() {
        out.push_str(&encode::address_header("Cc", &msg.cc));
        out.push_str("\r\n");
    }
    if let Some(reply_to) = &msg.reply_to {
        out.push_str(&format!(
            "Reply-To: {}\r\n",
            encode::encode_address(reply_to)
        ));
    }
    out.push_str(&format!(
        "Subject: {}\r\n",
        encode::encode_header_text(&msg.subject)
    ));
    out.push_str(&format!("Date: {}\r\n", msg.date.to_rfc2822()));
    out.push_str("MIME-Version: 1.0\r\n");

    if msg.attachments.is_empty() {
        out.push_str(&format!(
            "Content-Type: {}; charset=utf-8\r\n",
            msg.kind.content_type()
        ));
        out.push_str("Content-Transfer-Encoding: 8bit\r\n");
        out.push_str("\r\n");
        out.push_str(&to_crlf(&msg.body));
    } else {
        serialize_multipart(msg, &mut out);
    }

    Ok(out.into_bytes())
}

fn serialize_multipart(msg: &OutgoingMessage, out: &mut String) {
    let body = to_crlf(&msg.body);
    let encoded_parts: Vec<String> = msg
        .attachments
        .iter()
        .map(|att| encode::base64_body(&att.data))
        .collect();
    let boundary = pick_boundary(&body, &encoded_parts);

    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n"
    ));
    out.push_str("\r\n");
    out.push_str("This is a multi-part message in MIME format.\r\n");

    // Body part
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&format!(
        "Content-Type: {}; charset=utf-8\r\n",
        msg.kind.content_type()
    ));
    out.push_str("Content-Transfer-Encoding: 8bit\r\n");
    out.push_str("\r\n");
    out.push_str(&body);
    out.push_str("\r\n");

    // Attachment parts
    for (att, encoded) in msg.attachments.iter().zip(&encoded_parts) {
        let filename = header_param(&att.filename);
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{filename}\"\r\n",
            att.content_type
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{filename}\"\r\n"
        ));
        out.push_str("\r\n");
        out.push_str(encoded);
    }

    out.push_str(&format!("--{boundary}--\r\n"));
}

/// Generate a boundary marker that does not occur in the body or in any
/// encoded attachment part.
fn pick_boundary(body: &str, encoded_parts: &[String]) -> String {
    loop {
        let candidate = format!(
            "----=_mailflow_{:016x}{:016x}",
            fastrand::u64(..),
            fastrand::u64(..)
        );
        let collides = body.contains(&candidate)
            || encoded_parts.iter().any(|p| p.contains(&candidate));
        if !collides {
            return candidate;
        }
    }
}

/// Normalize line endings to CRLF.
fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Escape a filename for use inside a quoted header parameter.
fn header_param(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use crate::model::message::ContentKind;
    use crate::model::outgoing::AttachmentPart;
    use chrono::TimeZone;

    fn plain_addr(address: &str) -> EmailAddress {
        EmailAddress {
            display_name: String::new(),
            address: address.to_string(),
        }
    }

    fn sample(attachments: Vec<AttachmentPart>) -> OutgoingMessage {
        OutgoingMessage {
            from: plain_addr("sender@x.com"),
            to: vec![plain_addr("ops@acme.com")],
            cc: Vec::new(),
            reply_to: None,
            subject: "Weekly report".to_string(),
            date: chrono::Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap(),
            body: "Hello\nworld".to_string(),
            kind: ContentKind::Plain,
            attachments,
        }
    }

    #[test]
    fn test_single_part_headers() {
        let bytes = serialize_message(&sample(Vec::new())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("From: sender@x.com\r\n"));
        assert!(text.contains("To: ops@acme.com\r\n"));
        assert!(text.contains("Subject: Weekly report\r\n"));
        assert!(text.contains("Date: Sat, 2 Mar 2024 10:00:00 +0000\r\n"));
        assert!(text.contains("MIME-Version: 1.0\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        // Body follows the blank line, CRLF-normalized
        assert!(text.contains("\r\n\r\nHello\r\nworld"));
        assert!(!text.contains("boundary"));
    }

    #[test]
    fn test_html_content_type() {
        let mut msg = sample(Vec::new());
        msg.kind = ContentKind::Html;
        msg.body = "<p>hi</p>".to_string();
        let text = String::from_utf8(serialize_message(&msg).unwrap()).unwrap();
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
    }

    #[test]
    fn test_multipart_structure() {
        let msg = sample(vec![AttachmentPart {
            filename: "data.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            data: vec![1, 2, 3, 4, 5],
        }]);
        let text = String::from_utf8(serialize_message(&msg).unwrap()).unwrap();

        let marker = "boundary=\"";
        let start = text.find(marker).expect("has boundary param") + marker.len();
        let end = start + text[start..].find('"').unwrap();
        let boundary = &text[start..end];

        // Two opening markers (body + one attachment) and one closing marker
        assert_eq!(text.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert_eq!(text.matches(&format!("--{boundary}--")).count(), 1);
        assert!(text.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(text.contains("Content-Disposition: attachment; filename=\"data.bin\"\r\n"));
        // Closing marker is last
        assert!(text.trim_end().ends_with(&format!("--{boundary}--")));
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        let mut msg = sample(Vec::new());
        msg.subject = "Informe de María".to_string();
        let text = String::from_utf8(serialize_message(&msg).unwrap()).unwrap();
        assert!(text.contains("Subject: =?utf-8?B?"));
        // Headers stay ASCII until the body separator
        let headers_end = text.find("\r\n\r\n").unwrap();
        assert!(text[..headers_end].is_ascii());
    }

    #[test]
    fn test_quoted_filename() {
        let msg = sample(vec![AttachmentPart {
            filename: "my \"notes\".txt".to_string(),
            content_type: "text/plain".to_string(),
            data: b"x".to_vec(),
        }]);
        let text = String::from_utf8(serialize_message(&msg).unwrap()).unwrap();
        assert!(text.contains("filename=\"my \\\"notes\\\".txt\""));
    }
}
