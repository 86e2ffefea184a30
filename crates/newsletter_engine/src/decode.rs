use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::bytes::Regex;
use std::sync::LazyLock;

/// How far into the body an in-document charset declaration is looked for.
const SNIFF_WINDOW: usize = 1024;

static DECLARED_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:<meta[^>]+charset\s*=\s*["']?|<\?xml[^>]+encoding\s*=\s*["'])([A-Za-z0-9_\-:.]+)"#)
        .expect("DECLARED_CHARSET_RE should compile")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode body as {encoding}")]
    Malformed { encoding: String },
}

/// Decode a response body to UTF-8 text.
///
/// Order: byte-order mark, Content-Type charset, `<meta charset>` or XML
/// declaration near the start of the document, statistical detection.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<String, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(header_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    if let Some(enc) = declared_charset(bytes) {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\'']).to_string())
        } else {
            None
        }
    })
}

fn declared_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let label = DECLARED_CHARSET_RE.captures(window)?.get(1)?.as_bytes();
    // A page that claims UTF-16 while being read as bytes is really UTF-8.
    Encoding::for_label(label).map(|enc| enc.output_encoding())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<String, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: enc.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_header_is_case_insensitive() {
        assert_eq!(
            header_charset("text/html; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(header_charset("text/html"), None);
    }

    #[test]
    fn meta_charset_is_sniffed() {
        let bytes = b"<html><head><meta charset=\"iso-8859-1\"></head><body>caf\xe9</body></html>";
        let text = decode_body(bytes, Some("text/html")).unwrap();
        assert!(text.contains("caf\u{e9}"));
    }

    #[test]
    fn xml_declaration_is_sniffed() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><urlset>caf\xe9</urlset>";
        let text = decode_body(bytes, Some("application/xml")).unwrap();
        assert!(text.contains("caf\u{e9}"));
    }
}
