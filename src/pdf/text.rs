//! PDF text string encoding and decoding

use lopdf::{Object, StringFormat};

const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// PDFDocEncoding code points 0x80..=0x9F; the rest of the upper half
/// matches Latin-1.
const PDF_DOC_HIGH: [char; 32] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
];

/// Decode the bytes of a PDF text string
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(UTF16BE_BOM) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(body) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8_lossy(body).into_owned();
    }

    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => PDF_DOC_HIGH[(b - 0x80) as usize],
            _ => b as char,
        })
        .collect()
}

/// Decode a string or name object; other objects decode to `None`
pub fn decode_object(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Encode text as a PDF string object.
///
/// Printable ASCII stays a literal string; anything else is written as
/// UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Object {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b) || b == b'\n' || b == b'\t') {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = UTF16BE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(decode_text_string(b"Alice"), "Alice");
    }

    #[test]
    fn test_decode_utf16be() {
        let bytes = [0xFE, 0xFF, 0x30, 0x42, 0x30, 0x44];
        assert_eq!(decode_text_string(&bytes), "あい");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("héllo".as_bytes());
        assert_eq!(decode_text_string(&bytes), "héllo");
    }

    #[test]
    fn test_decode_pdf_doc_encoding() {
        assert_eq!(decode_text_string(&[0x84, 0xE9]), "\u{2014}é");
    }

    #[test]
    fn test_encode_ascii_is_literal() {
        assert!(matches!(
            encode_text_string("Bob"),
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Bob"
        ));
    }

    #[test]
    fn test_encode_non_ascii_is_utf16() {
        let obj = encode_text_string("山田");
        let Object::String(bytes, format) = obj else {
            panic!("expected string object");
        };
        assert!(matches!(format, StringFormat::Hexadecimal));
        assert_eq!(decode_text_string(&bytes), "山田");
    }

    #[test]
    fn test_decode_name_object() {
        assert_eq!(
            decode_object(&Object::Name(b"Green".to_vec())),
            Some("Green".to_string())
        );
        assert_eq!(decode_object(&Object::Integer(3)), None);
    }
}
