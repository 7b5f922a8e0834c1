//! Content-type detection from leading bytes.
//!
//! Implements the WHATWG MIME sniffing table for the formats a mock server
//! is likely to serve. Never fails: unknown binary data is
//! `application/octet-stream`.

/// Bytes considered when sniffing.
pub const SNIFF_LEN: usize = 512;

const TEXT_HTML: &str = "text/html; charset=utf-8";
const TEXT_XML: &str = "text/xml; charset=utf-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

const HTML_TAGS: [&[u8]; 17] = [
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const MAGIC_PREFIXES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", TEXT_PLAIN),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"ID3", "audio/mpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"MThd\x00\x00\x00\x06", "audio/midi"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"OTTO", "font/otf"),
    (b"\x00\x01\x00\x00", "font/ttf"),
    (b"ttcf", "font/collection"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00asm", "application/wasm"),
];

/// Container formats identified by the form type at offset 8.
const TAGGED_CONTAINERS: &[(&[u8], &[u8], &str)] = &[
    (b"RIFF", b"WEBPVP", "image/webp"),
    (b"RIFF", b"AVI ", "video/avi"),
    (b"RIFF", b"WAVE", "audio/wave"),
    (b"FORM", b"AIFF", "audio/aiff"),
];

/// Guess the content type of `data` from at most [`SNIFF_LEN`] leading bytes.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    let markup = skip_whitespace(data);
    if HTML_TAGS.iter().any(|tag| is_html_tag(markup, tag)) {
        return TEXT_HTML;
    }
    if markup.starts_with(b"<?xml") {
        return TEXT_XML;
    }

    if let Some((_, content_type)) = MAGIC_PREFIXES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
    {
        return *content_type;
    }

    if data.len() >= 12 {
        if let Some((_, _, content_type)) = TAGGED_CONTAINERS
            .iter()
            .find(|(head, form, _)| data.starts_with(head) && data[8..].starts_with(form))
        {
            return *content_type;
        }
    }

    if is_mp4(data) {
        return "video/mp4";
    }

    if data.iter().copied().any(is_binary) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(*b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_html_tag(data: &[u8], tag: &[u8]) -> bool {
    data.len() > tag.len()
        && data[..tag.len()].eq_ignore_ascii_case(tag)
        && matches!(data[tag.len()], b' ' | b'>')
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    // brands start at offset 8; offset 12 holds the minor version
    (8..box_size)
        .step_by(4)
        .filter(|offset| *offset != 12)
        .any(|offset| data[offset..].starts_with(b"mp4"))
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup() {
        assert_eq!(detect_content_type(b"  <!doctype html><html>"), TEXT_HTML);
        assert_eq!(detect_content_type(b"<p>hello</p>"), TEXT_HTML);
        assert_eq!(detect_content_type(b"<?xml version=\"1.0\"?>"), TEXT_XML);
        // `<pre>` is not one of the sniffed tags
        assert_eq!(detect_content_type(b"<pre>x</pre>"), TEXT_PLAIN);
    }

    #[test]
    fn test_images() {
        assert_eq!(
            detect_content_type(b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00\x00\x0DIHDR"),
            "image/png"
        );
        assert_eq!(detect_content_type(b"\xFF\xD8\xFF\xE0"), "image/jpeg");
        assert_eq!(detect_content_type(b"GIF89a...."), "image/gif");
        assert_eq!(detect_content_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_documents_and_archives() {
        assert_eq!(detect_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(detect_content_type(b"PK\x03\x04rest"), "application/zip");
        assert_eq!(detect_content_type(b"\x1F\x8B\x08\x00"), "application/x-gzip");
    }

    #[test]
    fn test_mp4() {
        let mut data = vec![0, 0, 0, 0x1C];
        data.extend_from_slice(b"ftypisom\x00\x00\x02\x00isomiso2mp41");
        assert_eq!(detect_content_type(&data), "video/mp4");
    }

    #[test]
    fn test_text_and_binary_fallback() {
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
        assert_eq!(detect_content_type(br#"{"ok": true}"#), TEXT_PLAIN);
        assert_eq!(detect_content_type(b"\x00\x01\x02\x03binary"), OCTET_STREAM);
    }

    #[test]
    fn test_only_leading_bytes_are_considered() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), TEXT_PLAIN);
    }
}
