//! Content type sniffing.
//!
//! Implements the subset of the WHATWG MIME sniffing algorithm that matters
//! for stored files: magic signatures, HTML/XML markers, UTF byte order
//! marks, and a text-versus-binary heuristic. Only the first
//! [`SNIFF_LEN`](super::SNIFF_LEN) bytes are considered.
//!
//! The signature table and its order follow Go's `net/http`
//! `DetectContentType` (`sniff.go`), so stored types match what a Go
//! service would record for the same bytes.

use super::SNIFF_LEN;

/// Fallback when nothing matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

const HTML: &str = "text/html; charset=utf-8";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";

/// Tags that identify an HTML document when they open it.
const HTML_TAGS: &[&[u8]] = &[
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

/// Exact-prefix signatures, checked in order.
const PREFIXES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", TEXT_UTF8),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"MThd\x00\x00\x00\x06", "audio/midi"),
    (b"ID3", "audio/mpeg"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
];

/// RIFF containers: the format tag sits at offset 8.
const RIFF_FORMATS: &[(&[u8], &str)] = &[
    (b"WEBPVP", "image/webp"),
    (b"WAVE", "audio/wave"),
    (b"AVI ", "video/avi"),
];

/// Determine the MIME type of content from its leading bytes.
///
/// Always returns a valid MIME type; unrecognized binary data is
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    let trimmed = skip_whitespace(data);
    if is_html(trimmed) {
        return HTML;
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some((_, mime)) = PREFIXES.iter().find(|(sig, _)| data.starts_with(sig)) {
        return *mime;
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") {
        let tag = &data[8..];
        if let Some((_, mime)) = RIFF_FORMATS.iter().find(|(sig, _)| tag.starts_with(sig)) {
            return *mime;
        }
    }

    if is_mp4(data) {
        return "video/mp4";
    }

    if !data.is_empty() && !data.iter().any(|b| is_binary_byte(*b)) {
        return TEXT_UTF8;
    }

    OCTET_STREAM
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | 0x0C | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_html(data: &[u8]) -> bool {
    HTML_TAGS.iter().any(|tag| {
        if data.len() <= tag.len() {
            return false;
        }
        if !data[..tag.len()].eq_ignore_ascii_case(tag) {
            return false;
        }
        // The tag must be terminated by a space or '>'.
        matches!(data[tag.len()], b' ' | b'>')
    })
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size > data.len() || box_size % 4 != 0 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }

    // Major brand at 8, then compatible brands after the minor version.
    let brands = std::iter::once(8).chain((16..box_size).step_by(4));
    brands
        .filter(|&i| i + 3 <= data.len())
        .any(|i| &data[i..i + 3] == b"mp4")
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
