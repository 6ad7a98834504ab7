//! Content type detection for artifact payloads
//!
//! Magic bytes win over everything else, then a text heuristic, then the file name's extension.

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// How many leading bytes are looked at
const SNIFF_LEN: usize = 8192;

struct Magic {
	offset: usize,
	bytes: &'static [u8],
	content_type: &'static str,
}

const fn magic(offset: usize, bytes: &'static [u8], content_type: &'static str) -> Magic {
	Magic {
		offset,
		bytes,
		content_type,
	}
}

const MAGIC: &[Magic] = &[
	// Images
	magic(0, &[0xFF, 0xD8, 0xFF], "image/jpeg"),
	magic(0, b"\x89PNG\r\n\x1A\n", "image/png"),
	magic(0, b"GIF87a", "image/gif"),
	magic(0, b"GIF89a", "image/gif"),
	magic(0, b"BM", "image/bmp"),
	magic(0, &[0x49, 0x49, 0x2A, 0x00], "image/tiff"),
	magic(0, &[0x4D, 0x4D, 0x00, 0x2A], "image/tiff"),
	magic(4, b"ftypheic", "image/heic"),
	magic(4, b"ftypavif", "image/avif"),
	// Audio and video
	magic(0, b"ID3", "audio/mpeg"),
	magic(0, b"fLaC", "audio/flac"),
	magic(0, b"OggS", "audio/ogg"),
	magic(4, b"ftypisom", "video/mp4"),
	magic(4, b"ftypmp42", "video/mp4"),
	magic(4, b"ftypqt  ", "video/quicktime"),
	magic(0, &[0x1A, 0x45, 0xDF, 0xA3], "video/x-matroska"),
	// Documents and archives
	magic(0, b"%PDF-", "application/pdf"),
	magic(0, b"PK\x03\x04", "application/zip"),
	magic(0, &[0x1F, 0x8B], "application/gzip"),
	magic(0, b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
	magic(0, b"SQLite format 3\0", "application/vnd.sqlite3"),
];

/// RIFF containers carry their actual format at offset 8
const RIFF: &[(&[u8], &str)] = &[
	(b"WEBP", "image/webp"),
	(b"WAVE", "audio/wav"),
	(b"AVI ", "video/x-msvideo"),
];

/// Determines the content type of `data`, using `file_name` only when the bytes are inconclusive
#[must_use]
pub fn sniff(data: &[u8], file_name: Option<&str>) -> String {
	let head = &data[..data.len().min(SNIFF_LEN)];

	if let Some(content_type) = by_magic(head) {
		return content_type.to_owned();
	}

	if !head.is_empty() && looks_like_text(head) {
		// Text formats (json, csv, html, ...) are told apart by their extension
		return file_name
			.and_then(|name| mime_guess::from_path(name).first())
			.filter(|mime| mime.type_() == mime_guess::mime::TEXT || is_textual(mime))
			.map_or_else(|| TEXT_PLAIN.to_owned(), |mime| mime.essence_str().to_owned());
	}

	file_name
		.and_then(|name| mime_guess::from_path(name).first())
		.map_or_else(|| OCTET_STREAM.to_owned(), |mime| mime.essence_str().to_owned())
}

fn by_magic(head: &[u8]) -> Option<&'static str> {
	if head.len() >= 12 && &head[..4] == b"RIFF" {
		if let Some(content_type) = RIFF
			.iter()
			.find(|(tag, _)| &head[8..12] == *tag)
			.map(|(_, content_type)| *content_type)
		{
			return Some(content_type);
		}
	}

	MAGIC
		.iter()
		.find(|m| {
			head.get(m.offset..m.offset + m.bytes.len())
				.is_some_and(|window| window == m.bytes)
		})
		.map(|m| m.content_type)
}

fn is_textual(mime: &mime_guess::Mime) -> bool {
	let sub = mime.subtype().as_str();
	matches!(sub, "json" | "xml" | "javascript" | "x-sh" | "toml" | "yaml")
		|| mime.suffix().is_some_and(|suffix| matches!(suffix.as_str(), "json" | "xml"))
}

/// Valid UTF-8 (a multi-byte sequence cut off at the sniff boundary is fine) without control
/// characters, or Latin-1 looking bytes without control characters.
fn looks_like_text(head: &[u8]) -> bool {
	let is_control = |b: u8| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B);

	if head.iter().copied().any(is_control) || head.contains(&0x7F) {
		return false;
	}

	match std::str::from_utf8(head) {
		Ok(_) => true,
		Err(e) if e.error_len().is_none() => true,
		// Latin-1: C1 control range is never used by text
		Err(_) => !head.iter().any(|b| (0x80..0xA0).contains(b)),
	}
}
