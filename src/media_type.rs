//! Media type detection for opened files.
//!
//! Content sniffing wins over the file name. When neither content nor
//! extension maps to a registered viewer, a valid UTF-8 header is treated as
//! plain text so unknown text formats still open.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;

use crate::plugin::PluginRegistry;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
const SNIFF_LEN: usize = 8192;

/// Read the head of `path` and detect its media type.
pub fn detect_media_type(path: &Path, registry: &PluginRegistry) -> io::Result<String> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(detect_from_header(path, &header, registry))
}

pub fn detect_from_header(path: &Path, header: &[u8], registry: &PluginRegistry) -> String {
    let sniffed = infer::get(header).map(|kind| kind.mime_type().to_string());
    let guessed = mime_guess::from_path(path).first().map(|m| m.essence_str().to_string());
    let resolvable = |media_type: &str| registry.resolve(media_type).is_ok();

    let detected = sniffed
        .clone()
        .filter(|m| resolvable(m))
        .or_else(|| guessed.clone().filter(|m| resolvable(m)))
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| registry.media_type_for_extension(ext))
                .map(str::to_string)
        })
        .or_else(|| looks_like_text(header).then(|| TEXT_PLAIN.to_string()))
        .or(sniffed)
        .or(guessed)
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    debug!("Detected {detected} for {path:?}");
    detected
}

/// Valid UTF-8 without NUL bytes. A multi-byte sequence cut off at the end
/// of the header still counts.
fn looks_like_text(header: &[u8]) -> bool {
    if header.contains(&0) {
        return false;
    }
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && header.len() - e.valid_up_to() < 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn registry() -> PluginRegistry {
        PluginRegistry::with_builtin_viewers()
    }

    #[test]
    fn content_beats_extension() {
        let detected = detect_from_header(Path::new("photo.txt"), PNG_MAGIC, &registry());
        assert_eq!(detected, "image/png");
    }

    #[test]
    fn extension_used_for_text_formats() {
        let registry = registry();
        assert_eq!(
            detect_from_header(Path::new("data.json"), b"{\"a\": 1}", &registry),
            "application/json"
        );
        assert_eq!(
            detect_from_header(Path::new("table.csv"), b"a,b\n1,2\n", &registry),
            "text/csv"
        );
    }

    #[test]
    fn registry_extensions_cover_unknown_guesses() {
        assert_eq!(
            detect_from_header(Path::new("build.log"), b"started\n", &registry()),
            "text/plain"
        );
    }

    #[test]
    fn unknown_utf8_falls_back_to_text() {
        assert_eq!(
            detect_from_header(Path::new("README"), b"hello world\n", &registry()),
            TEXT_PLAIN
        );
    }

    #[test]
    fn binary_without_viewer_is_octet_stream() {
        assert_eq!(
            detect_from_header(Path::new("blob"), &[0, 159, 146, 150], &registry()),
            OCTET_STREAM
        );
    }

    #[test]
    fn truncated_utf8_still_counts_as_text() {
        let mut header = "héllo".as_bytes().to_vec();
        header.extend_from_slice(&"é".as_bytes()[..1]);
        assert!(looks_like_text(&header));
        assert!(!looks_like_text(&[0xff, 0xfe, 0x00]));
    }
}
