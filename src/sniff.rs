//! File type detection from content.
//!
//! Download URLs rarely carry a usable extension, so the extension of a
//! finished artifact is chosen from its leading bytes.

/// Extension used when the content is not recognized.
pub const FALLBACK_EXTENSION: &str = "exe";

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"PK\x03\x04", "zip"),
    (b"7z\xBC\xAF\x27\x1C", "7z"),
    (b"Rar!\x1A\x07", "rar"),
    (b"\x1F\x8B", "gz"),
    (b"\xFD7zXZ\x00", "xz"),
    (b"BZh", "bz2"),
    (b"MSCF", "cab"),
    (b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1", "msi"),
    (b"%PDF", "pdf"),
];

/// Pick an extension for `bytes`, or `None` when the type is unknown.
pub fn detect_extension(bytes: &[u8]) -> Option<&'static str> {
    if let Ok(object) = goblin::Object::parse(bytes) {
        match object {
            goblin::Object::PE(pe) if pe.is_lib => return Some("dll"),
            goblin::Object::PE(_) => return Some("exe"),
            goblin::Object::Elf(_) => return Some("elf"),
            _ => {}
        }
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, ext)| *ext)
}

/// Like [`detect_extension`], defaulting to [`FALLBACK_EXTENSION`].
pub fn extension_or_default(bytes: &[u8]) -> &'static str {
    detect_extension(bytes).unwrap_or(FALLBACK_EXTENSION)
}
