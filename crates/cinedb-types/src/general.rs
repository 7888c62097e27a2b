use unicode_normalization::UnicodeNormalization;

/// Key used for case insensitive uniqueness of names.
///
/// Trimmed, NFC normalized and lowercased, so "Acción", "ACCIÓN" and the
/// decomposed form of "acción" all map to the same key.
pub fn name_key(name: &str) -> String {
    name.trim().nfc().flat_map(char::to_lowercase).collect()
}
