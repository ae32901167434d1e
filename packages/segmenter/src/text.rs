//! Source text normalization.

use unicode_normalization::UnicodeNormalization;

/// Normalize converter output before segmentation.
///
/// Removes a leading byte-order mark, turns CRLF and lone CR into LF and
/// applies NFC, so that every character offset downstream refers to the same
/// composed text regardless of how the source encoded its diacritics.
///
/// # Examples
/// ```
/// use textus_segmenter::text::normalize;
///
/// // ε + combining acute composes to έ
/// assert_eq!(normalize("\u{feff}λε\u{301}γω\r\n"), "λ\u{3ad}γω\n");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    text.nfc().collect()
}
