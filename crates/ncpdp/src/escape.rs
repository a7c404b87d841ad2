//! Escaping of free text for the XML message.

/// Replace the five XML-reserved characters with their predefined entities.
///
/// `&` is replaced first so the entities introduced for the other characters are not
/// escaped a second time. Empty input yields an empty string.
pub fn escape(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Whether `c` may appear in an XML 1.0 document.
///
/// Entity escaping cannot carry the characters this rejects: C0 controls other than tab,
/// line feed and carriage return, plus U+FFFE and U+FFFF.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Byte offset and value of the first character in `text` that XML cannot carry.
pub fn first_forbidden_char(text: &str) -> Option<(usize, char)> {
    text.char_indices().find(|&(_, c)| !is_xml_char(c))
}
