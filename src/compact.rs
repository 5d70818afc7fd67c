//! Doc comment text for generated items
//!
//! When --compact is enabled, every description is cut down to its first
//! sentence so the generated library stays small and skimmable.

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &["e.g", "i.e", "etc", "vs"];

const MAX_UNBROKEN: usize = 100;

/// Text to put in a doc comment, or `None` when there is nothing to say.
pub fn doc_text(description: &str, compact: bool) -> Option<String> {
    let text = description.trim();
    if text.is_empty() {
        return None;
    }
    if compact {
        Some(truncate_to_sentence(text))
    } else {
        Some(text.to_string())
    }
}

/// Append `description` as `///` lines at the given indentation.
pub fn push_doc(out: &mut String, indent: &str, description: &str, compact: bool) {
    let Some(text) = doc_text(description, compact) else {
        return;
    };
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(indent);
            out.push_str("///\n");
        } else {
            out.push_str(&format!("{indent}/// {line}\n"));
        }
    }
}

/// Truncate a string to the first sentence (ends with . ! or ?).
/// Falls back to a word boundary near 100 characters.
pub fn truncate_to_sentence(s: &str) -> String {
    let terminators = ['.', '!', '?'];

    for (i, c) in s.char_indices() {
        if !terminators.contains(&c) {
            continue;
        }
        let next_idx = i + c.len_utf8();
        if next_idx >= s.len() {
            return s.to_string();
        }
        if c == '.' && ends_with_abbreviation(&s[..i]) {
            continue;
        }
        if s[next_idx..].starts_with(char::is_whitespace) {
            return s[..next_idx].to_string();
        }
    }

    // No sentence boundary; cut at a word boundary, on a char boundary
    let Some((cut, _)) = s.char_indices().nth(MAX_UNBROKEN) else {
        return s.to_string();
    };
    let head = &s[..cut];
    match head.rfind(' ') {
        Some(pos) => format!("{}...", &head[..pos]),
        None => format!("{head}..."),
    }
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    ABBREVIATIONS.iter().any(|a| word.eq_ignore_ascii_case(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_sentence() {
        assert_eq!(
            truncate_to_sentence("First sentence. Second sentence."),
            "First sentence."
        );

        assert_eq!(truncate_to_sentence("Short text"), "Short text");

        let long = "This is a very long description that goes on and on without any sentence boundaries and just keeps going forever";
        let result = truncate_to_sentence(long);
        assert!(result.len() < long.len());
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_skips_abbreviations_and_inline_dots() {
        assert_eq!(
            truncate_to_sentence("Pass a file id (e.g. from a Message). Then wait."),
            "Pass a file id (e.g. from a Message)."
        );
        assert_eq!(
            truncate_to_sentence("Version 1.2 is current. Older ones are not."),
            "Version 1.2 is current."
        );
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let quoted = "“".repeat(120);
        let result = truncate_to_sentence(&quoted);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), MAX_UNBROKEN + 3);
    }

    #[test]
    fn test_doc_text() {
        assert_eq!(doc_text("   ", false), None);
        assert_eq!(
            doc_text("Sends a message. Returns it.", true).as_deref(),
            Some("Sends a message.")
        );
        assert_eq!(
            doc_text(" Sends a message. Returns it. ", false).as_deref(),
            Some("Sends a message. Returns it.")
        );
    }

    #[test]
    fn test_push_doc_writes_one_line_per_line() {
        let mut out = String::new();
        push_doc(&mut out, "    ", "First.\n\nSecond.", false);
        assert_eq!(out, "    /// First.\n    ///\n    /// Second.\n");

        let mut empty = String::new();
        push_doc(&mut empty, "", "", false);
        assert!(empty.is_empty());
    }
}
