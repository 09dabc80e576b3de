//! Keeps chat content on one log line.
//! Messages arrive from users verbatim and may carry newlines, tabs or other control characters.

pub const MAX_PREVIEW: usize = 300;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings (over [MAX_PREVIEW] characters) with an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, MAX_PREVIEW)
}

/// [escape_log] with an explicit preview length.
pub fn escape_log_with(s: &str, max_preview: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_preview) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_preview {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_log, escape_log_with};
    #[test]
    fn escapes_newlines_and_truncates() {
        let s = "kcf 100\nheads\r\tnow";
        assert_eq!(escape_log(s), "kcf 100\\nheads\\r\\tnow");
        assert_eq!(escape_log_with("kslots 500", 6), "kslots…");
    }

    #[test]
    fn other_controls_become_hex() {
        assert_eq!(escape_log("a\u{7}b"), "a\\x07b");
    }
}
