//! Pretty-printing for server replies.
//!
//! Converts raw reply lines into colorized, human-readable output in
//! the style familiar to redis-cli users.

use colored::Colorize;

/// Formats one reply line for terminal display.
pub fn format_reply(raw: &str) -> String {
    let raw = sanitize(raw);
    match raw.as_bytes().first() {
        Some(b'+') => raw[1..].green().to_string(),
        Some(b'-') => format!("(error) {}", &raw[1..]).red().to_string(),
        Some(b':') => format!("(integer) {}", &raw[1..]).yellow().to_string(),
        Some(b'$') if &raw[1..] == "nil" => "(nil)".dimmed().to_string(),
        Some(b'$') => format!("\"{}\"", &raw[1..]).green().to_string(),
        _ => raw,
    }
}

/// Strips ANSI escape sequences and control characters from
/// server-supplied text so a stored value cannot manipulate the
/// terminal.
fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if let Some('[') = chars.next() {
                // CSI sequence: consume until a letter
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else if ch == '\t' || !ch.is_control() {
            out.push(ch);
        }
    }
    out
}
