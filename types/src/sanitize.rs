//! Display sanitization for remotely generated text.
//!
//! Element names, glyphs and oracle error descriptors are produced by a remote
//! service and end up printed to a terminal or drawn on a surface. Terminal
//! emulators interpret escape sequences that can rewrite the screen, set the
//! window title or touch the clipboard, so everything coming from the oracle
//! passes through [`sanitize_display_text`] before display.

use std::borrow::Cow;
use std::iter::Peekable;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Sanitize text for single-line display.
///
/// Strips ANSI escape sequences (CSI, OSC, DCS/PM/APC and two-byte forms),
/// C0 and C1 control characters and DEL. Line breaks and tabs collapse to a
/// single space and the result is trimmed.
///
/// ```
/// use alchemist_types::sanitize_display_text;
///
/// assert_eq!(sanitize_display_text("Steam"), "Steam");
/// assert_eq!(sanitize_display_text("St\x1b[31meam\n"), "Steam");
/// ```
#[must_use]
pub fn sanitize_display_text(input: &str) -> Cow<'_, str> {
    if !needs_sanitization(input) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            skip_escape_sequence(&mut chars);
        } else if matches!(c, '\n' | '\r' | '\t') {
            if !result.is_empty() && !result.ends_with(' ') {
                result.push(' ');
            }
        } else if c == '\u{009b}' {
            skip_csi_params(&mut chars);
        } else if !is_control(c) {
            result.push(c);
        }
    }

    let trimmed = result.trim();
    if trimmed.len() == result.len() {
        Cow::Owned(result)
    } else {
        Cow::Owned(trimmed.to_string())
    }
}

fn needs_sanitization(input: &str) -> bool {
    input.trim().len() != input.len() || input.chars().any(|c| c == ESC || is_control(c))
}

fn is_control(c: char) -> bool {
    c <= '\x1f' || c == '\x7f' || ('\u{0080}'..='\u{009f}').contains(&c)
}

fn skip_escape_sequence<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    let Some(&next) = chars.peek() else {
        return;
    };

    match next {
        '[' => {
            chars.next();
            skip_csi_params(chars);
        }
        ']' => {
            chars.next();
            skip_osc_sequence(chars);
        }
        'P' | '^' | '_' => {
            chars.next();
            skip_until_st(chars);
        }
        '(' | ')' | '*' | '+' | '#' | ' ' => {
            chars.next();
            chars.next();
        }
        '7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<' => {
            chars.next();
        }
        _ => {}
    }
}

/// Parameter and intermediate bytes run until a final byte in `0x40..=0x7E`.
fn skip_csi_params<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(&c) = chars.peek() {
        if ('\x40'..='\x7e').contains(&c) {
            chars.next();
            return;
        } else if ('\x20'..='\x3f').contains(&c) {
            chars.next();
        } else {
            return;
        }
    }
}

fn skip_osc_sequence<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(c) = chars.next() {
        if c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}

fn skip_until_st<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(c) = chars.next() {
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_is_borrowed() {
        match sanitize_display_text("Volcano") {
            Cow::Borrowed(s) => assert_eq!(s, "Volcano"),
            Cow::Owned(_) => panic!("clean input should not allocate"),
        }
    }

    #[test]
    fn preserves_unicode_names() {
        assert_eq!(sanitize_display_text("Вода 💧"), "Вода 💧");
    }

    #[test]
    fn strips_csi_and_osc_sequences() {
        assert_eq!(sanitize_display_text("\x1b[31mLava\x1b[0m"), "Lava");
        assert_eq!(sanitize_display_text("Mud\x1b]52;c;SGVsbG8=\x07"), "Mud");
        assert_eq!(
            sanitize_display_text("\x1b]8;;http://evil.example\x1b\\Link\x1b]8;;\x1b\\"),
            "Link"
        );
    }

    #[test]
    fn collapses_line_breaks_to_spaces() {
        assert_eq!(sanitize_display_text("Hot\n\nSpring"), "Hot Spring");
        assert_eq!(sanitize_display_text("  Cloud\t"), "Cloud");
    }

    #[test]
    fn strips_c0_c1_and_del() {
        assert_eq!(sanitize_display_text("A\x00B\u{0085}C\x7fD"), "ABCD");
        assert_eq!(sanitize_display_text("Fog\u{009b}31mgy"), "Foggy");
    }

    #[test]
    fn handles_truncated_sequences() {
        assert_eq!(sanitize_display_text("Dust\x1b"), "Dust");
        assert_eq!(sanitize_display_text("Dust\x1b[31"), "Dust");
        assert_eq!(sanitize_display_text("Dust\x1b]0;title"), "Dust");
    }
}
