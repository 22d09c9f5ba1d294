use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

// CSI sequences (colors, cursor movement), OSC sequences (titles, hyperlinks)
// terminated by BEL or ST, and the remaining two-byte escapes.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .unwrap_or_else(|e| unreachable!("static escape pattern failed to compile: {e}"))
});

/// Removes terminal escape sequences so readiness patterns see plain text.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    ANSI_ESCAPE.replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(strip_ansi("listening on 4001"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strips_colors() {
        let colored = "\x1b[32m✓\x1b[0m \x1b[1mready\x1b[22m in \x1b[33m312\x1b[39m ms";
        assert_eq!(strip_ansi(colored), "✓ ready in 312 ms");
    }

    #[test]
    fn test_strips_cursor_and_erase() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gcompiled"), "compiled");
        assert_eq!(strip_ansi("\x1b[?25lspinner\x1b[?25h"), "spinner");
    }

    #[test]
    fn test_strips_osc_hyperlinks() {
        let link = "\x1b]8;;http://localhost:3000\x07http://localhost:3000\x1b]8;;\x07";
        assert_eq!(strip_ansi(link), "http://localhost:3000");

        let titled = "\x1b]0;vite\x1b\\Local: http://localhost:5173/";
        assert_eq!(strip_ansi(titled), "Local: http://localhost:5173/");
    }

    #[test]
    fn test_strips_two_byte_escapes() {
        assert_eq!(strip_ansi("\x1bMline"), "line");
    }
}
