//! Chat color codes.
//!
//! Broadcast templates are written with `&` as an alternate color character
//! (`&aHello`) and translated to the section-sign form (`§aHello`) the game
//! client understands.

/// The color-code prefix understood by game clients.
pub const COLOR_CHAR: char = '§';

const COLOR_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRrXx";

pub const RED: &str = "§c";
pub const GREEN: &str = "§a";
pub const YELLOW: &str = "§e";

/// Replace `alt` followed by a valid code with `§` and the lowercased code.
///
/// An `alt` character that is not followed by a valid code is left as-is.
pub fn translate_alternate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                if COLOR_CODES.contains(next) {
                    chars.next();
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

/// Remove every `§x` color sequence, for plain-text sinks like the log.
pub fn strip_color(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == COLOR_CHAR {
            if let Some(&next) = chars.peek() {
                if COLOR_CODES.contains(next) {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_default_template() {
        let translated =
            translate_alternate_color_codes('&', "&7[&aSaveManager&7] &fBackup complete!");
        assert_eq!(translated, "§7[§aSaveManager§7] §fBackup complete!");
    }

    #[test]
    fn test_translate_lowercases_codes() {
        assert_eq!(translate_alternate_color_codes('&', "&Ahi&L"), "§ahi§l");
    }

    #[test]
    fn test_translate_leaves_invalid_codes() {
        assert_eq!(translate_alternate_color_codes('&', "Tom & Jerry&"), "Tom & Jerry&");
        assert_eq!(translate_alternate_color_codes('&', "R&D"), "R§d");
        assert_eq!(translate_alternate_color_codes('&', "&z"), "&z");
    }

    #[test]
    fn test_strip_color() {
        assert_eq!(strip_color("§7[§aSaveManager§7] §fSaving"), "[SaveManager] Saving");
        assert_eq!(strip_color("no codes"), "no codes");
        assert_eq!(strip_color("trailing §"), "trailing §");
    }
}
