//! Shape checks on argument text before it is treated as a framework literal.

/// A quoted literal of at least one character that holds no variable,
/// nested quote or markup (`'main'`, `"@views/index"`).
pub fn check_option(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < 3 || !(text.starts_with('\'') || text.starts_with('"')) {
        return false;
    }
    let mut inner = text[1..].chars();
    inner.next_back();
    !inner.as_str().contains(['$', '\'', '"', '<', '>'])
}

/// `check_option`, a number, or `null`/`true`/`false`.
pub fn check_value(text: &str) -> bool {
    if check_option(text) {
        return true;
    }
    let text = text.trim();
    if is_number(text) {
        return true;
    }
    matches!(
        text.to_ascii_lowercase().as_str(),
        "null" | "true" | "false"
    )
}

/// Signed decimal with optional fraction and exponent (`-1`, `.5`, `2e3`),
/// or the `NaN` / `Infinity` spellings.
fn is_number(text: &str) -> bool {
    let text = text.strip_prefix(['+', '-']).unwrap_or(text);
    if matches!(text, "NaN" | "Infinity") {
        return true;
    }
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(i) => (&text[..i], Some(&text[i + 1..])),
        None => (text, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !digits(int) || !digits(frac) {
        return false;
    }
    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && digits(exp)
        }
    }
}

/// Text that is still meaningful once quotes are stripped from both ends.
pub fn check_string(text: &str) -> bool {
    let inner = strip_quotes(text);
    !inner.is_empty() && !inner.contains(['"', '\'', '$', '<', '>', '{', '}'])
}

/// Remove surrounding single or double quotes (both ends, any count).
pub fn strip_quotes(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '\'' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_option() {
        assert!(check_option("'main'"));
        assert!(check_option("\"@views/index\""));
        assert!(check_option("  'a'  "));
        assert!(!check_option("''"));
        assert!(!check_option("'$name'"));
        assert!(!check_option("\"<b>\""));
        assert!(!check_option("main"));
        assert!(!check_option("'it's'"));
    }

    #[test]
    fn test_check_value() {
        assert!(check_value("'debug'"));
        assert!(check_value("42"));
        assert!(check_value("3.5"));
        assert!(check_value("NULL"));
        assert!(check_value("True"));
        assert!(!check_value("$x"));
        assert!(!check_value("CONSTANT"));
    }

    #[test]
    fn test_check_value_numbers() {
        assert!(check_value("-7"));
        assert!(check_value(".5"));
        assert!(check_value("5."));
        assert!(check_value("1e5"));
        assert!(check_value("2.5E-3"));
        assert!(check_value("NaN"));
        assert!(!check_value("inf"));
        assert!(!check_value("nan"));
        assert!(!check_value("infinity"));
        assert!(!check_value("."));
        assert!(!check_value("1e"));
        assert!(!check_value("1.2.3"));
        assert!(!check_value("0x1A"));
    }

    #[test]
    fn test_check_string() {
        assert!(check_string("'users'"));
        assert!(check_string("users"));
        assert!(!check_string("''"));
        assert!(!check_string("'{id}'"));
        assert!(!check_string("'a$b'"));
    }
}
