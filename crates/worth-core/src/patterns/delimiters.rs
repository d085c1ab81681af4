//! Separator tokens and their regex / character forms.

use crate::error::ConfigError;

/// Sub-pattern for a thousands separator token.
pub fn build_thousands_string(token: &str) -> Result<&'static str, ConfigError> {
    match token {
        "commas" => Ok(","),
        "spacesAndDots" => Ok(r"[ \u{00a0}\u{202f}.]"),
        other => Err(ConfigError::UnrecognizedDelimiter(other.to_string())),
    }
}

/// Sub-pattern for a decimal separator token.
pub fn build_decimal_string(token: &str) -> Result<&'static str, ConfigError> {
    match token {
        "dot" => Ok(r"\."),
        "comma" => Ok(","),
        other => Err(ConfigError::UnrecognizedDelimiter(other.to_string())),
    }
}

const COMMA_CHARS: &[char] = &[','];
const SPACE_AND_DOT_CHARS: &[char] = &[' ', '\u{00a0}', '\u{202f}', '.'];

/// Characters a thousands token stands for.
pub fn separator_chars(token: &str) -> Result<&'static [char], ConfigError> {
    match token {
        "commas" => Ok(COMMA_CHARS),
        "spacesAndDots" => Ok(SPACE_AND_DOT_CHARS),
        other => Err(ConfigError::UnrecognizedDelimiter(other.to_string())),
    }
}

/// Character used when rendering a thousands token.
pub fn thousands_glyph(token: &str) -> Result<char, ConfigError> {
    match token {
        "commas" => Ok(','),
        "spacesAndDots" => Ok('.'),
        other => Err(ConfigError::UnrecognizedDelimiter(other.to_string())),
    }
}

/// Character used when rendering a decimal token.
pub fn decimal_glyph(token: &str) -> Result<char, ConfigError> {
    match token {
        "dot" => Ok('.'),
        "comma" => Ok(','),
        other => Err(ConfigError::UnrecognizedDelimiter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens() {
        assert_eq!(build_thousands_string("commas").unwrap(), ",");
        assert_eq!(build_decimal_string("dot").unwrap(), r"\.");
        assert_eq!(build_decimal_string("comma").unwrap(), ",");
        assert!(separator_chars("spacesAndDots").unwrap().contains(&'\u{00a0}'));
    }

    #[test]
    fn test_unknown_tokens_fail() {
        for token in ["", "comas", "dots", "Commas", "apostrophe"] {
            assert_eq!(
                build_thousands_string(token),
                Err(ConfigError::UnrecognizedDelimiter(token.to_string()))
            );
        }
        assert!(build_decimal_string("commas").is_err());
        assert!(build_thousands_string("dot").is_err());
        assert!(thousands_glyph("x").is_err());
        assert!(decimal_glyph("x").is_err());
    }
}
