//! Splits a command line into tokens, honoring double quotes.

use crate::types::ParseError;

/// One whitespace-delimited word of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Unescaped text with quotes removed.
    pub text: String,
    /// Character offset of the token's first character in the input.
    pub column: usize,
    /// Byte offset into `text` where the first quoted segment starts.
    pub quote_start: Option<usize>,
}

impl Token {
    /// Whether any part of the token was quoted.
    pub fn is_quoted(&self) -> bool {
        self.quote_start.is_some()
    }

    /// Split `key=value` when the `=` sits in the unquoted prefix.
    pub fn key_value(&self) -> Option<(&str, &str)> {
        let eq = self.text.find('=')?;
        if eq == 0 || self.quote_start.is_some_and(|q| q <= eq) {
            return None;
        }
        Some((&self.text[..eq], &self.text[eq + 1..]))
    }

    /// The flag name for an unquoted `--flag` token.
    pub fn flag(&self) -> Option<&str> {
        if self.is_quoted() {
            return None;
        }
        self.text.strip_prefix("--").filter(|name| !name.is_empty())
    }
}

/// Tokenize `input`.
///
/// Inside double quotes, `\"`, `\\` and `\n` are unescaped; any other
/// backslash is kept literally. An unterminated quote is an error pointing at
/// the opening quote.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().enumerate().peekable();

    while let Some(&(column, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut text = String::new();
        let mut quote_start = None;

        while let Some(&(pos, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c != '"' {
                text.push(c);
                continue;
            }

            quote_start.get_or_insert(text.len());
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.peek().map(|&(_, n)| n) {
                        Some('"') | Some('\\') => {
                            if let Some((_, n)) = chars.next() {
                                text.push(n);
                            }
                        }
                        Some('n') => {
                            chars.next();
                            text.push('\n');
                        }
                        _ => text.push('\\'),
                    },
                    _ => text.push(c),
                }
            }
            if !closed {
                return Err(ParseError::new("unterminated quote", input, pos));
            }
        }

        tokens.push(Token {
            text,
            column,
            quote_start,
        });
    }

    Ok(tokens)
}
