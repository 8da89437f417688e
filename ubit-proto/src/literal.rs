//! Restricted parser for the list literals the board prints.
//!
//! Introspection runs `print(dir(...))` remotely and reads back text such
//! as `['__name__', 'print', 'x']`. Only a list of string literals is
//! accepted:
//!
//! ```text
//! list   := ws '[' ws ( string ws ( ',' ws string ws )* ( ',' ws )? )? ']' ws
//! string := '\'' chars '\'' | '"' chars '"'
//! ```
//!
//! Escapes `\\ \' \" \n \r \t \xHH \uHHHH` are decoded; any other escape
//! is kept verbatim, as Python does. Nothing is ever evaluated.

use std::iter::Peekable;
use std::str::CharIndices;

/// Errors from [`parse_str_list`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LiteralError {
    /// Input ended inside the literal.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// A character that the grammar does not allow at this point.
    #[error("unexpected {found:?} at byte {at}, expected {expected}")]
    Unexpected {
        /// The offending character.
        found: char,
        /// Byte offset into the input.
        at: usize,
        /// What the parser was looking for.
        expected: &'static str,
    },

    /// A `\x` or `\u` escape with bad hex digits.
    #[error("invalid escape at byte {at}")]
    BadEscape {
        /// Byte offset of the backslash.
        at: usize,
    },

    /// Non-whitespace text after the closing bracket.
    #[error("trailing input at byte {at}")]
    Trailing {
        /// Byte offset of the first trailing character.
        at: usize,
    },
}

/// Parses `text` as a list of string literals.
pub fn parse_str_list(text: &str) -> Result<Vec<String>, LiteralError> {
    let mut p = Parser {
        chars: text.char_indices().peekable(),
    };
    p.skip_ws();
    p.expect('[', "'['")?;
    let mut items = Vec::new();
    loop {
        p.skip_ws();
        match p.peek() {
            Some((_, ']')) => {
                p.bump();
                break;
            }
            Some((_, '\'' | '"')) => {}
            Some((at, found)) => {
                return Err(LiteralError::Unexpected {
                    found,
                    at,
                    expected: "string or ']'",
                });
            }
            None => return Err(LiteralError::UnexpectedEnd),
        }
        items.push(p.string()?);
        p.skip_ws();
        match p.advance() {
            Some((_, ',')) => {}
            Some((_, ']')) => break,
            Some((at, found)) => {
                return Err(LiteralError::Unexpected {
                    found,
                    at,
                    expected: "',' or ']'",
                });
            }
            None => return Err(LiteralError::UnexpectedEnd),
        }
    }
    p.skip_ws();
    if let Some((at, _)) = p.peek() {
        return Err(LiteralError::Trailing { at });
    }
    Ok(items)
}

/// Cursor over the input.
struct Parser<'a> {
    /// Remaining characters with their byte offsets.
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn bump(&mut self) {
        self.chars.next();
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<(), LiteralError> {
        match self.advance() {
            Some((_, c)) if c == want => Ok(()),
            Some((at, found)) => Err(LiteralError::Unexpected {
                found,
                at,
                expected,
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// Parses one quoted string; the cursor sits on the opening quote.
    fn string(&mut self) -> Result<String, LiteralError> {
        let Some((_, quote)) = self.advance() else {
            return Err(LiteralError::UnexpectedEnd);
        };
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(LiteralError::UnexpectedEnd),
                Some((_, c)) if c == quote => return Ok(out),
                Some((at, '\n')) => {
                    return Err(LiteralError::Unexpected {
                        found: '\n',
                        at,
                        expected: "closing quote",
                    });
                }
                Some((at, '\\')) => self.escape(at, &mut out)?,
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn escape(&mut self, at: usize, out: &mut String) -> Result<(), LiteralError> {
        let Some((_, c)) = self.advance() else {
            return Err(LiteralError::UnexpectedEnd);
        };
        match c {
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' => out.push(self.hex(at, 2)?),
            'u' => out.push(self.hex(at, 4)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex(&mut self, at: usize, digits: usize) -> Result<char, LiteralError> {
        let mut value = 0u32;
        for _ in 0..digits {
            let d = self
                .advance()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or(LiteralError::BadEscape { at })?;
            value = value * 16 + d;
        }
        char::from_u32(value).ok_or(LiteralError::BadEscape { at })
    }
}
