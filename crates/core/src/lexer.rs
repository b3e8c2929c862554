use crate::error::{FormulaError, FormulaErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Field name or function name, distinguished in the parser
    Ident(String),
    /// Numeric literal, kept as text to preserve its exact representation
    Number(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// 1-based character column of the token's first character.
    pub column: usize,
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, FormulaError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let column = pos + 1;

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Identifier
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Ident(chars[start..pos].iter().collect()),
                column,
            });
            continue;
        }

        // Number: digits with an optional fractional part. No exponent.
        if c.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == '.' {
                if pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit() {
                    pos += 1; // consume '.'
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                } else {
                    return Err(FormulaError::new(
                        FormulaErrorKind::UnexpectedChar,
                        pos + 1,
                        "expected digit after decimal point",
                    ));
                }
            }
            if pos < chars.len() && (chars[pos].is_ascii_alphabetic() || chars[pos] == '_') {
                return Err(FormulaError::new(
                    FormulaErrorKind::UnexpectedChar,
                    pos + 1,
                    format!("unexpected character '{}' after number", chars[pos]),
                ));
            }
            tokens.push(Spanned {
                token: Token::Number(chars[start..pos].iter().collect()),
                column,
            });
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            _ => {
                return Err(FormulaError::new(
                    FormulaErrorKind::UnexpectedChar,
                    column,
                    format!("unexpected character '{}'", c),
                ));
            }
        };
        tokens.push(Spanned { token, column });
        pos += 1;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        column: chars.len() + 1,
    });
    Ok(tokens)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
