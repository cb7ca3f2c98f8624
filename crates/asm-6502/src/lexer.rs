//! Lexical layer: whitespace-separated tokens on line-oriented input.
//!
//! Token kinds: label definitions (identifier followed by `:`), mnemonics,
//! directives (leading `.`), operands (everything else: numeric literals,
//! symbol references, punctuation, string literals), comments (`;` to end
//! of line) and end-of-line markers.

use mos_6502::Mnemonic;

use crate::AsmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Label definition (the trailing `:` is consumed, not kept).
    Label,
    /// Instruction mnemonic.
    Mnemonic,
    /// Directive, including the leading `.`.
    Directive,
    /// Anything else: literals, symbol references, punctuation, strings.
    Operand,
    /// Comment text from `;` to end of line.
    Comment,
    /// End of a source line.
    Eol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

/// Split a source string into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, AsmError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < bytes.len() {
        let ch = bytes[pos];
        match ch {
            b' ' | b'\t' | b'\r' => pos += 1,
            b'\n' => {
                tokens.push(Token {
                    kind: TokenKind::Eol,
                    text: String::new(),
                    line,
                });
                line += 1;
                pos += 1;
            }
            b';' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: source[start..pos].to_string(),
                    line,
                });
            }
            b'"' => {
                let start = pos;
                pos += 1;
                while pos < bytes.len() && bytes[pos] != b'"' && bytes[pos] != b'\n' {
                    pos += 1;
                }
                if pos >= bytes.len() || bytes[pos] != b'"' {
                    return Err(AsmError::UnterminatedString { line });
                }
                pos += 1;
                tokens.push(Token {
                    kind: TokenKind::Operand,
                    text: source[start..pos].to_string(),
                    line,
                });
            }
            b'$' | b'%' => {
                let start = pos;
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Operand,
                    text: source[start..pos].to_string(),
                    line,
                });
            }
            _ if ch.is_ascii_digit() => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Operand,
                    text: source[start..pos].to_string(),
                    line,
                });
            }
            _ if is_identifier_start(ch) => {
                let start = pos;
                pos += 1;
                while pos < bytes.len() && is_identifier_char(bytes[pos]) {
                    pos += 1;
                }
                let text = &source[start..pos];

                // A trailing colon makes this a label definition.
                if pos < bytes.len() && bytes[pos] == b':' {
                    pos += 1;
                    tokens.push(Token {
                        kind: TokenKind::Label,
                        text: text.to_string(),
                        line,
                    });
                } else if text.starts_with('.') {
                    tokens.push(Token {
                        kind: TokenKind::Directive,
                        text: text.to_ascii_lowercase(),
                        line,
                    });
                } else if Mnemonic::parse(text).is_some() {
                    tokens.push(Token {
                        kind: TokenKind::Mnemonic,
                        text: text.to_string(),
                        line,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Operand,
                        text: text.to_string(),
                        line,
                    });
                }
            }
            _ => {
                // Single-character operand token: punctuation like ( ) , #
                tokens.push(Token {
                    kind: TokenKind::Operand,
                    text: (ch as char).to_string(),
                    line,
                });
                pos += 1;
            }
        }
    }

    Ok(tokens)
}

fn is_identifier_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'.'
}

fn is_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
