//! Token definitions produced by the [`crate::lexer`].

use std::fmt;

use crate::location::Span;

/// Punctuation recognized by the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Less,
    Greater,
    Colon,
    Comma,
    Equal,
    Arrow,
    Ellipsis,
    Star,
    Question,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Less => "<",
            Punct::Greater => ">",
            Punct::Colon => ":",
            Punct::Comma => ",",
            Punct::Equal => "=",
            Punct::Arrow => "->",
            Punct::Ellipsis => "...",
            Punct::Star => "*",
            Punct::Question => "?",
        }
    }
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Dotted operation keyword such as `cir.func` or `cir.libc.memcpy`.
    OpKeyword,
    /// Bare identifier; contextual keywords (`to`, `else`, ...) are identifiers too.
    Ident,
    /// `%name`
    ValueId,
    /// `^name`
    CaretId,
    /// `@name` or `@"quoted"`
    SymbolId,
    /// `!name`
    TypeId,
    /// `#name`
    AttrId,
    Integer,
    Float,
    String,
    Punct(Punct),
    Eof,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::OpKeyword => "operation keyword",
            TokenKind::Ident => "identifier",
            TokenKind::ValueId => "value reference",
            TokenKind::CaretId => "block label",
            TokenKind::SymbolId => "symbol reference",
            TokenKind::TypeId => "type alias",
            TokenKind::AttrId => "attribute",
            TokenKind::Integer => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::String => "string literal",
            TokenKind::Punct(p) => p.as_str(),
            TokenKind::Eof => "end of input",
        }
    }
}

/// A lexed token. `text` is the exact source slice, sigil included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, text: &'src str, span: Span) -> Self {
        Self { kind, text, span }
    }

    pub fn eof(offset: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            text: "",
            span: Span::empty_at(offset),
        }
    }

    pub fn is_punct(&self, p: Punct) -> bool {
        self.kind == TokenKind::Punct(p)
    }

    /// Whether this is the bare identifier `word`.
    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// Name without its sigil (`%x` -> `x`, `@"a b"` -> `a b`).
    pub fn name(&self) -> String {
        match self.kind {
            TokenKind::ValueId | TokenKind::CaretId | TokenKind::TypeId | TokenKind::AttrId => {
                self.text[1..].to_owned()
            }
            TokenKind::SymbolId => {
                let rest = &self.text[1..];
                if rest.starts_with('"') {
                    unescape_string(rest)
                } else {
                    rest.to_owned()
                }
            }
            TokenKind::String => unescape_string(self.text),
            _ => self.text.to_owned(),
        }
    }

    /// Human-readable rendering for "found ..." messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_owned(),
            _ => format!("`{}`", self.text),
        }
    }
}

/// Decode the body of a quoted string literal (quotes included in `quoted`).
pub(crate) fn unescape_string(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(code) => out.push(code as char),
                    Err(_) => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_strips_sigil() {
        let tok = Token::new(TokenKind::ValueId, "%arg0", Span::new(0, 5));
        assert_eq!(tok.name(), "arg0");
        let tok = Token::new(TokenKind::SymbolId, "@\"a\\nb\"", Span::new(0, 7));
        assert_eq!(tok.name(), "a\nb");
    }

    #[test]
    fn test_unescape_hex() {
        assert_eq!(unescape_string(r#""x\x41y""#), "xAy");
        assert_eq!(unescape_string(r#""bad\xZZ""#), "bad\\xZZ");
    }
}
