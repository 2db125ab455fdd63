//! Lexer for the CIR text format.
//!
//! Each token shape is a small winnow combinator; [`Lexer`] drives them
//! lazily over the source and turns failures into [`LexError`]s without
//! stopping, so later problems in the same unit are still reported.

use derive_more::{Display, Error};
use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

use crate::location::Span;
use crate::token::{Punct, Token, TokenKind};

// ============================================================================
// Error type
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum LexErrorKind {
    #[display("unterminated string literal")]
    UnterminatedString,
    #[display("invalid character `{_0}`")]
    InvalidCharacter(char),
}

/// A malformed token. Never fatal: the lexer resumes after it.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
#[display("{} at offset {}", kind, span.start)]
pub struct LexError {
    #[error(not(source))]
    pub kind: LexErrorKind,
    pub span: Span,
}

// ============================================================================
// Token combinators
// ============================================================================

/// Skip whitespace and `//` line comments.
pub(crate) fn trivia(input: &mut &str) -> ModalResult<()> {
    loop {
        take_while(0.., |c: char| c.is_whitespace())
            .void()
            .parse_next(input)?;
        if input.starts_with("//") {
            take_till(0.., |c: char| c == '\n')
                .void()
                .parse_next(input)?;
        } else {
            return Ok(());
        }
    }
}

/// Bare word: [a-zA-Z_][a-zA-Z0-9_$.]*
pub(crate) fn bare_word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
        }),
    )
        .take()
        .parse_next(input)
}

/// Suffix of `%`, `^` and bare `@` names: [a-zA-Z0-9_$.-]+
fn suffix_id<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-')
    })
    .parse_next(input)
}

/// Suffix of `!` and `#` aliases: [a-zA-Z0-9_$.]+
fn alias_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
    })
    .parse_next(input)
}

/// Quoted string literal. Raw newlines terminate it unsuccessfully.
pub(crate) fn string_lit(input: &mut &str) -> ModalResult<()> {
    '"'.parse_next(input)?;
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(()),
            '\\' => {
                any.void().parse_next(input)?;
            }
            '\n' => return Err(ErrMode::Backtrack(ContextError::new())),
            _ => {}
        }
    }
}

/// Symbol reference: @name or @"quoted name"
fn symbol_ref(input: &mut &str) -> ModalResult<()> {
    preceded('@', alt((string_lit, suffix_id.void()))).parse_next(input)
}

/// Integer (decimal or hex) or float literal containing a dot.
fn number(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        ("0x", take_while(1.., |c: char| c.is_ascii_hexdigit())).value(TokenKind::Integer),
        (
            opt('-'),
            digit1,
            opt((
                '.',
                digit1,
                opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
            )),
        )
            .map(|(_, _, frac)| {
                if frac.is_some() {
                    TokenKind::Float
                } else {
                    TokenKind::Integer
                }
            }),
    ))
    .parse_next(input)
}

fn punct(input: &mut &str) -> ModalResult<Punct> {
    alt((
        "->".value(Punct::Arrow),
        "...".value(Punct::Ellipsis),
        '('.value(Punct::LParen),
        ')'.value(Punct::RParen),
        '{'.value(Punct::LBrace),
        '}'.value(Punct::RBrace),
        '['.value(Punct::LBracket),
        ']'.value(Punct::RBracket),
        '<'.value(Punct::Less),
        '>'.value(Punct::Greater),
        ':'.value(Punct::Colon),
        ','.value(Punct::Comma),
        '='.value(Punct::Equal),
        '*'.value(Punct::Star),
        '?'.value(Punct::Question),
    ))
    .parse_next(input)
}

fn token_kind(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        string_lit.value(TokenKind::String),
        number,
        punct.map(TokenKind::Punct),
        preceded('%', suffix_id).value(TokenKind::ValueId),
        preceded('^', suffix_id).value(TokenKind::CaretId),
        symbol_ref.value(TokenKind::SymbolId),
        preceded('!', alias_name).value(TokenKind::TypeId),
        preceded('#', alias_name).value(TokenKind::AttrId),
        bare_word.map(|word: &str| {
            if word.contains('.') {
                TokenKind::OpKeyword
            } else {
                TokenKind::Ident
            }
        }),
    ))
    .parse_next(input)
}

// ============================================================================
// Lexer driver
// ============================================================================

/// Lazy token stream over a source unit. Single forward pass.
pub struct Lexer<'src> {
    source: &'src str,
    rest: &'src str,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    /// Build the error for the token starting at `start` and skip past it
    /// to the next plausible token boundary.
    fn recover(&mut self, start: usize) -> LexError {
        if self.rest.starts_with('"') {
            let skip = self.rest.find('\n').unwrap_or(self.rest.len());
            self.rest = &self.rest[skip..];
            return LexError {
                kind: LexErrorKind::UnterminatedString,
                span: Span::new(start, start + skip),
            };
        }
        let c = self.rest.chars().next().unwrap_or('\0');
        self.rest = &self.rest[c.len_utf8()..];
        LexError {
            kind: LexErrorKind::InvalidCharacter(c),
            span: Span::new(start, start + c.len_utf8()),
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        // trivia never fails: both of its loops accept zero characters.
        let _ = trivia.parse_next(&mut self.rest);
        if self.rest.is_empty() {
            return None;
        }
        let start = self.offset();
        let before = self.rest;
        match token_kind.parse_next(&mut self.rest) {
            Ok(kind) => {
                let len = before.len() - self.rest.len();
                Some(Ok(Token::new(
                    kind,
                    &before[..len],
                    Span::new(start, start + len),
                )))
            }
            Err(_) => {
                self.rest = before;
                Some(Err(self.recover(start)))
            }
        }
    }
}

/// Output of [`tokenize`]: every well-formed token (terminated by an
/// [`TokenKind::Eof`] token) plus the errors encountered along the way.
#[derive(Debug)]
pub struct Lexed<'src> {
    pub tokens: Vec<Token<'src>>,
    pub errors: Vec<LexError>,
}

pub fn tokenize(source: &str) -> Lexed<'_> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => {
                tracing::trace!(offset = error.span.start, %error, "lex error");
                errors.push(error);
            }
        }
    }
    tokens.push(Token::eof(source.len()));
    Lexed { tokens, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_sigils_and_keywords() {
        let lexed = tokenize("%0 = cir.load %x : !cir.ptr<!s32i>, !s32i");
        let texts: Vec<&str> = lexed.tokens.iter().map(|t| t.text).collect();
        assert_eq!(
            texts,
            vec![
                "%0", "=", "cir.load", "%x", ":", "!cir.ptr", "<", "!s32i", ">", ",", "!s32i", ""
            ]
        );
        assert!(lexed.errors.is_empty());
        assert_eq!(lexed.tokens[2].kind, TokenKind::OpKeyword);
        assert_eq!(lexed.tokens[5].kind, TokenKind::TypeId);
    }

    #[test]
    fn test_dotted_libc_keyword_is_one_token() {
        assert_eq!(
            kinds("cir.libc.memcpy"),
            vec![TokenKind::OpKeyword, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 -7 3.25 1.5e-3 0xff"),
            vec![
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Integer,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_arrow_is_not_a_number() {
        assert_eq!(
            kinds("-> -1"),
            vec![
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Integer,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_quoted_symbol() {
        let lexed = tokenize(r#"@"std::vector<int>" @main"#);
        assert_eq!(lexed.tokens[0].kind, TokenKind::SymbolId);
        assert_eq!(lexed.tokens[0].name(), "std::vector<int>");
        assert_eq!(lexed.tokens[1].name(), "main");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// header\ncir.trap // trailing\n"),
            vec![TokenKind::OpKeyword, TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string_resumes_on_next_line() {
        let lexed = tokenize("cir.label \"oops\ncir.trap");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedString);
        assert_eq!(lexed.errors[0].span.start, 10);
        let texts: Vec<&str> = lexed.tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["cir.label", "cir.trap", ""]);
    }

    #[test]
    fn test_invalid_character_is_skipped_alone() {
        let lexed = tokenize("cir.trap ` cir.trap");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(
            lexed.errors[0].kind,
            LexErrorKind::InvalidCharacter('`')
        );
        assert_eq!(lexed.tokens.len(), 3);
    }

    #[test]
    fn test_lex_error_display() {
        let err = LexError {
            kind: LexErrorKind::InvalidCharacter('$'),
            span: Span::new(3, 4),
        };
        assert_eq!(err.to_string(), "invalid character `$` at offset 3");
    }
}
