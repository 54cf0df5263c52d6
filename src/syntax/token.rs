//! Token model shared by the lexer, the parser, and the resolver.

use smol_str::SmolStr;

use crate::base::{Position, TextRange, TextSize};

/// Classification of a token.
///
/// Whitespace, newlines, and comment delimiters are first-class kinds:
/// indentation decides whether a line is a method header or a body line,
/// and a block comment directly below a header becomes its documentation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Alphanumeric,
    Numeric,
    Space,
    Tab,
    NewLine,
    LineCommentInit,
    LineComment,
    BlockCommentInit,
    BlockComment,
    BlockCommentTerm,
    DoubleQuotes,
    String,
    ExclamationMark,
    NumberSign,
    DollarSign,
    PercentSign,
    Ampersand,
    SingleQuote,
    OpenParen,
    CloseParen,
    Asterisk,
    PlusSign,
    Comma,
    MinusSign,
    Period,
    Slash,
    Colon,
    LessThan,
    EqualSign,
    GreaterThan,
    QuestionMark,
    AtSign,
    OpenBracket,
    Backslash,
    CloseBracket,
    Caret,
    Underscore,
    BackQuote,
    OpenBrace,
    Pipe,
    CloseBrace,
    Tilde,
    Undefined,
}

impl TokenKind {
    /// Spaces and tabs (not newlines).
    pub fn is_whitespace(self) -> bool {
        matches!(self, TokenKind::Space | TokenKind::Tab)
    }

    /// Anything that belongs to a comment, delimiters included.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineCommentInit
                | TokenKind::LineComment
                | TokenKind::BlockCommentInit
                | TokenKind::BlockComment
                | TokenKind::BlockCommentTerm
        )
    }
}

/// A lexed (or synthesized) token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub value: SmolStr,
    /// Start of the token.
    pub position: Position,
    /// Byte range in the source text. Empty for dummy tokens.
    pub range: TextRange,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<SmolStr>, position: Position, range: TextRange) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
            range,
        }
    }

    /// A synthesized token with no source location, used for derived
    /// members (default parameter types, table columns, `catch` locals).
    pub fn dummy(value: impl Into<SmolStr>) -> Self {
        Self {
            kind: TokenKind::Alphanumeric,
            value: value.into(),
            position: Position::default(),
            range: TextRange::empty(TextSize::from(0)),
        }
    }

    /// Whether this token was synthesized rather than lexed.
    pub fn is_dummy(&self) -> bool {
        self.range.is_empty()
    }

    /// Identity check: same kind, value and source range.
    ///
    /// Two dummy tokens are never the same token.
    pub fn is_same_token(&self, other: &Token) -> bool {
        !self.is_dummy() && self == other
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_alphanumeric(&self) -> bool {
        self.kind == TokenKind::Alphanumeric
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind.is_whitespace()
    }

    pub fn is_newline(&self) -> bool {
        self.kind == TokenKind::NewLine
    }

    /// Alphanumeric token whose value equals `word`, case-insensitively.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.is_alphanumeric() && self.value.eq_ignore_ascii_case(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_tokens_are_never_identical() {
        let a = Token::dummy("String");
        let b = Token::dummy("String");
        assert!(a.is_dummy());
        assert!(!a.is_same_token(&b));
        assert!(!a.is_same_token(&a));
    }

    #[test]
    fn test_lexed_token_identity() {
        let range = TextRange::new(TextSize::from(5), TextSize::from(8));
        let a = Token::new(TokenKind::Alphanumeric, "Foo", Position::new(0, 5), range);
        let b = a.clone();
        let moved = Token::new(
            TokenKind::Alphanumeric,
            "Foo",
            Position::new(1, 0),
            TextRange::new(TextSize::from(9), TextSize::from(12)),
        );
        assert!(a.is_same_token(&b));
        assert!(!a.is_same_token(&moved));
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let tok = Token::dummy("PropertyDef");
        assert!(tok.is_keyword("PROPERTYDEF"));
        assert!(!tok.is_keyword("CLASSDEF"));
    }
}
