//! PSL lexer.
//!
//! Raw lexemes are recognized with logos; comments and string literals are
//! then split into delimiter and body tokens so the parser sees the same
//! shape whether or not they are terminated. Every byte of the input ends up
//! in exactly one token: unrecognized input becomes [`TokenKind::Undefined`].

use logos::Logos;

use super::token::{Token, TokenKind};
use crate::base::{LineIndex, TextRange, TextSize};

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum RawToken {
    #[regex(r"%?[A-Za-z][A-Za-z0-9]*")]
    Alphanumeric,
    #[regex(r"[0-9]+")]
    Numeric,
    #[token(" ")]
    Space,
    #[token("\t")]
    Tab,
    #[token("\n")]
    #[token("\r\n")]
    NewLine,

    #[token("//", line_comment)]
    #[token(";", line_comment)]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,
    #[token("\"", string_literal)]
    StringLiteral,

    #[token("!")]
    ExclamationMark,
    #[token("#")]
    NumberSign,
    #[token("$")]
    DollarSign,
    #[token("%")]
    PercentSign,
    #[token("&")]
    Ampersand,
    #[token("'")]
    SingleQuote,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("*")]
    Asterisk,
    #[token("+")]
    PlusSign,
    #[token(",")]
    Comma,
    #[token("-")]
    MinusSign,
    #[token(".")]
    Period,
    #[token("/")]
    Slash,
    #[token(":")]
    Colon,
    #[token("<")]
    LessThan,
    #[token("=")]
    EqualSign,
    #[token(">")]
    GreaterThan,
    #[token("?")]
    QuestionMark,
    #[token("@")]
    AtSign,
    #[token("[")]
    OpenBracket,
    #[token("\\")]
    Backslash,
    #[token("]")]
    CloseBracket,
    #[token("^")]
    Caret,
    #[token("_")]
    Underscore,
    #[token("`")]
    BackQuote,
    #[token("{")]
    OpenBrace,
    #[token("|")]
    Pipe,
    #[token("}")]
    CloseBrace,
    #[token("~")]
    Tilde,
}

/// Extend a line comment up to (not including) the end of the line.
fn line_comment(lex: &mut logos::Lexer<RawToken>) {
    let rest = lex.remainder();
    let end = rest.find(|c| c == '\r' || c == '\n').unwrap_or(rest.len());
    lex.bump(end);
}

/// Extend a block comment through its terminator, or to end of input.
fn block_comment(lex: &mut logos::Lexer<RawToken>) {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(rest.len()),
    }
}

/// Extend a string literal through its closing quote. `""` is an escaped
/// quote; an unterminated literal stops at the end of the line.
fn string_literal(lex: &mut logos::Lexer<RawToken>) {
    let bytes = lex.remainder().as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' if bytes.get(i + 1) == Some(&b'"') => i += 2,
            b'"' => {
                lex.bump(i + 1);
                return;
            }
            b'\r' | b'\n' => break,
            _ => i += 1,
        }
    }
    lex.bump(i);
}

impl RawToken {
    fn simple_kind(self) -> TokenKind {
        match self {
            RawToken::Alphanumeric => TokenKind::Alphanumeric,
            RawToken::Numeric => TokenKind::Numeric,
            RawToken::Space => TokenKind::Space,
            RawToken::Tab => TokenKind::Tab,
            RawToken::NewLine => TokenKind::NewLine,
            RawToken::ExclamationMark => TokenKind::ExclamationMark,
            RawToken::NumberSign => TokenKind::NumberSign,
            RawToken::DollarSign => TokenKind::DollarSign,
            RawToken::PercentSign => TokenKind::PercentSign,
            RawToken::Ampersand => TokenKind::Ampersand,
            RawToken::SingleQuote => TokenKind::SingleQuote,
            RawToken::OpenParen => TokenKind::OpenParen,
            RawToken::CloseParen => TokenKind::CloseParen,
            RawToken::Asterisk => TokenKind::Asterisk,
            RawToken::PlusSign => TokenKind::PlusSign,
            RawToken::Comma => TokenKind::Comma,
            RawToken::MinusSign => TokenKind::MinusSign,
            RawToken::Period => TokenKind::Period,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Colon => TokenKind::Colon,
            RawToken::LessThan => TokenKind::LessThan,
            RawToken::EqualSign => TokenKind::EqualSign,
            RawToken::GreaterThan => TokenKind::GreaterThan,
            RawToken::QuestionMark => TokenKind::QuestionMark,
            RawToken::AtSign => TokenKind::AtSign,
            RawToken::OpenBracket => TokenKind::OpenBracket,
            RawToken::Backslash => TokenKind::Backslash,
            RawToken::CloseBracket => TokenKind::CloseBracket,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Underscore => TokenKind::Underscore,
            RawToken::BackQuote => TokenKind::BackQuote,
            RawToken::OpenBrace => TokenKind::OpenBrace,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::CloseBrace => TokenKind::CloseBrace,
            RawToken::Tilde => TokenKind::Tilde,
            // Split into several tokens by `TokenSink::push_delimited`.
            RawToken::LineComment | RawToken::BlockComment | RawToken::StringLiteral => {
                TokenKind::Undefined
            }
        }
    }
}

/// Accumulates tokens, computing positions from byte offsets.
struct TokenSink<'a> {
    text: &'a str,
    index: LineIndex,
    tokens: Vec<Token>,
}

impl<'a> TokenSink<'a> {
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let range = TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32));
        let position = self.index.position(range.start());
        self.tokens
            .push(Token::new(kind, &self.text[start..end], position, range));
    }

    /// Push `open`, the body, and `close` when the lexeme ends with it.
    fn push_delimited(
        &mut self,
        start: usize,
        end: usize,
        open: (TokenKind, usize),
        body: TokenKind,
        close: Option<(TokenKind, &str)>,
    ) {
        let (open_kind, open_len) = open;
        let lexeme = &self.text[start..end];
        let close_len = match close {
            Some((_, terminator)) if lexeme.len() >= open_len + terminator.len() && lexeme.ends_with(terminator) => {
                terminator.len()
            }
            _ => 0,
        };
        self.push(open_kind, start, start + open_len);
        self.push(body, start + open_len, end - close_len);
        if let Some((close_kind, _)) = close {
            self.push(close_kind, end - close_len, end);
        }
    }
}

/// First char boundary at or after `offset`.
fn char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}

/// Tokenize a full PSL document.
///
/// Never fails; the returned tokens cover every byte of `text` in order.
#[tracing::instrument(skip_all, fields(source_len = text.len()))]
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut sink = TokenSink {
        text,
        index: LineIndex::new(text),
        tokens: Vec::new(),
    };

    // Error spans are widened to char boundaries; whatever logos yields
    // inside an already covered span is skipped or folded into the error.
    let mut covered = 0;
    let mut lexer = RawToken::lexer(text);
    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        if span.end <= covered {
            continue;
        }
        if span.start < covered {
            let end = char_boundary(text, span.end);
            sink.push(TokenKind::Undefined, covered, end);
            covered = end;
            continue;
        }
        covered = span.end;
        match raw {
            Ok(RawToken::LineComment) => {
                let open_len = if text[span.start..].starts_with("//") { 2 } else { 1 };
                sink.push_delimited(
                    span.start,
                    span.end,
                    (TokenKind::LineCommentInit, open_len),
                    TokenKind::LineComment,
                    None,
                );
            }
            Ok(RawToken::BlockComment) => sink.push_delimited(
                span.start,
                span.end,
                (TokenKind::BlockCommentInit, 2),
                TokenKind::BlockComment,
                Some((TokenKind::BlockCommentTerm, "*/")),
            ),
            Ok(RawToken::StringLiteral) => sink.push_delimited(
                span.start,
                span.end,
                (TokenKind::DoubleQuotes, 1),
                TokenKind::String,
                Some((TokenKind::DoubleQuotes, "\"")),
            ),
            Ok(raw) => sink.push(raw.simple_kind(), span.start, span.end),
            Err(()) => {
                let end = char_boundary(text, span.end);
                covered = end;
                sink.push(TokenKind::Undefined, span.start, end);
            }
        }
    }

    sink.tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Position;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    fn values(text: &str) -> Vec<String> {
        tokenize(text).into_iter().map(|t| t.value.to_string()).collect()
    }

    #[test]
    fn test_method_header() {
        assert_eq!(
            kinds("public String foo(Number x)"),
            vec![
                TokenKind::Alphanumeric,
                TokenKind::Space,
                TokenKind::Alphanumeric,
                TokenKind::Space,
                TokenKind::Alphanumeric,
                TokenKind::OpenParen,
                TokenKind::Alphanumeric,
                TokenKind::Space,
                TokenKind::Alphanumeric,
                TokenKind::CloseParen,
            ]
        );
    }

    #[test]
    fn test_percent_identifier() {
        assert_eq!(values("%UserID"), vec!["%UserID"]);
        assert_eq!(kinds("% x"), vec![TokenKind::PercentSign, TokenKind::Space, TokenKind::Alphanumeric]);
    }

    #[test]
    fn test_numeric_then_alphanumeric() {
        assert_eq!(values("12ab"), vec!["12", "ab"]);
    }

    #[test]
    fn test_line_comment_split() {
        let tokens = tokenize("foo // returns x\r\nbar");
        let comment: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind.is_comment())
            .map(|t| (t.kind, t.value.as_str()))
            .collect();
        assert_eq!(
            comment,
            vec![
                (TokenKind::LineCommentInit, "//"),
                (TokenKind::LineComment, " returns x"),
            ]
        );
        assert!(tokens.iter().any(|t| t.kind == TokenKind::NewLine && t.value == "\r\n"));
    }

    #[test]
    fn test_semicolon_comment() {
        assert_eq!(
            kinds(";old style"),
            vec![TokenKind::LineCommentInit, TokenKind::LineComment]
        );
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let tokens = tokenize("\t/* line one\n\tline two */\nfoo");
        assert_eq!(tokens[1].kind, TokenKind::BlockCommentInit);
        assert_eq!(tokens[2].kind, TokenKind::BlockComment);
        assert_eq!(tokens[2].value, " line one\n\tline two ");
        assert_eq!(tokens[3].kind, TokenKind::BlockCommentTerm);
        let foo = tokens.last().unwrap();
        assert_eq!(foo.value, "foo");
        assert_eq!(foo.position, Position::new(2, 0));
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(
            kinds("/* never closed\nfoo"),
            vec![TokenKind::BlockCommentInit, TokenKind::BlockComment]
        );
    }

    #[test]
    fn test_string_literal_with_escaped_quote() {
        let tokens = tokenize(r#"set x = "say ""hi"", ok""#);
        let string = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();
        assert_eq!(string.value, r#"say ""hi"", ok"#);
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::DoubleQuotes).count(),
            2
        );
        assert!(!tokens.iter().any(|t| t.kind == TokenKind::Comma));
    }

    #[test]
    fn test_unterminated_string_stops_at_newline() {
        let tokens = tokenize("\"abc\nfoo");
        assert_eq!(tokens[0].kind, TokenKind::DoubleQuotes);
        assert_eq!(tokens[1].value, "abc");
        assert_eq!(tokens[2].kind, TokenKind::NewLine);
        assert_eq!(tokens[3].value, "foo");
    }

    #[test]
    fn test_undefined_input_is_kept() {
        let text = "a\u{e9}b";
        let tokens = tokenize(text);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Undefined));
        let rebuilt: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_tokens_cover_input() {
        let text = "\t#PROPERTYDEF name class=String\n\ttype Number x = $$foo^BAR(1, \"a\") // c\n";
        let rebuilt: String = tokenize(text).iter().map(|t| t.value.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("foo\n\tbar");
        let bar = tokens.iter().find(|t| t.value == "bar").unwrap();
        assert_eq!(bar.position, Position::new(1, 1));
        assert_eq!(u32::from(bar.range.start()), 5);
    }
}
