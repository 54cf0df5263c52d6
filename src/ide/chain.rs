//! Reference chain assembly.
//!
//! Turns the token under the cursor into the chain that
//! [`ParsedDocFinder::resolve_result`](crate::hir::ParsedDocFinder::resolve_result)
//! expects:
//!
//! ```text
//! a.b(x, y).c        cursor on c   ->  [a, b, c]
//! ^ROUTINE           cursor on ROUTINE  ->  [^, ROUTINE]
//! label^ROUTINE      cursor on either   ->  [^, ROUTINE, label]
//! ```

use crate::syntax::{Token, TokenKind};

/// Where the backward scan is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Just took an identifier; a period continues the chain.
    AfterIdent,
    /// Just took a period; an identifier (or a call) must precede it.
    AfterDot,
    /// Inside a call's argument list, scanning back to its open paren.
    InCall { depth: u32 },
    /// Just left a call; its method name must precede it.
    AfterCall,
}

/// The chain ending at `tokens[index]`, or empty when that token cannot
/// end a reference.
pub fn call_chain(tokens: &[Token], index: usize) -> Vec<Token> {
    let Some(target) = tokens.get(index).filter(|t| t.is_alphanumeric()) else {
        return Vec::new();
    };
    if let Some(chain) = caret_chain(tokens, index) {
        return chain;
    }

    let mut chain = vec![target.clone()];
    let mut state = State::AfterIdent;
    for token in tokens[..index].iter().rev() {
        state = match (state, token.kind) {
            (State::AfterIdent, TokenKind::Period) => State::AfterDot,
            (State::AfterDot, TokenKind::Alphanumeric) => {
                chain.push(token.clone());
                State::AfterIdent
            }
            (State::AfterDot, TokenKind::CloseParen) => State::InCall { depth: 1 },
            (State::InCall { depth: 1 }, TokenKind::OpenParen) => State::AfterCall,
            (State::InCall { depth }, TokenKind::OpenParen) => State::InCall { depth: depth - 1 },
            (State::InCall { depth }, TokenKind::CloseParen) => State::InCall { depth: depth + 1 },
            (State::InCall { .. }, TokenKind::NewLine) => break,
            (State::InCall { depth }, _) => State::InCall { depth },
            (State::AfterCall, TokenKind::Alphanumeric) => {
                chain.push(token.clone());
                State::AfterIdent
            }
            _ => break,
        };
    }
    chain.reverse();
    chain
}

/// `[^, ROUTINE, label?]` when the target is either side of a caret.
fn caret_chain(tokens: &[Token], index: usize) -> Option<Vec<Token>> {
    let before = |i: usize, back: usize| i.checked_sub(back).and_then(|j| tokens.get(j));
    let is_caret = |t: Option<&Token>| t.is_some_and(|t| t.is(TokenKind::Caret));
    let ident = |t: Option<&Token>| t.filter(|t| t.is_alphanumeric()).cloned();

    let (caret, routine, label) = if is_caret(before(index, 1)) {
        (before(index, 1)?, &tokens[index], ident(before(index, 2)))
    } else if is_caret(tokens.get(index + 1)) {
        let routine = tokens.get(index + 2).filter(|t| t.is_alphanumeric())?;
        (tokens.get(index + 1)?, routine, Some(tokens[index].clone()))
    } else {
        return None;
    };

    let mut chain = vec![caret.clone(), routine.clone()];
    chain.extend(label);
    Some(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;

    fn chain_at(text: &str, nth: usize, value: &str) -> Vec<String> {
        let tokens = tokenize(text);
        let index = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.value == value)
            .nth(nth)
            .map(|(i, _)| i)
            .unwrap();
        call_chain(&tokens, index)
            .into_iter()
            .map(|t| t.value.to_string())
            .collect()
    }

    #[test]
    fn test_single_identifier() {
        assert_eq!(chain_at("\tset x=y", 0, "y"), vec!["y"]);
    }

    #[test]
    fn test_dotted_chain() {
        assert_eq!(chain_at("\tset x=a.b.c", 0, "c"), vec!["a", "b", "c"]);
        assert_eq!(chain_at("\tset x=a.b.c", 0, "b"), vec!["a", "b"]);
    }

    #[test]
    fn test_calls_in_chain() {
        let text = "\tset x=a.b(f(1), \"s\").c";
        assert_eq!(chain_at(text, 0, "c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_chain_inside_arguments() {
        assert_eq!(chain_at("\tdo q(a.b)", 0, "b"), vec!["a", "b"]);
    }

    #[test]
    fn test_caret_forms() {
        assert_eq!(chain_at("\tdo ^UTIL", 0, "UTIL"), vec!["^", "UTIL"]);
        assert_eq!(chain_at("\tdo fmt^UTIL(x)", 0, "UTIL"), vec!["^", "UTIL", "fmt"]);
        assert_eq!(chain_at("\tdo fmt^UTIL(x)", 0, "fmt"), vec!["^", "UTIL", "fmt"]);
    }

    #[test]
    fn test_not_a_reference() {
        let tokens = tokenize("\tset x=1");
        let eq = tokens.iter().position(|t| t.is(TokenKind::EqualSign)).unwrap();
        assert!(call_chain(&tokens, eq).is_empty());
        assert!(call_chain(&tokens, 99).is_empty());
    }

    #[test]
    fn test_dangling_period_stops() {
        assert_eq!(chain_at("\tset x=.b", 0, "b"), vec!["b"]);
    }
}
