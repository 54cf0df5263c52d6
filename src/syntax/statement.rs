//! Statement sub-parser and the `type` declaration clause.
//!
//! Body lines are sequences of M-style commands:
//!
//! ```text
//! command[:postcondition] SP arguments SP command ...
//! ```
//!
//! Only enough structure is recovered to find local variable declarations
//! embedded in command arguments (`for type Number i=1:1:10 ...`). Failures
//! are reported per line and never affect the rest of the document.

use thiserror::Error;

use super::document::{Declaration, Statement};
use super::token::{Token, TokenKind};
use crate::base::Position;

/// Modifier keywords allowed between `type` and the declared type.
const DECLARATION_MODIFIERS: [&str; 4] = ["public", "private", "new", "literal"];

/// Why a line could not be split into statements.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatementError {
    #[error("expected a command at {0}, found {1:?}")]
    ExpectedCommand(Position, TokenKind),
    #[error("unbalanced parenthesis at {0}")]
    UnbalancedParen(Position),
}

/// Where a `type` clause stops.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ClauseEnd {
    /// The clause runs to the end of the line.
    Line,
    /// The clause is one command argument: unparenthesized whitespace
    /// after the declared name ends it.
    Argument,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClauseState {
    Modifiers,
    Name,
    AfterName,
    Initializer { depth: u32 },
    MultiType,
}

/// Parse the declarations of a `type` clause whose keyword is at
/// `tokens[start]`.
///
/// Returns the declarations and the index just past the clause.
pub(crate) fn parse_type_clause(tokens: &[Token], start: usize, end: ClauseEnd) -> (Vec<Declaration>, usize) {
    let mut declarations = Vec::new();
    let mut modifiers: Vec<Token> = Vec::new();
    let mut declared_type: Option<Token> = None;
    let mut current: Option<Declaration> = None;
    let mut state = ClauseState::Modifiers;

    let mut i = start + 1;
    while let Some(token) = tokens.get(i) {
        if token.is_newline() {
            break;
        }
        match state {
            ClauseState::Modifiers => {
                if token.is_whitespace() {
                } else if !token.is_alphanumeric() {
                    break;
                } else if DECLARATION_MODIFIERS.iter().any(|m| token.value == *m) {
                    modifiers.push(token.clone());
                } else {
                    declared_type = Some(token.clone());
                    state = ClauseState::Name;
                }
            }
            ClauseState::Name => {
                if token.is_whitespace() {
                } else if let (true, Some(ty)) = (token.is_alphanumeric(), &declared_type) {
                    current = Some(Declaration {
                        id: token.clone(),
                        types: vec![ty.clone()],
                        modifiers: modifiers.clone(),
                    });
                    state = ClauseState::AfterName;
                } else {
                    break;
                }
            }
            ClauseState::AfterName => match token.kind {
                TokenKind::Space | TokenKind::Tab if end == ClauseEnd::Argument => break,
                TokenKind::Space | TokenKind::Tab => {}
                TokenKind::EqualSign => state = ClauseState::Initializer { depth: 0 },
                TokenKind::OpenParen => state = ClauseState::MultiType,
                TokenKind::Comma => {
                    declarations.extend(current.take());
                    state = ClauseState::Name;
                }
                _ => break,
            },
            ClauseState::Initializer { depth } => match token.kind {
                TokenKind::OpenParen => state = ClauseState::Initializer { depth: depth + 1 },
                TokenKind::CloseParen => {
                    state = ClauseState::Initializer {
                        depth: depth.saturating_sub(1),
                    }
                }
                TokenKind::Comma if depth == 0 => {
                    declarations.extend(current.take());
                    state = ClauseState::Name;
                }
                TokenKind::Space | TokenKind::Tab if depth == 0 && end == ClauseEnd::Argument => break,
                _ => {}
            },
            ClauseState::MultiType => match token.kind {
                TokenKind::Alphanumeric => {
                    if let Some(declaration) = current.as_mut() {
                        declaration.types.push(token.clone());
                    }
                }
                TokenKind::CloseParen => state = ClauseState::AfterName,
                TokenKind::Comma | TokenKind::Space | TokenKind::Tab => {}
                _ => break,
            },
        }
        i += 1;
    }

    declarations.extend(current);
    (declarations, i)
}

/// Split one body line into statements.
///
/// Leading indentation and M dot-levels are skipped; the line ends at a
/// newline or a comment.
pub fn parse_statements(line: &[Token]) -> Result<Vec<Statement>, StatementError> {
    let mut statements = Vec::new();
    let mut i = 0;
    while line
        .get(i)
        .is_some_and(|t| t.is_whitespace() || t.kind == TokenKind::Period)
    {
        i += 1;
    }

    loop {
        while line.get(i).is_some_and(Token::is_whitespace) {
            i += 1;
        }
        let Some(token) = line.get(i) else { break };
        match token.kind {
            TokenKind::NewLine | TokenKind::LineCommentInit | TokenKind::BlockCommentInit => break,
            TokenKind::OpenBrace | TokenKind::CloseBrace => {
                i += 1;
                continue;
            }
            TokenKind::Alphanumeric => {}
            kind => return Err(StatementError::ExpectedCommand(token.position, kind)),
        }

        let command = token.clone();
        i += 1;

        let mut postcondition = Vec::new();
        if line.get(i).is_some_and(|t| t.is(TokenKind::Colon)) {
            let end = argument_end(line, i + 1)?;
            postcondition.extend_from_slice(&line[i + 1..end]);
            i = end;
        }

        let mut arguments = Vec::new();
        let mut declarations = Vec::new();
        // One space introduces arguments; two mean an argumentless command.
        if line.get(i).is_some_and(|t| t.is(TokenKind::Space))
            && line
                .get(i + 1)
                .is_some_and(|t| !t.is_whitespace() && !t.is_newline())
        {
            i += 1;
            if line[i].is_keyword("type") {
                let (found, next) = parse_type_clause(line, i, ClauseEnd::Argument);
                declarations = found;
                arguments.extend_from_slice(&line[i..next]);
                i = next;
            }
            let end = argument_end(line, i)?;
            arguments.extend_from_slice(&line[i..end]);
            i = end;
        }

        statements.push(Statement {
            command,
            postcondition,
            arguments,
            declarations,
        });
    }

    Ok(statements)
}

/// Index of the first unparenthesized whitespace, newline, or comment at
/// or after `start`.
fn argument_end(line: &[Token], start: usize) -> Result<usize, StatementError> {
    let mut depth: u32 = 0;
    let mut i = start;
    while let Some(token) = line.get(i) {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(StatementError::UnbalancedParen(token.position))?;
            }
            TokenKind::Space | TokenKind::Tab if depth == 0 => break,
            TokenKind::NewLine | TokenKind::LineCommentInit => break,
            _ => {}
        }
        i += 1;
    }
    Ok(i)
}
