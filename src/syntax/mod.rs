// Tokenizer, document model, and parser for PSL sources
mod document;
mod lexer;
mod parser;
mod statement;
mod token;

pub use document::{Declaration, Member, MemberClass, Method, Parameter, ParsedDocument, Property, Statement};
pub use lexer::tokenize;
pub use parser::parse_document;
pub use statement::{StatementError, parse_statements};
pub use token::{Token, TokenKind};
