//! # psl-base
//!
//! Core library for PSL tokenizing, parsing, and cross-file symbol resolution.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide     → chain assembly for editor features
//!   ↓
//! hir     → search paths, table metadata, resolution engine
//!   ↓
//! project → content loaders (disk, in-memory buffers)
//!   ↓
//! syntax  → lexer, document model, parser
//!   ↓
//! base    → primitives (Position, LineIndex, TextRange)
//! ```
//!
//! ## Example
//!
//! ```
//! use psl::hir::{ParsedDocFinder, SearchPaths};
//! use psl::project::MemoryLoader;
//!
//! let loader = MemoryLoader::new().with_file("/proj/Order.PROC", "\t#PROPERTYDEF total class=Number\n");
//! let source = "run()\n\ttype Order o\n\tset x=o.total\n";
//! let finder = ParsedDocFinder::from_source(source, SearchPaths::new("/proj/Main.PROC").with_project_psl(["/proj"]), &loader);
//!
//! let tokens = &finder.document().tokens;
//! let cursor = tokens.iter().rposition(|t| t.value == "total").unwrap();
//! let chain = psl::ide::call_chain(tokens, cursor);
//! let found = finder.resolve_result(&chain).unwrap();
//! assert_eq!(found.fs_path, std::path::PathBuf::from("/proj/Order.PROC"));
//! ```

/// Foundation types: Position, LineIndex, text ranges
pub mod base;

/// Tokens, lexer, and parser
pub mod syntax;

/// Content loaders
pub mod project;

/// Semantic model: resolution across routines and tables
pub mod hir;

/// Editor-facing helpers
pub mod ide;

pub use base::{LineIndex, Position, TextRange, TextSize};
pub use syntax::{ParsedDocument, Token, TokenKind, parse_document, tokenize};
