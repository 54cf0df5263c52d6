//! Semantic layer: search paths, table metadata, and cross-file resolution.
//!
//! Everything here works on [`ParsedDocument`](crate::syntax::ParsedDocument)s
//! and reads further sources only through a
//! [`ContentLoader`](crate::project::ContentLoader).

mod finder;
mod paths;
mod table;

pub use finder::{NextType, ParsedDocFinder, RECORD_PREFIX, ROUTINE_EXTENSIONS, ResolvedSymbol};
pub use paths::SearchPaths;
pub use table::{TableDirectory, TableHeader, TableHeaderError, read_table_header, table_documentation};
