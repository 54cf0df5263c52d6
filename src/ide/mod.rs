//! Editor-facing helpers.
//!
//! Presentation layers (hover, goto-definition, completion) assemble a
//! reference chain from the cursor token with [`call_chain`] and hand it to
//! [`ParsedDocFinder`](crate::hir::ParsedDocFinder).

mod chain;

pub use chain::call_chain;
