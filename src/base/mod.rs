//! Foundation types for the PSL toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`TextRange`], [`TextSize`] - Byte ranges in source text
//! - [`Position`], [`LineIndex`] - Line/character conversion
//!
//! This module has NO dependencies on other psl modules.

mod span;

pub use span::{LineIndex, Position, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
