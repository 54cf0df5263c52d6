//! Table metadata.
//!
//! A table lives in its own directory under one of the table roots:
//!
//! ```text
//! orders/
//!   ORDERS.TBL        header: comment-tolerant JSON, then free text
//!   ORDERS-ID.COL     one file per column
//!   ORDERS-NAME.COL
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::project::ContentLoader;

/// Why a `.TBL` header could not be read.
#[derive(Debug, Error)]
pub enum TableHeaderError {
    #[error("table header is empty")]
    Empty,
    #[error("malformed table header: {0}")]
    Json(#[from] serde_json::Error),
}

/// The JSON object at the top of a `.TBL` file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TableHeader {
    #[serde(rename = "DES", default)]
    pub description: Option<String>,
    /// Parent table id.
    #[serde(rename = "PARFID", default)]
    pub parent: Option<String>,
    /// Free text after the JSON object.
    #[serde(skip)]
    pub extra: String,
}

impl TableHeader {
    pub fn parse(text: &str) -> Result<Self, TableHeaderError> {
        let masked = mask_comments(text);
        if masked.trim().is_empty() {
            return Err(TableHeaderError::Empty);
        }
        let mut stream = serde_json::Deserializer::from_str(&masked).into_iter::<TableHeader>();
        let mut header = stream.next().ok_or(TableHeaderError::Empty)??;
        let end = stream.byte_offset();
        header.extra = text.get(end..).unwrap_or_default().trim().to_string();
        header.parent = header.parent.filter(|p| !p.trim().is_empty());
        Ok(header)
    }

    /// Description followed by any trailing free text.
    pub fn documentation(&self) -> String {
        let parts = [self.description.as_deref().unwrap_or_default(), self.extra.as_str()];
        parts
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Blank out `//` and `/* */` comments outside string literals, keeping
/// byte offsets and newlines intact.
fn mask_comments(text: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        Str { escaped: bool },
        Line,
        Block,
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut state = State::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match (b, next) {
                (b'/', Some(b'/')) => {
                    state = State::Line;
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'/', Some(b'*')) => {
                    state = State::Block;
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'"', _) => {
                    state = State::Str { escaped: false };
                    out.push(b);
                }
                _ => out.push(b),
            },
            State::Str { escaped } => {
                out.push(b);
                state = match b {
                    b'\\' if !escaped => State::Str { escaped: true },
                    b'"' if !escaped => State::Code,
                    _ => State::Str { escaped: false },
                };
            }
            State::Line => {
                if b == b'\n' {
                    state = State::Code;
                    out.push(b);
                } else {
                    out.push(b' ');
                }
            }
            State::Block => {
                if b == b'*' && next == Some(b'/') {
                    state = State::Code;
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                out.push(if b == b'\n' { b'\n' } else { b' ' });
            }
        }
        i += 1;
    }
    // Only ASCII bytes were replaced, and always as whole characters.
    String::from_utf8(out).unwrap_or_default()
}

/// Read and parse a table header, logging failures.
pub fn read_table_header(loader: &dyn ContentLoader, tbl_path: &Path) -> Option<TableHeader> {
    let text = loader.load(tbl_path);
    match TableHeader::parse(&text) {
        Ok(header) => Some(header),
        Err(error) => {
            tracing::debug!(path = %tbl_path.display(), %error, "unreadable table header");
            None
        }
    }
}

/// Hover text for a table: its description plus trailing notes.
pub fn table_documentation(loader: &dyn ContentLoader, tbl_path: &Path) -> Option<String> {
    let documentation = read_table_header(loader, tbl_path)?.documentation();
    (!documentation.is_empty()).then_some(documentation)
}

/// A table's metadata directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDirectory {
    pub name: SmolStr,
    pub path: PathBuf,
}

impl TableDirectory {
    /// First directory named `name` (case-insensitively) across `roots`.
    pub fn find(loader: &dyn ContentLoader, roots: &[PathBuf], name: &str) -> Option<Self> {
        let wanted = name.to_lowercase();
        roots.iter().find_map(|root| {
            loader
                .list_dir(root)
                .into_iter()
                .find(|entry| file_name(entry).is_some_and(|n| n.to_lowercase() == wanted))
                .map(|path| Self {
                    name: SmolStr::new(name),
                    path,
                })
        })
    }

    /// The `<NAME>.TBL` header file.
    pub fn tbl_path(&self, loader: &dyn ContentLoader) -> PathBuf {
        let wanted = format!("{}.TBL", self.name);
        loader
            .list_dir(&self.path)
            .into_iter()
            .find(|entry| file_name(entry).is_some_and(|n| n.eq_ignore_ascii_case(&wanted)))
            .unwrap_or_else(|| self.path.join(wanted.to_uppercase()))
    }

    /// Lower-cased column names with their `.COL` files, in listing order.
    pub fn columns(&self, loader: &dyn ContentLoader) -> Vec<(SmolStr, PathBuf)> {
        let prefix = format!("{}-", self.name.to_lowercase());
        loader
            .list_dir(&self.path)
            .into_iter()
            .filter_map(|entry| {
                let file = file_name(&entry)?.to_lowercase();
                let stem = file.strip_suffix(".col")?;
                let column = stem.strip_prefix(&prefix)?;
                (!column.is_empty()).then(|| (SmolStr::new(column), entry))
            })
            .collect()
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()
}
