//! Cross-file symbol resolution.
//!
//! A [`ParsedDocFinder`] answers "where is this defined?" for a chain of
//! reference tokens (`a`, `a.b.c`, `^ROUTINE`, `label^ROUTINE`) written in
//! one parsed document. Lookups that leave the document pivot to a new
//! finder rooted at another routine or table, loading and parsing it on
//! demand through the [`ContentLoader`].
//!
//! ## Single-token lookup order
//!
//! 1. `this` is the current file.
//! 2. Parameters and locals of the enclosing method, then file-scope locals.
//!    Only declarations at or before the reference line count, nearest first.
//! 3. Properties and methods of the document, then of its ancestors.
//! 4. Type names: core classes, `Record<Table>`, and the document's own name.
//!
//! A member whose declared type is the queried token itself resolves to the
//! type's file instead.
//!
//! ## Chains
//!
//! The head of `a.b.c` is looked up as above, except that type names and
//! `this` are checked before locals. Every later segment is a member of the previous
//! segment's type. A `void` or missing type ends the chain.
//!
//! Finders are cheap to clone and never mutated after construction, so a
//! request can be resolved on any thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use super::paths::SearchPaths;
use super::table::{TableDirectory, read_table_header};
use crate::project::ContentLoader;
use crate::syntax::{Member, MemberClass, ParsedDocument, Property, Token, TokenKind, parse_document};

/// Routine file extensions, in lookup order.
pub const ROUTINE_EXTENSIONS: [&str; 3] = ["PROC", "psl", "PSL"];

/// Prefix that turns a table name into a type name.
pub const RECORD_PREFIX: &str = "Record";

// ============================================================================
// RESULTS
// ============================================================================

/// Where a reference is defined.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSymbol {
    pub fs_path: PathBuf,
    /// `None` when the reference names a whole file (a routine, a table,
    /// or `this`).
    pub member: Option<Member>,
}

impl ResolvedSymbol {
    pub fn file(fs_path: impl Into<PathBuf>) -> Self {
        Self {
            fs_path: fs_path.into(),
            member: None,
        }
    }

    pub fn member(fs_path: impl Into<PathBuf>, member: Member) -> Self {
        Self {
            fs_path: fs_path.into(),
            member: Some(member),
        }
    }

    pub fn is_file(&self) -> bool {
        self.member.is_none()
    }
}

/// The type a chain continues into after a member.
#[derive(Clone, Debug, PartialEq)]
pub enum NextType {
    Named(Token),
    /// Declared `void`: nothing can follow.
    Void,
}

impl NextType {
    /// The declared type of `member`, if it has one.
    pub fn of(member: &Member) -> Option<Self> {
        let ty = member.types().first()?;
        if ty.is_keyword("void") {
            Some(NextType::Void)
        } else {
            Some(NextType::Named(ty.clone()))
        }
    }
}

/// Whether `name` is `Record<Table>` rather than a routine name.
fn table_name(name: &str) -> Option<&str> {
    name.strip_prefix(RECORD_PREFIX).filter(|table| !table.is_empty())
}

// ============================================================================
// LOADING
// ============================================================================

/// Loader view that stops reading once the request is cancelled.
struct Guarded<'l> {
    loader: &'l dyn ContentLoader,
    cancellation: Option<&'l CancellationToken>,
}

impl Guarded<'_> {
    fn cancelled(&self) -> bool {
        self.cancellation.is_some_and(CancellationToken::is_cancelled)
    }
}

impl ContentLoader for Guarded<'_> {
    fn load(&self, path: &Path) -> String {
        if self.cancelled() {
            return String::new();
        }
        self.loader.load(path)
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        if self.cancelled() {
            return Vec::new();
        }
        self.loader.list_dir(path)
    }
}

/// Stems of the files in the core library root.
fn core_classes(loader: &dyn ContentLoader, core_psl: &Path) -> FxHashSet<SmolStr> {
    if core_psl.as_os_str().is_empty() {
        return FxHashSet::default();
    }
    loader
        .list_dir(core_psl)
        .iter()
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ROUTINE_EXTENSIONS.contains(&ext))
        })
        .filter_map(|path| path.file_stem()?.to_str().map(SmolStr::new))
        .collect()
}

// ============================================================================
// FINDER
// ============================================================================

/// Resolution engine bound to one parsed document.
#[derive(Clone)]
pub struct ParsedDocFinder<'a> {
    document: Arc<ParsedDocument>,
    paths: SearchPaths,
    loader: &'a dyn ContentLoader,
    /// Documents already ascended through, for cycle detection.
    hierarchy: Vec<PathBuf>,
    proc_name: String,
    core_classes: Arc<FxHashSet<SmolStr>>,
    /// Column name to `.COL` file, for table documents.
    columns: Arc<IndexMap<SmolStr, PathBuf>>,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for ParsedDocFinder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedDocFinder")
            .field("active_routine", &self.paths.active_routine)
            .field("hierarchy", &self.hierarchy)
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}

impl<'a> ParsedDocFinder<'a> {
    pub fn new(document: ParsedDocument, paths: SearchPaths, loader: &'a dyn ContentLoader) -> Self {
        let core_classes = core_classes(loader, &paths.core_psl);
        Self {
            document: Arc::new(document),
            proc_name: paths.proc_name(),
            paths,
            loader,
            hierarchy: Vec::new(),
            core_classes: Arc::new(core_classes),
            columns: Arc::default(),
            cancellation: None,
        }
    }

    /// Parse `text` and build a finder for it.
    pub fn from_source(text: &str, paths: SearchPaths, loader: &'a dyn ContentLoader) -> Self {
        Self::new(parse_document(text), paths, loader)
    }

    /// Abandon loading (and resolve to nothing) once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.paths
    }

    /// Base name of the document's file.
    pub fn proc_name(&self) -> &str {
        &self.proc_name
    }

    pub fn hierarchy(&self) -> &[PathBuf] {
        &self.hierarchy
    }

    pub fn is_core_class(&self, name: &str) -> bool {
        self.core_classes.contains(name)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn guarded(&self) -> Guarded<'_> {
        Guarded {
            loader: self.loader,
            cancellation: self.cancellation.as_ref(),
        }
    }

    /// A finder for another document sharing this request's roots.
    fn derive(&self, document: ParsedDocument, active_routine: &Path) -> Self {
        let paths = self.paths.with_routine(active_routine);
        Self {
            document: Arc::new(document),
            proc_name: paths.proc_name(),
            paths,
            loader: self.loader,
            hierarchy: Vec::new(),
            core_classes: Arc::clone(&self.core_classes),
            columns: Arc::default(),
            cancellation: self.cancellation.clone(),
        }
    }

    fn whole_file(&self) -> ResolvedSymbol {
        ResolvedSymbol::file(&self.paths.active_routine)
    }

    /// Result for a member of this document. Columns point at their own file.
    fn symbol_for(&self, member: Member) -> ResolvedSymbol {
        let column_file = (member.member_class() == MemberClass::Column)
            .then(|| self.columns.get(member.name()))
            .flatten();
        match column_file {
            Some(path) => ResolvedSymbol::member(path, member),
            None => ResolvedSymbol::member(&self.paths.active_routine, member),
        }
    }

    // ------------------------------------------------------------------------
    // Pivots
    // ------------------------------------------------------------------------

    /// A finder for the routine or table named `name`.
    ///
    /// `Record<Table>` names a table. Anything else is a routine base name,
    /// looked up in the core root first when it is a core class, then in
    /// the project roots. Within a root, extensions are tried in
    /// [`ROUTINE_EXTENSIONS`] order and the first non-empty file wins.
    pub fn new_finder(&self, name: &str) -> Option<Self> {
        if self.is_cancelled() {
            return None;
        }
        match table_name(name) {
            Some(table) => self.table_finder(table),
            None => self.routine_finder(name),
        }
    }

    fn routine_finder(&self, name: &str) -> Option<Self> {
        let core = self.is_core_class(name).then_some(&self.paths.core_psl);
        let loader = self.guarded();
        for root in core.into_iter().chain(&self.paths.project_psl) {
            for ext in ROUTINE_EXTENSIONS {
                let path = root.join(format!("{name}.{ext}"));
                let text = loader.load(&path);
                if text.is_empty() {
                    continue;
                }
                tracing::debug!(name, path = %path.display(), "pivot to routine");
                return Some(self.derive(parse_document(&text), &path));
            }
        }
        tracing::trace!(name, "no routine found");
        None
    }

    fn table_finder(&self, table: &str) -> Option<Self> {
        let loader = self.guarded();
        let directory = TableDirectory::find(&loader, &self.paths.tables, table)?;
        let tbl_path = directory.tbl_path(&loader);
        let parent = read_table_header(&loader, &tbl_path).and_then(|header| header.parent);
        let extending = match parent {
            Some(parent) => format!("{RECORD_PREFIX}{parent}"),
            None => RECORD_PREFIX.to_string(),
        };

        let columns: IndexMap<SmolStr, PathBuf> = directory.columns(&loader).into_iter().collect();
        let document = ParsedDocument {
            properties: columns.keys().cloned().map(Property::column).collect(),
            extending: Some(Token::dummy(extending)),
            ..ParsedDocument::default()
        };
        tracing::debug!(table, path = %tbl_path.display(), columns = columns.len(), "pivot to table");

        let mut finder = self.derive(document, &tbl_path);
        finder.columns = Arc::new(columns);
        Some(finder)
    }

    /// A finder for the parent class, unless this document was already
    /// visited on the way up.
    fn parent_finder(&self) -> Option<Self> {
        let parent = self.document.extending.as_ref()?;
        let current = &self.paths.active_routine;
        if self.hierarchy.contains(current) {
            tracing::debug!(path = %current.display(), "inheritance cycle");
            return None;
        }
        let mut hierarchy = self.hierarchy.clone();
        hierarchy.push(current.clone());

        let mut finder = self.new_finder(&parent.value)?;
        finder.hierarchy = hierarchy;
        Some(finder)
    }

    /// The table directory for `table_name` across the table roots.
    pub fn resolve_file_definition_directory(&self, table_name: &str) -> Option<PathBuf> {
        TableDirectory::find(&self.guarded(), &self.paths.tables, table_name).map(|d| d.path)
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Parameters and locals visible at the token's line.
    fn search_parser(&self, token: &Token) -> Option<ResolvedSymbol> {
        let line = token.position.line;
        let name = token.value.as_str();
        let visible = |id: &Token| id.value == name && id.position.line <= line;

        let method = self.document.method_at_line(line);
        let local = method.and_then(|method| {
            let parameter = method
                .parameters
                .iter()
                .find(|p| p.id.as_ref().is_some_and(|id| id.value == name))
                .cloned()
                .map(Member::Parameter);
            parameter.or_else(|| {
                method
                    .declarations
                    .iter()
                    .rev()
                    .find(|d| visible(&d.id))
                    .cloned()
                    .map(Member::Declaration)
            })
        });
        let member = local.or_else(|| {
            self.document
                .declarations
                .iter()
                .rev()
                .find(|d| visible(&d.id))
                .cloned()
                .map(Member::Declaration)
        })?;
        Some(ResolvedSymbol::member(&self.paths.active_routine, member))
    }

    /// A property or method of this document or its ancestors.
    fn search_in_document(&self, name: &str) -> Option<ResolvedSymbol> {
        if let Some(member) = self.document.members_named(name).next() {
            return Some(self.symbol_for(member));
        }
        self.parent_finder()?.search_in_document(name)
    }

    /// Step 4 of single-token lookup: a type name.
    fn search_type_name(&self, name: &str) -> Option<(Self, ResolvedSymbol)> {
        if self.is_core_class(name) || table_name(name).is_some() {
            let finder = self.new_finder(name)?;
            let result = finder.whole_file();
            return Some((finder, result));
        }
        (name == self.proc_name).then(|| (self.clone(), self.whole_file()))
    }

    /// The finder for the document a result's chain continues into.
    fn continue_from(&self, result: &ResolvedSymbol) -> Option<Self> {
        let Some(member) = &result.member else {
            return Some(self.clone());
        };
        match NextType::of(member)? {
            NextType::Named(ty) => self.new_finder(&ty.value),
            NextType::Void => None,
        }
    }

    fn locate_single(&self, token: &Token) -> Option<(Self, ResolvedSymbol)> {
        if token.value == "this" {
            return Some((self.clone(), self.whole_file()));
        }
        let found = self
            .search_parser(token)
            .or_else(|| self.search_in_document(&token.value));
        let Some(result) = found else {
            return self.search_type_name(&token.value);
        };

        let self_typed = result
            .member
            .as_ref()
            .and_then(|member| member.types().first())
            .is_some_and(|ty| ty.is_same_token(token));
        if self_typed {
            if let Some(finder) = self.new_finder(&token.value) {
                let result = finder.whole_file();
                return Some((finder, result));
            }
        }
        Some((self.clone(), result))
    }

    /// First segment of a chain. Type names and `this` come before locals.
    fn locate_head(&self, head: &Token) -> Option<(Self, ResolvedSymbol)> {
        let name = head.value.as_str();
        if self.is_core_class(name) || table_name(name).is_some() {
            if let Some(finder) = self.new_finder(name) {
                let result = finder.whole_file();
                return Some((finder, result));
            }
        }
        if name == "this" || name == self.proc_name {
            return Some((self.clone(), self.whole_file()));
        }
        let result = self
            .search_parser(head)
            .or_else(|| self.search_in_document(name))?;
        Some((self.clone(), result))
    }

    fn locate_chain(&self, chain: &[Token]) -> Option<(Self, ResolvedSymbol)> {
        let (head, rest) = chain.split_first()?;
        let (mut scope, mut result) = self.locate_head(head)?;
        for segment in rest {
            let next = scope.continue_from(&result)?;
            result = next.search_in_document(&segment.value)?;
            scope = next;
        }
        Some((scope, result))
    }

    /// `[^, ROUTINE]` or `[^, ROUTINE, label]`.
    fn locate_caret(&self, chain: &[Token]) -> Option<(Self, ResolvedSymbol)> {
        let routine = chain.get(1)?;
        let finder = self.new_finder(&routine.value)?;
        let result = match chain.get(2) {
            Some(label) => finder.search_in_document(&label.value)?,
            None => finder.whole_file(),
        };
        Some((finder, result))
    }

    fn locate(&self, chain: &[Token]) -> Option<(Self, ResolvedSymbol)> {
        let located = match chain {
            [] => None,
            [caret, ..] if caret.is(TokenKind::Caret) => self.locate_caret(chain),
            [single] => self.locate_single(single),
            _ => self.locate_chain(chain),
        };
        if self.is_cancelled() {
            tracing::debug!("resolution cancelled");
            return None;
        }
        located
    }

    /// Resolve a reference chain to its definition.
    #[tracing::instrument(skip_all, fields(chain = %chain_text(chain), routine = %self.proc_name))]
    pub fn resolve_result(&self, chain: &[Token]) -> Option<ResolvedSymbol> {
        let result = self.locate(chain).map(|(_, result)| result);
        tracing::trace!(found = result.is_some(), "resolved");
        result
    }

    /// The finder for the type a chain evaluates to, for listing what can
    /// follow it.
    pub fn finder_for_chain(&self, chain: &[Token]) -> Option<Self> {
        let (scope, result) = self.locate(chain)?;
        scope.continue_from(&result)
    }

    /// Every member reachable on this document: columns, properties, and
    /// methods, then inherited members not overridden by a closer one.
    pub fn find_all_in_document(&self) -> Vec<ResolvedSymbol> {
        let mut seen = FxHashSet::default();
        let mut found = Vec::new();
        self.collect_members(&mut seen, &mut found);
        found
    }

    fn collect_members(&self, seen: &mut FxHashSet<SmolStr>, found: &mut Vec<ResolvedSymbol>) {
        let members = self
            .document
            .properties
            .iter()
            .cloned()
            .map(Member::Property)
            .chain(self.document.methods.iter().cloned().map(Member::Method));
        for member in members {
            if seen.insert(SmolStr::new(member.name())) {
                found.push(self.symbol_for(member));
            }
        }
        if let Some(parent) = self.parent_finder() {
            parent.collect_members(seen, found);
        }
    }
}

fn chain_text(chain: &[Token]) -> String {
    chain.iter().map(|t| t.value.as_str()).collect::<Vec<_>>().join(" ")
}
