//! PSL document parser.
//!
//! A single forward pass over the token stream. Unindented lines are method
//! headers; indented lines are body (or file-scope) lines that may carry
//! property definitions, `type`/`catch` declarations, class directives, or
//! ordinary statements. A line that cannot be understood is dropped and
//! parsing continues with the next one, so a document is always produced.
//!
//! All scanning state lives in a [`Cursor`] and a [`DocumentBuilder`] that
//! are local to one [`parse_document`] call.

use smol_str::SmolStr;

use super::document::{Declaration, MemberClass, Method, Parameter, ParsedDocument, Property};
use super::lexer::tokenize;
use super::statement::{ClauseEnd, parse_statements, parse_type_clause};
use super::token::{Token, TokenKind};
use crate::base::LineIndex;

/// Unindented lines starting with these are statements, not method headers.
const FLOW_CONTROL_KEYWORDS: [&str; 10] = ["do", "d", "set", "s", "if", "i", "for", "f", "while", "w"];

/// Header modifiers that can never be a return type.
const NON_TYPE_MODIFIERS: [&str; 3] = ["public", "static", "private"];

// ============================================================================
// CURSOR
// ============================================================================

/// Position in the token stream.
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Tokens up to the next newline; the newline itself is consumed.
    fn take_line(&mut self) -> &'t [Token] {
        let start = self.pos;
        while let Some(token) = self.peek() {
            if token.is_newline() {
                break;
            }
            self.pos += 1;
        }
        let line = &self.tokens[start..self.pos];
        self.bump();
        line
    }

    /// Whether the token after the current one opens an unindented line
    /// that is neither a comment nor a closing paren.
    fn next_line_is_unindented(&self) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|next| {
            !next.is_whitespace() && !next.is_newline() && !next.kind.is_comment() && !next.is(TokenKind::CloseParen)
        })
    }
}

// ============================================================================
// DOCUMENT BUILDER
// ============================================================================

/// Member expecting a doc comment on a given line.
#[derive(Copy, Clone, Debug)]
enum DocTarget {
    Method(usize),
    Property(usize),
}

#[derive(Default)]
struct DocumentBuilder {
    declarations: Vec<Declaration>,
    extending: Option<Token>,
    psl_package: Option<SmolStr>,
    methods: Vec<Method>,
    properties: Vec<Property>,
    /// Line a doc comment must start on to attach, and to what.
    pending_doc: Option<(u32, DocTarget)>,
    /// Most recent column-0 line comment.
    last_line_comment: Option<Token>,
}

impl DocumentBuilder {
    fn push_method(&mut self, mut method: Method, header_end_line: u32) {
        if let Some(previous) = self.methods.last_mut() {
            previous.end_line = method.line.saturating_sub(1).max(previous.line);
        }
        if let Some(comment) = self.last_line_comment.take() {
            if comment.position.line + 1 == method.line {
                method.prev_comment = Some(comment);
            }
        }
        self.pending_doc = Some((header_end_line + 1, DocTarget::Method(self.methods.len())));
        self.methods.push(method);
    }

    fn push_property(&mut self, property: Property) {
        let line = property.id.position.line;
        self.pending_doc = Some((line + 1, DocTarget::Property(self.properties.len())));
        self.properties.push(property);
    }

    /// Locals go to the current method, or to file scope before the first one.
    fn push_declarations(&mut self, declarations: impl IntoIterator<Item = Declaration>) {
        match self.methods.last_mut() {
            Some(method) => method.declarations.extend(declarations),
            None => self.declarations.extend(declarations),
        }
    }

    /// A block comment starting on the line after a header documents it.
    fn block_comment(&mut self, line: &[Token]) {
        let mut tokens = line.iter().skip_while(|t| t.is_whitespace());
        let Some(init) = tokens.next() else { return };
        let Some((doc_line, target)) = self.pending_doc else {
            return;
        };
        if init.position.line != doc_line {
            return;
        }
        let body = tokens
            .next()
            .filter(|t| t.is(TokenKind::BlockComment))
            .map(|t| SmolStr::new(t.value.trim()))
            .unwrap_or_default();
        match target {
            DocTarget::Method(index) => {
                if let Some(method) = self.methods.get_mut(index) {
                    method.documentation.get_or_insert(body);
                }
            }
            DocTarget::Property(index) => {
                if let Some(property) = self.properties.get_mut(index) {
                    property.documentation.get_or_insert(body);
                }
            }
        }
        self.pending_doc = None;
    }

    /// An indented line: directives, declarations, or statements.
    fn body_line(&mut self, line: &[Token]) {
        let Some(first) = line.iter().position(|t| !t.is_whitespace()) else {
            return;
        };
        let head = &line[first];
        match head.kind {
            TokenKind::BlockCommentInit => return self.block_comment(line),
            TokenKind::LineCommentInit => return,
            _ => {}
        }

        if let Some(property) = property_def(&line[first..]) {
            return self.push_property(property);
        }
        if head.is_keyword("type") {
            let (declarations, _) = parse_type_clause(line, first, ClauseEnd::Line);
            return self.push_declarations(declarations);
        }
        if head.is_keyword("catch") {
            return self.push_declarations(catch_clause(&line[first + 1..]));
        }

        if self.extending.is_none() {
            self.extending = extends_directive(&line[first..]);
        }
        if let Some(package) = package_directive(&line[first..]) {
            self.psl_package = Some(package);
        }

        match parse_statements(line) {
            Ok(statements) => {
                let declarations: Vec<_> = statements
                    .iter()
                    .flat_map(|s| s.declarations.iter().cloned())
                    .collect();
                self.push_declarations(declarations);
                if let Some(method) = self.methods.last_mut() {
                    method.statements.extend(statements);
                }
            }
            Err(error) => {
                tracing::trace!(line = head.position.line, %error, "skipping statements");
            }
        }
    }

    fn finish(mut self, tokens: Vec<Token>, last_line: u32) -> ParsedDocument {
        if let Some(method) = self.methods.last_mut() {
            method.end_line = last_line.max(method.line);
        }
        let comments = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::LineComment | TokenKind::BlockComment))
            .cloned()
            .collect();
        ParsedDocument {
            comments,
            declarations: self.declarations,
            extending: self.extending,
            psl_package: self.psl_package,
            methods: self.methods,
            properties: self.properties,
            tokens,
        }
    }
}

// ============================================================================
// METHOD HEADERS
// ============================================================================

/// Parse a method header starting at the cursor. The cursor always ends up
/// past the header's last line, whether or not a method was produced.
fn method_header(cursor: &mut Cursor<'_>) -> Option<(Method, u32)> {
    let mut modifiers: Vec<Token> = Vec::new();
    let mut parameters = Vec::new();
    let mut batch = false;
    let mut header_end_line = cursor.peek()?.position.line;

    while let Some(token) = cursor.peek() {
        match token.kind {
            TokenKind::Space | TokenKind::Tab => {
                cursor.bump();
            }
            TokenKind::NewLine | TokenKind::LineCommentInit | TokenKind::BlockCommentInit => {
                cursor.take_line();
                break;
            }
            TokenKind::OpenParen => {
                cursor.bump();
                match parameter_list(cursor) {
                    Some((list, close_line)) => {
                        parameters = list;
                        header_end_line = close_line;
                        cursor.take_line();
                        break;
                    }
                    None => {
                        cursor.take_line();
                        return None;
                    }
                }
            }
            TokenKind::Alphanumeric | TokenKind::Numeric => {
                modifiers.push(token.clone());
                cursor.bump();
            }
            TokenKind::MinusSign if modifiers.is_empty() => {
                batch = true;
                cursor.bump();
            }
            _ => {
                tracing::trace!(line = token.position.line, "malformed method header");
                cursor.take_line();
                return None;
            }
        }
    }

    let first = modifiers.first()?;
    if FLOW_CONTROL_KEYWORDS.iter().any(|k| first.is_keyword(k)) {
        return None;
    }
    let line = first.position.line;

    let id = modifiers.pop()?;
    let mut types = Vec::new();
    if let Some(last) = modifiers.last() {
        if !NON_TYPE_MODIFIERS.contains(&last.value.as_str()) {
            types.extend(modifiers.pop());
        }
    }

    let method = Method {
        id,
        types,
        modifiers,
        parameters,
        declarations: Vec::new(),
        line,
        end_line: line,
        documentation: None,
        prev_comment: None,
        batch,
        statements: Vec::new(),
    };
    Some((method, header_end_line))
}

/// A parameter with a single type and no name is really a bare name of
/// the default type.
fn close_parameter(mut parameter: Parameter) -> Parameter {
    if parameter.id.is_none() && parameter.types.len() == 1 {
        parameter.id = parameter.types.pop();
        parameter.types.push(Token::dummy("String"));
    }
    parameter
}

/// Parse parameters after an opening paren, up to and including the
/// matching close paren, across lines if needed.
///
/// Returns the parameters and the line of the closing paren, or `None`
/// when the list is malformed or never closed. An unindented line ends an
/// unclosed list; the cursor is then left on the newline before it.
fn parameter_list(cursor: &mut Cursor<'_>) -> Option<(Vec<Parameter>, u32)> {
    let mut parameters: Vec<Parameter> = Vec::new();
    let mut current: Option<Parameter> = None;
    let mut multi_type = false;

    while let Some(token) = cursor.peek() {
        if token.is_newline() && cursor.next_line_is_unindented() {
            tracing::trace!(line = token.position.line, "unclosed parameter list");
            return None;
        }
        cursor.bump();
        match token.kind {
            TokenKind::Space | TokenKind::Tab | TokenKind::NewLine => {}
            TokenKind::OpenParen => {
                if multi_type {
                    return None;
                }
                let parameter = current.take()?;
                current = Some(close_parameter(parameter));
                multi_type = true;
            }
            TokenKind::CloseParen if multi_type => multi_type = false,
            TokenKind::CloseParen => {
                parameters.extend(current.take().map(close_parameter));
                return Some((parameters, token.position.line));
            }
            TokenKind::Comma if multi_type => {}
            TokenKind::Comma => {
                parameters.push(close_parameter(current.take()?));
            }
            TokenKind::Alphanumeric => {
                let parameter = current.get_or_insert_with(Parameter::default);
                match token.value.as_str() {
                    "req" => {
                        parameter.req = true;
                        parameter.modifiers.push(token.clone());
                    }
                    "ret" => {
                        parameter.ret = true;
                        parameter.modifiers.push(token.clone());
                    }
                    "literal" => {
                        parameter.literal = true;
                        parameter.modifiers.push(token.clone());
                    }
                    _ if multi_type || parameter.types.is_empty() => parameter.types.push(token.clone()),
                    _ if parameter.id.is_none() => parameter.id = Some(token.clone()),
                    _ => parameter.modifiers.push(token.clone()),
                }
            }
            TokenKind::LineCommentInit => {
                let body = cursor
                    .peek()
                    .filter(|t| t.is(TokenKind::LineComment))
                    .cloned();
                if body.is_some() {
                    cursor.bump();
                }
                if let Some(last) = parameters.last_mut() {
                    last.comment = Some(body.unwrap_or_else(|| token.clone()));
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// DIRECTIVES
// ============================================================================

/// `#KEYWORD rest...` with the rest's whitespace removed.
fn directive<'t>(line: &'t [Token], keyword: &str) -> Option<Vec<&'t Token>> {
    let mut tokens = line.iter();
    if !tokens.next()?.is(TokenKind::NumberSign) {
        return None;
    }
    if !tokens.next()?.is_keyword(keyword) {
        return None;
    }
    Some(
        tokens
            .take_while(|t| !matches!(t.kind, TokenKind::LineCommentInit | TokenKind::BlockCommentInit))
            .filter(|t| !t.is_whitespace())
            .collect(),
    )
}

/// `#PROPERTYDEF name [class=Type] [modifiers...] [key=value...]`
fn property_def(line: &[Token]) -> Option<Property> {
    let rest = directive(line, "PROPERTYDEF")?;
    let mut words: Vec<Token> = Vec::new();
    let mut types = Vec::new();

    let mut i = 0;
    while i < rest.len() {
        let token = rest[i];
        let is_pair = token.is_alphanumeric()
            && rest.get(i + 1).is_some_and(|t| t.is(TokenKind::EqualSign))
            && i + 2 < rest.len();
        if is_pair {
            if token.is_keyword("class") {
                types = vec![rest[i + 2].clone()];
            }
            i += 3;
            continue;
        }
        if token.is_alphanumeric() {
            words.push(token.clone());
        }
        i += 1;
    }

    let mut words = words.into_iter();
    let id = words.next()?;
    Some(Property {
        id,
        types,
        modifiers: words.collect(),
        documentation: None,
        member_class: MemberClass::Property,
    })
}

/// `#CLASSDEF ... extends = Parent ...`
fn extends_directive(line: &[Token]) -> Option<Token> {
    let rest = directive(line, "CLASSDEF")?;
    rest.windows(3)
        .find(|w| w[0].is_keyword("extends") && w[1].is(TokenKind::EqualSign) && w[2].is_alphanumeric())
        .map(|w| w[2].clone())
}

/// `#PACKAGE a.b.c`
fn package_directive(line: &[Token]) -> Option<SmolStr> {
    let mut tokens = line.iter();
    if !tokens.next()?.is(TokenKind::NumberSign) || !tokens.next()?.is_keyword("PACKAGE") {
        return None;
    }
    let name: String = tokens
        .skip_while(|t| t.is_whitespace())
        .take_while(|t| matches!(t.kind, TokenKind::Alphanumeric | TokenKind::Numeric | TokenKind::Period))
        .map(|t| t.value.as_str())
        .collect();
    (!name.is_empty()).then(|| SmolStr::new(name))
}

/// `catch name` declares `name` as an `Error`.
fn catch_clause(rest: &[Token]) -> Option<Declaration> {
    let id = rest.iter().find(|t| !t.is_whitespace()).filter(|t| t.is_alphanumeric())?;
    Some(Declaration {
        id: id.clone(),
        types: vec![Token::dummy("Error")],
        modifiers: Vec::new(),
    })
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Parse PSL source text into a [`ParsedDocument`].
///
/// Never fails: malformed lines are skipped.
#[tracing::instrument(skip_all, fields(source_len = text.len()))]
pub fn parse_document(text: &str) -> ParsedDocument {
    let tokens = tokenize(text);
    let last_line = LineIndex::new(text).last_line();

    let mut builder = DocumentBuilder::default();
    let mut cursor = Cursor::new(&tokens);

    while let Some(token) = cursor.peek() {
        match token.kind {
            TokenKind::Alphanumeric | TokenKind::MinusSign => {
                if let Some((method, header_end_line)) = method_header(&mut cursor) {
                    builder.push_method(method, header_end_line);
                }
            }
            TokenKind::Space | TokenKind::Tab => {
                let line = cursor.take_line();
                builder.body_line(line);
            }
            TokenKind::BlockCommentInit => {
                let line = cursor.take_line();
                builder.block_comment(line);
            }
            TokenKind::LineCommentInit => {
                builder.last_line_comment = cursor
                    .take_line()
                    .iter()
                    .find(|t| t.is(TokenKind::LineComment))
                    .cloned();
            }
            TokenKind::NewLine => {
                cursor.bump();
            }
            _ => {
                tracing::trace!(line = token.position.line, "discarding unrecognized line");
                cursor.take_line();
            }
        }
    }

    let document = builder.finish(tokens, last_line);
    tracing::debug!(
        methods = document.methods.len(),
        properties = document.properties.len(),
        "parsed document"
    );
    document
}

impl ParsedDocument {
    /// Parse PSL source text. Same as [`parse_document`].
    pub fn parse(text: &str) -> Self {
        parse_document(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn test_method_header_with_return_type() {
        let doc = parse_document("public static String getName(Number id)\n\tquit id\n");
        assert_eq!(doc.methods.len(), 1);
        let method = &doc.methods[0];
        assert_eq!(method.id.value, "getName");
        assert_eq!(values(&method.types), vec!["String"]);
        assert_eq!(values(&method.modifiers), vec!["public", "static"]);
        assert_eq!(method.parameters.len(), 1);
        assert_eq!(method.parameters[0].id.as_ref().unwrap().value, "id");
        assert_eq!(values(&method.parameters[0].types), vec!["Number"]);
    }

    #[test]
    fn test_method_header_without_return_type() {
        let doc = parse_document("public run()\n");
        let method = &doc.methods[0];
        assert_eq!(method.id.value, "run");
        assert!(method.types.is_empty());
        assert_eq!(values(&method.modifiers), vec!["public"]);
        assert!(method.parameters.is_empty());
    }

    #[test]
    fn test_label_without_parens() {
        let doc = parse_document("init\n\tquit\n");
        assert_eq!(doc.methods[0].id.value, "init");
        assert!(doc.methods[0].types.is_empty());
    }

    #[test]
    fn test_flow_control_is_not_a_header() {
        let doc = parse_document("do foo()\nSET x=1\nif x quit\nreal()\n");
        let ids: Vec<_> = doc.methods.iter().map(|m| m.id.value.as_str()).collect();
        assert_eq!(ids, vec!["real"]);
    }

    #[test]
    fn test_batch_label() {
        let doc = parse_document("-exec\n\tquit\n");
        assert!(doc.methods[0].batch);
        assert_eq!(doc.methods[0].id.value, "exec");
    }

    #[test]
    fn test_parameter_flags_and_defaults() {
        let doc = parse_document("foo(req String a, ret Number b, literal c, x)\n");
        let params = &doc.methods[0].parameters;
        assert_eq!(params.len(), 4);
        assert!(params[0].req && !params[0].ret);
        assert!(params[1].ret);
        assert!(params[2].literal);
        assert_eq!(params[2].id.as_ref().unwrap().value, "c");
        assert_eq!(values(&params[2].types), vec!["String"]);
        assert!(params[2].types[0].is_dummy());
        assert_eq!(params[3].id.as_ref().unwrap().value, "x");
    }

    #[test]
    fn test_multi_type_parameter() {
        let doc = parse_document("foo(String names(Number), Date d)\n");
        let params = &doc.methods[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].id.as_ref().unwrap().value, "names");
        assert_eq!(values(&params[0].types), vec!["String", "Number"]);
        assert_eq!(params[1].id.as_ref().unwrap().value, "d");
    }

    #[test]
    fn test_multiline_parameters_with_comments() {
        let text = "foo(String a, // the a\n\tNumber b)\n\t/* docs */\n\tquit\n";
        let doc = parse_document(text);
        let method = &doc.methods[0];
        assert_eq!(method.parameters.len(), 2);
        assert_eq!(method.parameters[0].comment.as_ref().unwrap().value, " the a");
        assert_eq!(method.documentation.as_deref(), Some("docs"));
    }

    #[test]
    fn test_unclosed_parameter_list_yields_no_method() {
        let doc = parse_document("foo(String a\n");
        assert!(doc.methods.is_empty());
    }

    #[test]
    fn test_unclosed_parameter_list_stops_at_next_header() {
        let doc = parse_document("foo(String a\nbar()\n\tquit\nbaz()\n\tquit\n");
        let ids: Vec<_> = doc.methods.iter().map(|m| m.id.value.as_str()).collect();
        assert_eq!(ids, vec!["bar", "baz"]);
        assert_eq!(doc.methods[0].line, 1);
    }

    #[test]
    fn test_malformed_header_is_skipped() {
        let doc = parse_document("foo = 1\nbar()\n");
        let ids: Vec<_> = doc.methods.iter().map(|m| m.id.value.as_str()).collect();
        assert_eq!(ids, vec!["bar"]);
    }

    #[test]
    fn test_method_bounds() {
        let doc = parse_document("a()\n\tquit\n\nb()\n\tquit\n");
        assert_eq!((doc.methods[0].line, doc.methods[0].end_line), (0, 2));
        assert_eq!((doc.methods[1].line, doc.methods[1].end_line), (3, 5));
        assert_eq!(doc.method_at_line(1).unwrap().id.value, "a");
        assert_eq!(doc.method_at_line(4).unwrap().id.value, "b");
    }

    #[test]
    fn test_prev_comment() {
        let doc = parse_document("// Adds numbers\nadd(Number a, Number b)\n");
        assert_eq!(doc.methods[0].prev_comment.as_ref().unwrap().value, " Adds numbers");
    }

    #[test]
    fn test_property_def() {
        let text = "\t#PROPERTYDEF name class=String public readonly position=2\n\t/* The name. */\n\t#PROPERTYDEF count\n";
        let doc = parse_document(text);
        assert_eq!(doc.properties.len(), 2);
        let name = &doc.properties[0];
        assert_eq!(name.id.value, "name");
        assert_eq!(values(&name.types), vec!["String"]);
        assert_eq!(values(&name.modifiers), vec!["public", "readonly"]);
        assert_eq!(name.documentation.as_deref(), Some("The name."));
        assert!(doc.properties[1].types.is_empty());
        assert!(doc.properties[1].documentation.is_none());
    }

    #[test]
    fn test_doc_comment_must_be_adjacent() {
        let doc = parse_document("foo()\n\tquit\n\t/* not docs */\n");
        assert!(doc.methods[0].documentation.is_none());
    }

    #[test]
    fn test_declarations_scope() {
        let text = "\ttype String fileScoped\nfoo()\n\ttype Number a, b\n\tcatch err {\n";
        let doc = parse_document(text);
        assert_eq!(doc.declarations.len(), 1);
        assert_eq!(doc.declarations[0].id.value, "fileScoped");
        let locals: Vec<_> = doc.methods[0]
            .declarations
            .iter()
            .map(|d| (d.id.value.as_str(), d.types[0].value.as_str()))
            .collect();
        assert_eq!(locals, vec![("a", "Number"), ("b", "Number"), ("err", "Error")]);
    }

    #[test]
    fn test_statement_declarations() {
        let doc = parse_document("foo()\n\tfor type Number i=1:1:10 set x=i\n");
        let method = &doc.methods[0];
        assert_eq!(method.declarations.len(), 1);
        assert_eq!(method.declarations[0].id.value, "i");
        assert_eq!(method.statements.len(), 2);
    }

    #[test]
    fn test_class_directives() {
        let text = "\t#PACKAGE custom.core.util\n\t#CLASSDEF extends = Parent public\n\t#CLASSDEF extends = Other\n";
        let doc = parse_document(text);
        assert_eq!(doc.psl_package.as_deref(), Some("custom.core.util"));
        assert_eq!(doc.extending.as_ref().unwrap().value, "Parent");
    }

    #[test]
    fn test_comments_collected() {
        let doc = parse_document("// one\nfoo()\n\t/* two */\n\tquit // three\n");
        assert_eq!(values(&doc.comments), vec![" one", " two ", " three"]);
    }

    #[test]
    fn test_garbage_never_fails() {
        let doc = parse_document(")(*&^%$#@!\n\t\t((((\n\"unterminated\n/*");
        assert!(doc.methods.is_empty());
        assert!(!doc.tokens.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_document("");
        assert_eq!(doc, ParsedDocument::default());
    }
}
