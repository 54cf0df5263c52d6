//! Parsed document model.
//!
//! A [`ParsedDocument`] is built once per source text by
//! [`parse_document`](super::parse_document) and is immutable afterwards.
//! Members keep their tokens rather than plain strings so that callers can
//! report source positions and compare token identity.

use smol_str::SmolStr;

use super::token::Token;

/// What kind of member a symbol is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberClass {
    Method,
    Parameter,
    Property,
    Declaration,
    /// A table column, modeled as a property without a source position.
    Column,
}

/// A method (or label) header with everything found in its body.
#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub id: Token,
    /// Index 0 is the return type, when one is declared.
    pub types: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub parameters: Vec<Parameter>,
    /// Locals declared in the body, in textual order.
    pub declarations: Vec<Declaration>,
    pub line: u32,
    pub end_line: u32,
    /// Block comment directly following the header.
    pub documentation: Option<SmolStr>,
    /// Line comment directly above the header.
    pub prev_comment: Option<Token>,
    /// Header introduced by `-` (batch section label).
    pub batch: bool,
    pub statements: Vec<Statement>,
}

impl Method {
    /// Whether `line` falls within this method's bounds.
    pub fn contains_line(&self, line: u32) -> bool {
        self.line <= line && line <= self.end_line
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Parameter {
    pub id: Option<Token>,
    pub types: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub req: bool,
    pub ret: bool,
    pub literal: bool,
    /// Line comment following the parameter.
    pub comment: Option<Token>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub id: Token,
    /// Empty unless a `class=Type` clause is present.
    pub types: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub documentation: Option<SmolStr>,
    /// [`MemberClass::Property`], or [`MemberClass::Column`] for table columns.
    pub member_class: MemberClass,
}

impl Property {
    /// A synthetic `String` property for a table column.
    pub fn column(id: impl Into<SmolStr>) -> Self {
        Self {
            id: Token::dummy(id),
            types: vec![Token::dummy("String")],
            modifiers: Vec::new(),
            documentation: None,
            member_class: MemberClass::Column,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub id: Token,
    pub types: Vec<Token>,
    pub modifiers: Vec<Token>,
}

/// One M-style command found on a body line.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub command: Token,
    pub postcondition: Vec<Token>,
    pub arguments: Vec<Token>,
    pub declarations: Vec<Declaration>,
}

/// Any member a reference can resolve to.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Method(Method),
    Parameter(Parameter),
    Property(Property),
    Declaration(Declaration),
}

impl Member {
    /// The member's name token. Parameters always have one once parsed.
    pub fn id(&self) -> Option<&Token> {
        match self {
            Member::Method(m) => Some(&m.id),
            Member::Parameter(p) => p.id.as_ref(),
            Member::Property(p) => Some(&p.id),
            Member::Declaration(d) => Some(&d.id),
        }
    }

    pub fn types(&self) -> &[Token] {
        match self {
            Member::Method(m) => &m.types,
            Member::Parameter(p) => &p.types,
            Member::Property(p) => &p.types,
            Member::Declaration(d) => &d.types,
        }
    }

    pub fn modifiers(&self) -> &[Token] {
        match self {
            Member::Method(m) => &m.modifiers,
            Member::Parameter(p) => &p.modifiers,
            Member::Property(p) => &p.modifiers,
            Member::Declaration(d) => &d.modifiers,
        }
    }

    pub fn member_class(&self) -> MemberClass {
        match self {
            Member::Method(_) => MemberClass::Method,
            Member::Parameter(_) => MemberClass::Parameter,
            Member::Property(p) => p.member_class,
            Member::Declaration(_) => MemberClass::Declaration,
        }
    }

    pub fn documentation(&self) -> Option<&str> {
        match self {
            Member::Method(m) => m.documentation.as_deref(),
            Member::Property(p) => p.documentation.as_deref(),
            Member::Parameter(_) | Member::Declaration(_) => None,
        }
    }

    /// Name of the member, or `""` for an unnamed parameter.
    pub fn name(&self) -> &str {
        self.id().map(|t| t.value.as_str()).unwrap_or("")
    }
}

/// The structure of one PSL source file.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ParsedDocument {
    /// Comment tokens (line and block bodies) in textual order.
    pub comments: Vec<Token>,
    /// File-scope locals.
    pub declarations: Vec<Declaration>,
    /// Parent class from `#CLASSDEF extends = Name`.
    pub extending: Option<Token>,
    /// Dotted name from `#PACKAGE`.
    pub psl_package: Option<SmolStr>,
    pub methods: Vec<Method>,
    pub properties: Vec<Property>,
    pub tokens: Vec<Token>,
}

impl ParsedDocument {
    /// The innermost method whose bounds contain `line`.
    ///
    /// Methods never overlap, so this is the last one starting at or
    /// before `line` if its range still covers it.
    pub fn method_at_line(&self, line: u32) -> Option<&Method> {
        self.methods.iter().rev().find(|m| m.contains_line(line))
    }

    /// Document members named `name`: properties first, then methods, each
    /// in declared order.
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Member> + 'a {
        let properties = self
            .properties
            .iter()
            .filter(move |p| p.id.value == name)
            .cloned()
            .map(Member::Property);
        let methods = self
            .methods
            .iter()
            .filter(move |m| m.id.value == name)
            .cloned()
            .map(Member::Method);
        properties.chain(methods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_property() {
        let column = Property::column("name");
        assert_eq!(column.member_class, MemberClass::Column);
        assert_eq!(column.types[0].value, "String");
        assert!(column.id.is_dummy());

        let member = Member::Property(column);
        assert_eq!(member.member_class(), MemberClass::Column);
        assert_eq!(member.name(), "name");
    }

    #[test]
    fn test_unnamed_parameter() {
        let member = Member::Parameter(Parameter::default());
        assert_eq!(member.id(), None);
        assert_eq!(member.name(), "");
        assert!(member.types().is_empty());
    }
}
