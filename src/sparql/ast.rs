//! Query AST

use std::fmt;

use regex::Regex;

use crate::namespace::NamespaceTable;
use crate::term::{Term, TriplePattern};

/// A parsed query
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub form: QueryForm,
    pub where_clause: GraphPattern,
    pub modifiers: Modifiers,
    /// The fixed prefixes plus everything the query declared
    pub namespaces: NamespaceTable,
}

impl ParsedQuery {
    /// Explicitly projected variables, empty for `SELECT *` and non-SELECT forms
    pub fn variables(&self) -> &[String] {
        match &self.form {
            QueryForm::Select { projection: Projection::Variables(vars) } => vars,
            _ => &[],
        }
    }
}

/// Query form
#[derive(Debug, Clone, PartialEq)]
pub enum QueryForm {
    Select { projection: Projection },
    Construct { template: Vec<TriplePattern> },
    Ask,
    /// IRIs and/or variables to describe; empty means `DESCRIBE *`
    Describe { resources: Vec<Term> },
}

impl QueryForm {
    pub fn name(&self) -> &'static str {
        match self {
            QueryForm::Select { .. } => "SELECT",
            QueryForm::Construct { .. } => "CONSTRUCT",
            QueryForm::Ask => "ASK",
            QueryForm::Describe { .. } => "DESCRIBE",
        }
    }
}

/// SELECT projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`, resolved at execution to every variable bound anywhere in the result
    All,
    Variables(Vec<String>),
}

/// A group of required patterns with optional blocks and filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphPattern {
    pub required: Vec<TriplePattern>,
    /// Sibling OPTIONAL blocks, matched in order; never nested further
    pub optional: Vec<GraphPattern>,
    pub filters: Vec<Expression>,
}

impl GraphPattern {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty() && self.filters.is_empty()
    }
}

/// Solution modifiers, applied as distinct → order → offset → limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifiers {
    pub distinct: bool,
    pub order_by: Vec<OrderCondition>,
    /// Already clamped to the configured maximum; an absent LIMIT is the maximum
    pub limit: usize,
    pub offset: usize,
}

impl Modifiers {
    pub fn with_limit(limit: usize) -> Self {
        Modifiers { distinct: false, order_by: Vec::new(), limit, offset: 0 }
    }
}

/// ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCondition {
    pub variable: String,
    pub ascending: bool,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        };
        f.write_str(op)
    }
}

/// FILTER expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Var(String),
    Constant(Term),
    Bound(String),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    Regex(Box<Expression>, RegexPattern),
    /// Case-insensitive substring test
    Contains(Box<Expression>, Box<Expression>),
    StrStarts(Box<Expression>, Box<Expression>),
    StrEnds(Box<Expression>, Box<Expression>),
    Str(Box<Expression>),
    Lang(Box<Expression>),
    IsIri(Box<Expression>),
    IsLiteral(Box<Expression>),
}

impl Expression {
    pub fn boxed(self) -> Box<Expression> {
        Box::new(self)
    }
}

/// A `regex()` pattern, compiled once at parse time
#[derive(Debug, Clone)]
pub struct RegexPattern {
    pub pattern: String,
    pub flags: String,
    pub regex: Regex,
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags
    }
}
