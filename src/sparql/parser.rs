//! Recursive-descent query parser
//!
//! Works on the token stream from [`super::lexer`]. Grammar, roughly:
//!
//! ```text
//! query     := prologue form modifiers
//! prologue  := ( PREFIX pname: <iri> | BASE <iri> )*
//! form      := SELECT [DISTINCT|REDUCED] ( '*' | var+ ) [WHERE] group
//!            | CONSTRUCT template [WHERE] group | CONSTRUCT WHERE group
//!            | ASK [WHERE] group
//!            | DESCRIBE ( '*' | (var|iri)+ ) [ [WHERE] group ]
//! group     := '{' ( triples | OPTIONAL group | FILTER constraint | '.' )* '}'
//! triples   := subject predicate objects ( ';' predicate objects )*
//! objects   := object ( ',' object )*
//! modifiers := ( ORDER BY cond+ | LIMIT n | OFFSET n )*
//! ```

use regex::RegexBuilder;

use super::ast::{
    CompareOp, Expression, GraphPattern, Modifiers, OrderCondition, ParsedQuery, Projection,
    QueryForm, RegexPattern,
};
use super::error::QueryError;
use super::lexer::{tokenize, Spanned, Token};
use crate::namespace::NamespaceTable;
use crate::term::iri::ns;
use crate::term::{Iri, Literal, Term, TriplePattern};

/// Upper bound on LIMIT unless configured otherwise
pub const DEFAULT_MAX_LIMIT: usize = 10_000;

/// Keywords that may start a group element but are not implemented
const UNSUPPORTED_GROUP_KEYWORDS: &[&str] = &["UNION", "MINUS", "GRAPH", "SERVICE", "BIND", "VALUES"];

const AGGREGATES: &[&str] = &["count", "sum", "avg", "min", "max", "sample", "group_concat"];

/// SPARQL parser
pub struct SparqlParser<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    namespaces: NamespaceTable,
    max_limit: usize,
}

impl<'a> SparqlParser<'a> {
    /// Create a parser seeded with the well-known prefixes
    pub fn new(input: &'a str) -> Self {
        SparqlParser {
            input,
            tokens: Vec::new(),
            pos: 0,
            namespaces: NamespaceTable::well_known(),
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Start from a different namespace table (configured prefixes, base IRI)
    pub fn with_namespaces(mut self, namespaces: NamespaceTable) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Parse a query
    pub fn parse(&mut self) -> Result<ParsedQuery, QueryError> {
        self.tokens = tokenize(self.input)?;
        self.pos = 0;

        self.parse_prologue()?;

        let mut modifiers = Modifiers::with_limit(self.max_limit);
        let (form, where_clause) = if self.try_keyword("SELECT") {
            self.parse_select(&mut modifiers)?
        } else if self.try_keyword("CONSTRUCT") {
            self.parse_construct()?
        } else if self.try_keyword("ASK") {
            self.skip_keyword("WHERE");
            (QueryForm::Ask, self.parse_group(false)?)
        } else if self.try_keyword("DESCRIBE") {
            self.parse_describe()?
        } else {
            return Err(self.error("Expected SELECT, CONSTRUCT, ASK or DESCRIBE"));
        };

        self.parse_modifiers(&mut modifiers)?;

        if let Some(token) = self.peek() {
            if token.is_keyword("VALUES") {
                return Err(QueryError::unsupported("VALUES"));
            }
            return Err(self.error("Unexpected trailing input"));
        }

        Ok(ParsedQuery {
            form,
            where_clause,
            modifiers,
            namespaces: self.namespaces.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, message: &str) -> Result<(), QueryError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_keyword(&mut self, keyword: &str) {
        self.try_keyword(keyword);
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), QueryError> {
        if self.try_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {}", keyword)))
        }
    }

    /// Query text from the current token onwards
    fn fragment(&self) -> &'a str {
        match self.tokens.get(self.pos) {
            Some(spanned) => &self.input[spanned.start..],
            None => "",
        }
    }

    fn error(&self, message: &str) -> QueryError {
        QueryError::syntax(message, self.fragment())
    }

    // ------------------------------------------------------------------
    // Prologue and query forms
    // ------------------------------------------------------------------

    fn parse_prologue(&mut self) -> Result<(), QueryError> {
        loop {
            if self.try_keyword("PREFIX") {
                let prefix = match self.advance() {
                    Some(Token::PrefixedName { prefix, local }) if local.is_empty() => prefix,
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        return Err(self.error("Expected prefix name like 'ex:'"));
                    }
                };
                let namespace = match self.advance() {
                    Some(Token::IriRef(iri)) => self.namespaces.resolve(&iri),
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        return Err(self.error("Expected <iri> after PREFIX"));
                    }
                };
                self.namespaces.insert(prefix, namespace.as_str());
            } else if self.try_keyword("BASE") {
                match self.advance() {
                    Some(Token::IriRef(iri)) => {
                        let base = self.namespaces.resolve(&iri);
                        self.namespaces.set_base(base.as_str());
                    }
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        return Err(self.error("Expected <iri> after BASE"));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_select(
        &mut self,
        modifiers: &mut Modifiers,
    ) -> Result<(QueryForm, GraphPattern), QueryError> {
        if self.try_keyword("DISTINCT") {
            modifiers.distinct = true;
        } else {
            self.skip_keyword("REDUCED");
        }

        let projection = if self.eat(&Token::Star) {
            Projection::All
        } else {
            let mut vars = Vec::new();
            loop {
                match self.peek() {
                    Some(Token::Variable(v)) => {
                        if !vars.contains(v) {
                            vars.push(v.clone());
                        }
                        self.pos += 1;
                    }
                    Some(Token::LParen) => {
                        let is_aggregate = matches!(
                            self.peek_nth(1),
                            Some(Token::Ident(f)) if AGGREGATES.contains(&f.to_lowercase().as_str())
                        );
                        return Err(QueryError::unsupported(if is_aggregate {
                            "aggregate functions"
                        } else {
                            "projection expressions"
                        }));
                    }
                    _ => break,
                }
            }
            if vars.is_empty() {
                return Err(self.error("Expected variables or '*' after SELECT"));
            }
            Projection::Variables(vars)
        };

        self.reject_dataset_clause()?;
        self.skip_keyword("WHERE");
        let where_clause = self.parse_group(false)?;
        Ok((QueryForm::Select { projection }, where_clause))
    }

    fn parse_construct(&mut self) -> Result<(QueryForm, GraphPattern), QueryError> {
        // CONSTRUCT WHERE { ... } uses the pattern itself as the template
        if self.try_keyword("WHERE") {
            let where_clause = self.parse_group(false)?;
            if !where_clause.optional.is_empty() || !where_clause.filters.is_empty() {
                return Err(self.error("CONSTRUCT WHERE allows only triple patterns"));
            }
            let template = where_clause.required.clone();
            return Ok((QueryForm::Construct { template }, where_clause));
        }

        let template = self.parse_template()?;
        self.reject_dataset_clause()?;
        if !self.try_keyword("WHERE") {
            return Err(self.error("Expected WHERE after CONSTRUCT template"));
        }
        let where_clause = self.parse_group(false)?;
        Ok((QueryForm::Construct { template }, where_clause))
    }

    fn parse_describe(&mut self) -> Result<(QueryForm, GraphPattern), QueryError> {
        let mut resources = Vec::new();
        if !self.eat(&Token::Star) {
            loop {
                match self.peek() {
                    Some(Token::Variable(v)) => {
                        resources.push(Term::variable(v.clone()));
                        self.pos += 1;
                    }
                    Some(Token::IriRef(_)) | Some(Token::PrefixedName { .. }) => {
                        resources.push(Term::Iri(self.parse_iri()?));
                    }
                    _ => break,
                }
            }
            if resources.is_empty() {
                return Err(self.error("Expected IRIs, variables or '*' after DESCRIBE"));
            }
        }

        self.reject_dataset_clause()?;
        let has_where = self.try_keyword("WHERE");
        let where_clause = if has_where || self.peek() == Some(&Token::LBrace) {
            self.parse_group(false)?
        } else {
            GraphPattern::default()
        };
        Ok((QueryForm::Describe { resources }, where_clause))
    }

    fn reject_dataset_clause(&self) -> Result<(), QueryError> {
        if self.peek().is_some_and(|t| t.is_keyword("FROM")) {
            return Err(QueryError::unsupported("dataset clauses (FROM)"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Graph patterns
    // ------------------------------------------------------------------

    fn parse_group(&mut self, in_optional: bool) -> Result<GraphPattern, QueryError> {
        self.expect(&Token::LBrace, "Expected '{'")?;
        let mut group = GraphPattern::default();

        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(self.error("Expected '}'"));
            };
            match token {
                Token::RBrace => {
                    self.pos += 1;
                    return Ok(group);
                }
                Token::Dot => {
                    self.pos += 1;
                }
                Token::LBrace => {
                    return Err(QueryError::unsupported("nested group patterns and UNION"));
                }
                ref t if t.is_keyword("OPTIONAL") => {
                    if in_optional {
                        return Err(QueryError::unsupported("nested OPTIONAL blocks"));
                    }
                    self.pos += 1;
                    group.optional.push(self.parse_group(true)?);
                }
                ref t if t.is_keyword("FILTER") => {
                    self.pos += 1;
                    group.filters.push(self.parse_constraint()?);
                }
                Token::Ident(ref word)
                    if UNSUPPORTED_GROUP_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word)) =>
                {
                    return Err(QueryError::unsupported(word.to_uppercase()));
                }
                _ => self.parse_triples(&mut group.required)?,
            }
        }
    }

    fn parse_template(&mut self) -> Result<Vec<TriplePattern>, QueryError> {
        self.expect(&Token::LBrace, "Expected '{' to open CONSTRUCT template")?;
        let mut template = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(template);
                }
                Some(Token::Dot) => self.pos += 1,
                Some(_) => self.parse_triples(&mut template)?,
                None => return Err(self.error("Expected '}' to close CONSTRUCT template")),
            }
        }
    }

    /// One statement: a subject with its predicate-object list
    fn parse_triples(&mut self, out: &mut Vec<TriplePattern>) -> Result<(), QueryError> {
        let subject = self.parse_subject()?;

        loop {
            let predicate = self.parse_predicate()?;
            self.reject_path_operator()?;

            loop {
                let object = self.parse_object()?;
                out.push(TriplePattern::new(subject.clone(), predicate.clone(), object));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }

            if !self.eat(&Token::Semicolon) {
                break;
            }
            while self.eat(&Token::Semicolon) {}
            if self.at_statement_end() {
                break;
            }
        }

        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                Ok(())
            }
            _ if self.at_statement_end() => Ok(()),
            _ => Err(self.error("Expected '.' or '}' after triple pattern")),
        }
    }

    fn at_statement_end(&self) -> bool {
        match self.peek() {
            None | Some(Token::Dot) | Some(Token::RBrace) => true,
            Some(t) => {
                t.is_keyword("OPTIONAL")
                    || t.is_keyword("FILTER")
                    || UNSUPPORTED_GROUP_KEYWORDS.iter().any(|k| t.is_keyword(k))
            }
        }
    }

    fn parse_subject(&mut self) -> Result<Term, QueryError> {
        match self.peek() {
            Some(Token::Variable(v)) => {
                let term = Term::variable(v.clone());
                self.pos += 1;
                Ok(term)
            }
            Some(Token::IriRef(_)) | Some(Token::PrefixedName { .. }) => Ok(Term::Iri(self.parse_iri()?)),
            Some(Token::BlankNode(_)) | Some(Token::LBracket) => Err(QueryError::unsupported("blank nodes")),
            Some(Token::String(_) | Token::Integer(_) | Token::Decimal(_) | Token::Double(_)) => {
                Err(self.error("Literal not allowed in subject position"))
            }
            _ => Err(self.error("Expected subject")),
        }
    }

    fn parse_predicate(&mut self) -> Result<Term, QueryError> {
        match self.peek() {
            Some(Token::Variable(v)) => {
                let term = Term::variable(v.clone());
                self.pos += 1;
                Ok(term)
            }
            Some(Token::Ident(word)) if word == "a" => {
                self.pos += 1;
                Ok(Term::Iri(ns::rdf_type()))
            }
            Some(Token::IriRef(_)) | Some(Token::PrefixedName { .. }) => Ok(Term::Iri(self.parse_iri()?)),
            Some(Token::Caret) | Some(Token::Bang) | Some(Token::LParen) => {
                Err(QueryError::unsupported("property paths"))
            }
            _ => Err(self.error("Expected predicate")),
        }
    }

    fn reject_path_operator(&self) -> Result<(), QueryError> {
        match self.peek() {
            Some(Token::Slash | Token::Pipe | Token::Star | Token::Plus | Token::Question) => {
                Err(QueryError::unsupported("property paths"))
            }
            _ => Ok(()),
        }
    }

    fn parse_object(&mut self) -> Result<Term, QueryError> {
        match self.peek() {
            Some(Token::Variable(v)) => {
                let term = Term::variable(v.clone());
                self.pos += 1;
                Ok(term)
            }
            Some(Token::IriRef(_)) | Some(Token::PrefixedName { .. }) => Ok(Term::Iri(self.parse_iri()?)),
            Some(Token::BlankNode(_)) | Some(Token::LBracket) => Err(QueryError::unsupported("blank nodes")),
            Some(Token::LParen) => Err(QueryError::unsupported("RDF collections")),
            _ => match self.parse_literal()? {
                Some(literal) => Ok(Term::Literal(literal)),
                None => Err(self.error("Expected object")),
            },
        }
    }

    fn parse_iri(&mut self) -> Result<Iri, QueryError> {
        match self.peek().cloned() {
            Some(Token::IriRef(iri)) => {
                self.pos += 1;
                Ok(self.namespaces.resolve(&iri))
            }
            Some(Token::PrefixedName { prefix, local }) => {
                let iri = self
                    .namespaces
                    .expand(&prefix, &local)
                    .ok_or_else(|| self.error(&format!("Unknown prefix '{}:'", prefix)))?;
                self.pos += 1;
                Ok(iri)
            }
            _ => Err(self.error("Expected IRI")),
        }
    }

    /// Quoted string (with optional `@lang` or `^^datatype`), number or boolean
    fn parse_literal(&mut self) -> Result<Option<Literal>, QueryError> {
        let literal = match self.peek().cloned() {
            Some(Token::String(value)) => {
                self.pos += 1;
                match self.peek().cloned() {
                    Some(Token::LangTag(tag)) => {
                        self.pos += 1;
                        Literal::with_language(value, tag)
                    }
                    Some(Token::DoubleCaret) => {
                        self.pos += 1;
                        let datatype = self.parse_iri()?;
                        Literal::typed(value, datatype.as_str())
                    }
                    _ => Literal::plain(value),
                }
            }
            Some(Token::Integer(n)) => {
                self.pos += 1;
                Literal::typed(n, ns::XSD_INTEGER)
            }
            Some(Token::Decimal(n)) => {
                self.pos += 1;
                Literal::typed(n, ns::XSD_DECIMAL)
            }
            Some(Token::Double(n)) => {
                self.pos += 1;
                Literal::typed(n, ns::XSD_DOUBLE)
            }
            Some(Token::Ident(word)) if word == "true" || word == "false" => {
                self.pos += 1;
                Literal::typed(word, ns::XSD_BOOLEAN)
            }
            _ => return Ok(None),
        };
        Ok(Some(literal))
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    fn parse_constraint(&mut self) -> Result<Expression, QueryError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect(&Token::RParen, "Expected ')' to close FILTER")?;
                Ok(expr)
            }
            Some(t) if t.is_keyword("NOT") || t.is_keyword("EXISTS") => {
                Err(QueryError::unsupported("EXISTS filters"))
            }
            Some(Token::Ident(_)) => self.parse_call(),
            _ => Err(self.error("Expected '(' after FILTER")),
        }
    }

    fn parse_or(&mut self) -> Result<Expression, QueryError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expression::Or(left.boxed(), right.boxed());
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, QueryError> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_unary()?;
            left = Expression::And(left.boxed(), right.boxed());
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, QueryError> {
        if self.eat(&Token::Bang) {
            return Ok(Expression::Not(self.parse_unary()?.boxed()));
        }
        self.parse_relational()
    }

    fn parse_relational(&mut self) -> Result<Expression, QueryError> {
        let left = self.parse_primary()?;
        self.reject_arithmetic()?;

        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::NotEq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Ge) => CompareOp::Ge,
            Some(t) if t.is_keyword("IN") || t.is_keyword("NOT") => {
                return Err(QueryError::unsupported("IN expressions"));
            }
            _ => return Ok(left),
        };
        self.pos += 1;

        let right = self.parse_primary()?;
        self.reject_arithmetic()?;
        Ok(Expression::Compare(op, left.boxed(), right.boxed()))
    }

    fn reject_arithmetic(&self) -> Result<(), QueryError> {
        match self.peek() {
            Some(Token::Plus | Token::Minus | Token::Star | Token::Slash) => {
                Err(QueryError::unsupported("arithmetic expressions"))
            }
            _ => Ok(()),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, QueryError> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect(&Token::RParen, "Expected ')'")?;
                Ok(expr)
            }
            Some(Token::Variable(v)) => {
                self.pos += 1;
                Ok(Expression::Var(v))
            }
            Some(Token::IriRef(_)) | Some(Token::PrefixedName { .. }) => {
                Ok(Expression::Constant(Term::Iri(self.parse_iri()?)))
            }
            Some(Token::Ident(word)) if word != "true" && word != "false" => self.parse_call(),
            _ => match self.parse_literal()? {
                Some(literal) => Ok(Expression::Constant(Term::Literal(literal))),
                None => Err(self.error("Expected expression")),
            },
        }
    }

    fn parse_call(&mut self) -> Result<Expression, QueryError> {
        let name = match self.advance() {
            Some(Token::Ident(name)) => name.to_lowercase(),
            _ => return Err(self.error("Expected function call")),
        };

        if AGGREGATES.contains(&name.as_str()) {
            return Err(QueryError::unsupported("aggregate functions"));
        }
        if name == "exists" || name == "not" {
            return Err(QueryError::unsupported("EXISTS filters"));
        }

        self.expect(&Token::LParen, &format!("Expected '(' after {}", name))?;
        let expr = match name.as_str() {
            "bound" => match self.advance() {
                Some(Token::Variable(v)) => Expression::Bound(v),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error("bound() takes a variable"));
                }
            },
            "regex" => {
                let target = self.parse_or()?;
                self.expect(&Token::Comma, "Expected ',' in regex()")?;
                let pattern = self.parse_string_arg("regex() pattern must be a string")?;
                let flags = if self.eat(&Token::Comma) {
                    self.parse_string_arg("regex() flags must be a string")?
                } else {
                    String::new()
                };
                Expression::Regex(target.boxed(), self.compile_regex(pattern, flags)?)
            }
            "contains" | "strstarts" | "strends" => {
                let left = self.parse_or()?;
                self.expect(&Token::Comma, &format!("Expected ',' in {}()", name))?;
                let right = self.parse_or()?;
                match name.as_str() {
                    "contains" => Expression::Contains(left.boxed(), right.boxed()),
                    "strstarts" => Expression::StrStarts(left.boxed(), right.boxed()),
                    _ => Expression::StrEnds(left.boxed(), right.boxed()),
                }
            }
            "str" | "lang" | "isiri" | "isuri" | "isliteral" => {
                let arg = self.parse_or()?.boxed();
                match name.as_str() {
                    "str" => Expression::Str(arg),
                    "lang" => Expression::Lang(arg),
                    "isliteral" => Expression::IsLiteral(arg),
                    _ => Expression::IsIri(arg),
                }
            }
            other => return Err(QueryError::unsupported(format!("function {}()", other))),
        };
        self.expect(&Token::RParen, &format!("Expected ')' to close {}()", name))?;
        Ok(expr)
    }

    fn parse_string_arg(&mut self, message: &str) -> Result<String, QueryError> {
        match self.peek().cloned() {
            Some(Token::String(s)) => {
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.error(message)),
        }
    }

    fn compile_regex(&self, pattern: String, flags: String) -> Result<RegexPattern, QueryError> {
        if let Some(bad) = flags.chars().find(|c| !matches!(c, 'i' | 's' | 'm' | 'x')) {
            return Err(self.error(&format!("Unknown regex flag '{}'", bad)));
        }
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains('i'))
            .dot_matches_new_line(flags.contains('s'))
            .multi_line(flags.contains('m'))
            .ignore_whitespace(flags.contains('x'))
            .build()
            .map_err(|e| self.error(&format!("Invalid regex: {}", e)))?;
        Ok(RegexPattern { pattern, flags, regex })
    }

    // ------------------------------------------------------------------
    // Solution modifiers
    // ------------------------------------------------------------------

    fn parse_modifiers(&mut self, modifiers: &mut Modifiers) -> Result<(), QueryError> {
        loop {
            if self.peek().is_some_and(|t| t.is_keyword("GROUP")) {
                return Err(QueryError::unsupported("GROUP BY"));
            }
            if self.peek().is_some_and(|t| t.is_keyword("HAVING")) {
                return Err(QueryError::unsupported("HAVING"));
            }

            if self.try_keyword("ORDER") {
                self.expect_keyword("BY")?;
                self.parse_order_conditions(&mut modifiers.order_by)?;
            } else if self.try_keyword("LIMIT") {
                modifiers.limit = self.parse_count("LIMIT")?.min(self.max_limit);
            } else if self.try_keyword("OFFSET") {
                modifiers.offset = self.parse_count("OFFSET")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_order_conditions(&mut self, out: &mut Vec<OrderCondition>) -> Result<(), QueryError> {
        let start = out.len();
        loop {
            match self.peek().cloned() {
                Some(Token::Variable(variable)) => {
                    self.pos += 1;
                    out.push(OrderCondition { variable, ascending: true });
                }
                Some(ref t) if t.is_keyword("ASC") || t.is_keyword("DESC") => {
                    let ascending = t.is_keyword("ASC");
                    self.pos += 1;
                    self.expect(&Token::LParen, "Expected '(' after ASC/DESC")?;
                    let variable = match self.advance() {
                        Some(Token::Variable(v)) => v,
                        _ => {
                            self.pos = self.pos.saturating_sub(1);
                            return Err(self.error("ORDER BY supports variables only"));
                        }
                    };
                    self.expect(&Token::RParen, "Expected ')'")?;
                    out.push(OrderCondition { variable, ascending });
                }
                Some(Token::LParen) => return Err(QueryError::unsupported("ORDER BY expressions")),
                _ => break,
            }
        }
        if out.len() == start {
            return Err(self.error("Expected ORDER BY condition"));
        }
        Ok(())
    }

    fn parse_count(&mut self, clause: &str) -> Result<usize, QueryError> {
        match self.peek().cloned() {
            Some(Token::Integer(n)) if !n.starts_with('-') => {
                self.pos += 1;
                // Values too large for usize saturate and get clamped by the caller
                Ok(n.trim_start_matches('+').parse().unwrap_or(usize::MAX))
            }
            _ => Err(self.error(&format!("{} expects a non-negative integer", clause))),
        }
    }
}

/// Parse with the well-known prefixes and the default LIMIT ceiling
pub fn parse_query(input: &str) -> Result<ParsedQuery, QueryError> {
    SparqlParser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(q: &str) -> ParsedQuery {
        parse_query(q).unwrap()
    }

    #[test]
    fn test_parse_simple_select() {
        let query = parse("SELECT ?s ?p ?o WHERE { ?s ?p ?o }");
        assert_eq!(query.variables(), ["s", "p", "o"]);
        assert_eq!(query.where_clause.required.len(), 1);
        assert_eq!(query.modifiers.limit, DEFAULT_MAX_LIMIT);
    }

    #[test]
    fn test_parse_select_with_prefix() {
        let query = parse("PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:name ?o }");
        let pattern = &query.where_clause.required[0];
        assert_eq!(pattern.predicate, Term::iri("http://example.org/name"));
        assert_eq!(query.namespaces.get("ex"), Some("http://example.org/"));
    }

    #[test]
    fn test_base_resolves_relative_iris() {
        let query = parse("BASE <https://example.org/> SELECT ?p WHERE { <events/1> ?p ?o }");
        assert_eq!(
            query.where_clause.required[0].subject,
            Term::iri("https://example.org/events/1")
        );
    }

    #[test]
    fn test_semicolon_and_comma_groups() {
        let query = parse(
            "SELECT * WHERE { ?e a schema:Event ; schema:name ?n , ?m ; schema:startDate ?d . }",
        );
        let required = &query.where_clause.required;
        assert_eq!(required.len(), 4);
        assert!(required.iter().all(|p| p.subject == Term::variable("e")));
        assert_eq!(required[0].predicate, Term::iri(ns::RDF_TYPE));
        assert_eq!(required[2].object, Term::variable("m"));
        assert_eq!(query.form, QueryForm::Select { projection: Projection::All });
    }

    #[test]
    fn test_delimiters_inside_literals() {
        let query = parse(r#"SELECT ?e WHERE { ?e schema:name "St. Paul; MN" . ?e a schema:Event }"#);
        assert_eq!(query.where_clause.required.len(), 2);
        assert_eq!(query.where_clause.required[0].object, Term::literal("St. Paul; MN"));
    }

    #[test]
    fn test_literal_forms() {
        let query = parse(
            r#"SELECT * WHERE { ?s ?p "x"@EN , "5"^^xsd:integer , 42 , 4.5 , true }"#,
        );
        let objects: Vec<_> = query.where_clause.required.iter().map(|p| p.object.clone()).collect();
        assert_eq!(objects[0], Term::lang_literal("x", "en"));
        assert_eq!(objects[1], Term::typed_literal("5", ns::XSD_INTEGER));
        assert_eq!(objects[2], Term::typed_literal("42", ns::XSD_INTEGER));
        assert_eq!(objects[3], Term::typed_literal("4.5", ns::XSD_DECIMAL));
        assert_eq!(objects[4], Term::typed_literal("true", ns::XSD_BOOLEAN));
    }

    #[test]
    fn test_optional_and_filter_extraction() {
        let query = parse(
            "SELECT ?s ?d WHERE { ?s a schema:Event . OPTIONAL { ?s schema:startDate ?d FILTER(?d > \"2020\") } FILTER(bound(?s)) }",
        );
        let clause = &query.where_clause;
        assert_eq!(clause.required.len(), 1);
        assert_eq!(clause.optional.len(), 1);
        assert_eq!(clause.optional[0].required.len(), 1);
        assert_eq!(clause.optional[0].filters.len(), 1);
        assert_eq!(clause.filters, vec![Expression::Bound("s".into())]);
    }

    #[test]
    fn test_sibling_optionals() {
        let query = parse(
            "SELECT * WHERE { ?s a schema:Event OPTIONAL { ?s schema:name ?n } OPTIONAL { ?s schema:location ?l } }",
        );
        assert_eq!(query.where_clause.optional.len(), 2);
    }

    #[test]
    fn test_nested_optional_is_unsupported() {
        let err = parse_query("SELECT * WHERE { ?s ?p ?o OPTIONAL { ?s ?q ?r OPTIONAL { ?r ?x ?y } } }")
            .unwrap_err();
        assert!(matches!(err, QueryError::Unsupported { .. }));
    }

    #[test]
    fn test_modifiers() {
        let query = parse(
            "SELECT DISTINCT ?n WHERE { ?e schema:name ?n } ORDER BY DESC(?n) ?e LIMIT 5 OFFSET 2",
        );
        let m = &query.modifiers;
        assert!(m.distinct);
        assert_eq!(
            m.order_by,
            vec![
                OrderCondition { variable: "n".into(), ascending: false },
                OrderCondition { variable: "e".into(), ascending: true },
            ]
        );
        assert_eq!(m.limit, 5);
        assert_eq!(m.offset, 2);
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = parse("SELECT * WHERE { ?s ?p ?o } LIMIT 99999999");
        assert_eq!(query.modifiers.limit, DEFAULT_MAX_LIMIT);

        let query = SparqlParser::new("SELECT * WHERE { ?s ?p ?o } LIMIT 50")
            .with_max_limit(20)
            .parse()
            .unwrap();
        assert_eq!(query.modifiers.limit, 20);
    }

    #[test]
    fn test_parse_ask_and_construct() {
        let ask = parse("ASK { ?s a schema:Event }");
        assert_eq!(ask.form, QueryForm::Ask);

        let construct = parse("CONSTRUCT { ?s schema:name ?n } WHERE { ?s schema:name ?n }");
        match construct.form {
            QueryForm::Construct { template } => assert_eq!(template.len(), 1),
            other => panic!("unexpected form {:?}", other),
        }

        let short = parse("CONSTRUCT WHERE { ?s schema:name ?n }");
        assert!(matches!(short.form, QueryForm::Construct { ref template } if template.len() == 1));
    }

    #[test]
    fn test_parse_describe() {
        let query = parse("DESCRIBE <http://example.org/a> ?x WHERE { ?x a schema:Person }");
        match &query.form {
            QueryForm::Describe { resources } => {
                assert_eq!(resources[0], Term::iri("http://example.org/a"));
                assert_eq!(resources[1], Term::variable("x"));
            }
            other => panic!("unexpected form {:?}", other),
        }

        let bare = parse("DESCRIBE <http://example.org/a>");
        assert!(bare.where_clause.is_empty());
    }

    #[test]
    fn test_filter_expressions() {
        let query = parse(
            r#"SELECT * WHERE { ?s ?p ?o FILTER(regex(?o, "^5k", "i") && !contains(?o, "trail") || ?o >= 10) }"#,
        );
        match &query.where_clause.filters[0] {
            Expression::Or(left, right) => {
                assert!(matches!(**left, Expression::And(..)));
                assert!(matches!(**right, Expression::Compare(CompareOp::Ge, ..)));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_filter_comparisons_without_spaces() {
        let query = parse("SELECT ?n WHERE { ?e race:age ?n FILTER(?n<40&&?n>18) }");
        match &query.where_clause.filters[0] {
            Expression::And(left, right) => {
                assert!(matches!(**left, Expression::Compare(CompareOp::Lt, ..)));
                assert!(matches!(**right, Expression::Compare(CompareOp::Gt, ..)));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_filter_without_parentheses() {
        let query = parse(r#"SELECT * WHERE { ?s ?p ?o FILTER regex(?o, "x") }"#);
        assert!(matches!(query.where_clause.filters[0], Expression::Regex(..)));
    }

    #[test]
    fn test_syntax_errors_carry_fragment() {
        let err = parse_query("SELECT ?s WHERE { ?s ?p }").unwrap_err();
        match err {
            QueryError::Syntax { fragment, .. } => assert_eq!(fragment, "}"),
            other => panic!("expected syntax error, got {:?}", other),
        }

        assert!(matches!(parse_query("FETCH ?x"), Err(QueryError::Syntax { .. })));
        assert!(matches!(parse_query(""), Err(QueryError::Syntax { .. })));
        assert!(matches!(parse_query("SELECT WHERE { ?s ?p ?o }"), Err(QueryError::Syntax { .. })));
        assert!(matches!(parse_query("SELECT ?s WHERE { ?s ?p ?o"), Err(QueryError::Syntax { .. })));
        assert!(matches!(
            parse_query("SELECT ?s WHERE { ?s nope:p ?o }"),
            Err(QueryError::Syntax { .. })
        ));
        assert!(matches!(
            parse_query("SELECT ?s WHERE { ?s ?p ?o } LIMIT -1"),
            Err(QueryError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unsupported_features() {
        let cases = [
            "SELECT ?x WHERE { ?s ex:a/ex:b ?x }",
            "SELECT ?x WHERE { ?s schema:knows+ ?x }",
            "SELECT ?x WHERE { { ?s ?p ?x } UNION { ?x ?p ?s } }",
            "SELECT (COUNT(?s) AS ?n) WHERE { ?s ?p ?o }",
            "SELECT ?s WHERE { ?s ?p ?o } GROUP BY ?s",
            "SELECT ?s WHERE { _:b ?p ?o }",
            "SELECT ?s WHERE { ?s ?p ?o BIND(?o AS ?x) }",
        ];
        for q in cases {
            let q = format!("PREFIX ex: <http://example.org/> {}", q);
            assert!(
                matches!(parse_query(&q), Err(QueryError::Unsupported { .. })),
                "expected unsupported: {}",
                q
            );
        }
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let query = parse("select distinct ?s where { ?s a schema:Event } order by ?s limit 3");
        assert!(query.modifiers.distinct);
        assert_eq!(query.modifiers.limit, 3);
    }
}
