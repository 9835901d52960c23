//! Turtle / N-Triples reader
//!
//! Reads the subset of Turtle the writers emit: `@prefix` / `@base` (and
//! their SPARQL-style spellings), prefixed names, `a`, `;` and `,` groups,
//! and quoted, numeric and boolean literals. N-Triples is a subset of that.
//! It reuses the query tokenizer.

use crate::namespace::NamespaceTable;
use crate::sparql::lexer::{tokenize, Spanned, Token};
use crate::sparql::QueryError;
use crate::term::iri::ns;
use crate::term::{Iri, Literal, Term, Triple};

/// Error raised on malformed Turtle or N-Triples input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Turtle: {0}")]
pub struct ReadError(#[from] QueryError);

/// Reads triples from a Turtle document
pub struct TurtleReader<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    namespaces: NamespaceTable,
}

impl<'a> TurtleReader<'a> {
    pub fn new(input: &'a str) -> Self {
        TurtleReader { input, tokens: Vec::new(), pos: 0, namespaces: NamespaceTable::empty() }
    }

    /// Resolve relative IRIs against `base` until the document sets its own
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.namespaces.set_base(base);
        self
    }

    /// Prefixes and base declared by the document read so far
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn read(&mut self) -> Result<Vec<Triple>, ReadError> {
        self.tokens = tokenize(self.input)?;
        self.pos = 0;

        let mut triples = Vec::new();
        while self.pos < self.tokens.len() {
            if !self.read_directive()? {
                self.read_statement(&mut triples)?;
            }
        }
        Ok(triples)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn error(&self, message: &str) -> ReadError {
        let fragment = self.tokens.get(self.pos).map(|s| &self.input[s.start..]).unwrap_or("");
        ReadError(QueryError::syntax(message, fragment))
    }

    fn expect_dot(&mut self) -> Result<(), ReadError> {
        if self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error("Expected '.'"))
        }
    }

    /// `@prefix`, `@base`, `PREFIX`, `BASE`; returns false if none is next
    fn read_directive(&mut self) -> Result<bool, ReadError> {
        let (is_prefix, needs_dot) = match self.peek() {
            Some(Token::LangTag(tag)) if tag == "prefix" => (true, true),
            Some(Token::LangTag(tag)) if tag == "base" => (false, true),
            Some(t) if t.is_keyword("PREFIX") => (true, false),
            Some(t) if t.is_keyword("BASE") => (false, false),
            _ => return Ok(false),
        };
        self.pos += 1;

        if is_prefix {
            let prefix = match self.peek() {
                Some(Token::PrefixedName { prefix, local }) if local.is_empty() => prefix.clone(),
                _ => return Err(self.error("Expected prefix name like 'ex:'")),
            };
            self.pos += 1;
            let namespace = self.read_iri_ref()?;
            self.namespaces.insert(prefix, namespace.as_str());
        } else {
            let base = self.read_iri_ref()?;
            self.namespaces.set_base(base.as_str());
        }

        if needs_dot {
            self.expect_dot()?;
        }
        Ok(true)
    }

    fn read_iri_ref(&mut self) -> Result<Iri, ReadError> {
        match self.peek() {
            Some(Token::IriRef(iri)) => {
                let iri = self.namespaces.resolve(iri);
                self.pos += 1;
                Ok(iri)
            }
            _ => Err(self.error("Expected <iri>")),
        }
    }

    fn read_iri(&mut self) -> Result<Iri, ReadError> {
        match self.peek().cloned() {
            Some(Token::IriRef(_)) => self.read_iri_ref(),
            Some(Token::PrefixedName { prefix, local }) => {
                let iri = self
                    .namespaces
                    .expand(&prefix, &local)
                    .ok_or_else(|| self.error(&format!("Unknown prefix '{}:'", prefix)))?;
                self.pos += 1;
                Ok(iri)
            }
            Some(Token::BlankNode(_)) | Some(Token::LBracket) => {
                Err(ReadError(QueryError::unsupported("blank nodes")))
            }
            _ => Err(self.error("Expected IRI")),
        }
    }

    fn read_statement(&mut self, out: &mut Vec<Triple>) -> Result<(), ReadError> {
        let subject = self.read_iri()?;
        loop {
            let predicate = match self.peek() {
                Some(Token::Ident(word)) if word == "a" => {
                    self.pos += 1;
                    ns::rdf_type()
                }
                _ => self.read_iri()?,
            };
            loop {
                let object = self.read_object()?;
                out.push(Triple::new(subject.clone(), predicate.clone(), object));
                if self.peek() != Some(&Token::Comma) {
                    break;
                }
                self.pos += 1;
            }
            if self.peek() != Some(&Token::Semicolon) {
                break;
            }
            while self.peek() == Some(&Token::Semicolon) {
                self.pos += 1;
            }
            if self.peek() == Some(&Token::Dot) {
                break;
            }
        }
        self.expect_dot()
    }

    fn read_object(&mut self) -> Result<Term, ReadError> {
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
                        Literal::typed(value, self.read_iri()?.as_str())
                    }
                    _ => Literal::plain(value),
                }
            }
            Some(Token::Integer(n)) => self.bare_literal(n, ns::XSD_INTEGER),
            Some(Token::Decimal(n)) => self.bare_literal(n, ns::XSD_DECIMAL),
            Some(Token::Double(n)) => self.bare_literal(n, ns::XSD_DOUBLE),
            Some(Token::Ident(word)) if word == "true" || word == "false" => {
                self.bare_literal(word, ns::XSD_BOOLEAN)
            }
            Some(Token::LParen) => return Err(ReadError(QueryError::unsupported("collections"))),
            _ => return Ok(Term::Iri(self.read_iri()?)),
        };
        Ok(Term::Literal(literal))
    }

    /// Unquoted numeric and boolean shorthand
    fn bare_literal(&mut self, lexical: String, datatype: &str) -> Literal {
        self.pos += 1;
        Literal::typed(lexical, datatype)
    }
}

/// Read a Turtle document
pub fn read_turtle(input: &str) -> Result<Vec<Triple>, ReadError> {
    TurtleReader::new(input).read()
}

/// Read an N-Triples document
///
/// N-Triples is line-based Turtle without prefixes, so the same reader
/// accepts it.
pub fn read_ntriples(input: &str) -> Result<Vec<Triple>, ReadError> {
    TurtleReader::new(input).read()
}
