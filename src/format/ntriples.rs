//! N-Triples writer: one fully expanded triple per line

use super::{check_triple, SerializationError};
use crate::term::{escape_literal, Datatype, Term, Triple};

/// Format a single object term in N-Triples syntax
pub fn format_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{}>", iri.as_str()),
        Term::Literal(lit) => {
            let value = escape_literal(lit.value());
            match lit.datatype() {
                Datatype::Plain => format!("\"{}\"", value),
                Datatype::Language(lang) => format!("\"{}\"@{}", value, lang),
                Datatype::Typed(dt) => format!("\"{}\"^^<{}>", value, dt),
            }
        }
        Term::Variable(v) => format!("?{}", v),
    }
}

/// Format one triple as an N-Triples line (with trailing newline)
pub fn format_triple(triple: &Triple) -> Result<String, SerializationError> {
    check_triple(triple)?;
    Ok(format!(
        "<{}> <{}> {} .\n",
        triple.subject.as_str(),
        triple.predicate.as_str(),
        format_term(&triple.object)
    ))
}

/// Format triples as N-Triples
pub fn serialize(triples: &[Triple]) -> Result<String, SerializationError> {
    let mut output = String::new();
    for triple in triples {
        output.push_str(&format_triple(triple)?);
    }
    Ok(output)
}
