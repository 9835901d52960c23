//! Turtle writer
//!
//! Triples are grouped by subject in first-seen order. Predicates of one
//! subject are joined with `;` and objects of one predicate with `,`. The
//! preamble always lists every prefix of the table. When the table carries a
//! base IRI, subjects beneath it are written as relative references.

use indexmap::IndexMap;

use super::{check_triple, SerializationError};
use crate::namespace::NamespaceTable;
use crate::term::iri::ns;
use crate::term::{escape_literal, Datatype, Iri, Literal, Term, Triple};

/// Formats terms against a namespace table
pub struct TurtleFormatter<'a> {
    namespaces: &'a NamespaceTable,
}

impl<'a> TurtleFormatter<'a> {
    pub fn new(namespaces: &'a NamespaceTable) -> Self {
        TurtleFormatter { namespaces }
    }

    /// Prefix-compact an IRI, or wrap it in `<...>`
    pub fn format_iri(&self, iri: &str) -> String {
        match self.namespaces.compact(iri) {
            Some(compact) => compact,
            None => format!("<{}>", iri),
        }
    }

    /// Subjects under the base become relative references
    pub fn format_subject(&self, subject: &Iri) -> String {
        if let Some(base) = self.namespaces.base() {
            if let Some(relative) = subject.relative_to(base.as_str()) {
                return format!("<{}>", relative);
            }
        }
        self.format_iri(subject.as_str())
    }

    pub fn format_predicate(&self, predicate: &Iri) -> String {
        if predicate.as_str() == ns::RDF_TYPE {
            return "a".to_string();
        }
        self.format_iri(predicate.as_str())
    }

    pub fn format_object(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.format_iri(iri.as_str()),
            Term::Literal(lit) => self.format_literal(lit),
            Term::Variable(v) => format!("?{}", v),
        }
    }

    /// Format a literal with compact datatype
    pub fn format_literal(&self, lit: &Literal) -> String {
        let value = escape_literal(lit.value());
        match lit.datatype() {
            Datatype::Plain => format!("\"{}\"", value),
            Datatype::Language(lang) => format!("\"{}\"@{}", value, lang),
            Datatype::Typed(dt) => format!("\"{}\"^^{}", value, self.format_iri(dt)),
        }
    }
}

/// Format triples as Turtle with the full prefix preamble
pub fn serialize(triples: &[Triple], namespaces: &NamespaceTable) -> Result<String, SerializationError> {
    let formatter = TurtleFormatter::new(namespaces);
    let mut output = String::new();

    if let Some(base) = namespaces.base() {
        output.push_str(&format!("@base <{}> .\n", base.as_str()));
    }
    for (prefix, namespace) in namespaces.iter() {
        output.push_str(&format!("@prefix {}: <{}> .\n", prefix, namespace));
    }

    // Group by subject, then predicate, keeping first-seen order
    let mut by_subject: IndexMap<&Iri, IndexMap<&Iri, Vec<&Term>>> = IndexMap::new();
    for triple in triples {
        check_triple(triple)?;
        by_subject
            .entry(&triple.subject)
            .or_default()
            .entry(&triple.predicate)
            .or_default()
            .push(&triple.object);
    }

    for (subject, predicates) in by_subject {
        output.push('\n');
        output.push_str(&formatter.format_subject(subject));

        let last = predicates.len() - 1;
        for (i, (predicate, objects)) in predicates.iter().enumerate() {
            let objects: Vec<String> = objects.iter().map(|o| formatter.format_object(o)).collect();
            if i == 0 {
                output.push(' ');
            } else {
                output.push_str("    ");
            }
            output.push_str(&formatter.format_predicate(predicate));
            output.push(' ');
            output.push_str(&objects.join(" , "));
            output.push_str(if i == last { " .\n" } else { " ;\n" });
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples() -> Vec<Triple> {
        let e1 = Iri::new("https://example.org/events/1");
        vec![
            Triple::new(e1.clone(), ns::rdf_type(), ns::schema("Event")),
            Triple::new(e1.clone(), ns::rdf_type(), ns::schema("SportsEvent")),
            Triple::new(e1.clone(), ns::schema("name"), Term::literal("5K \"Classic\"")),
            Triple::new(e1, ns::schema("startDate"), Term::typed_literal("2024-01-01", ns::XSD_DATE)),
            Triple::new(
                Iri::new("http://other.org/x"),
                ns::schema("url"),
                Term::iri("http://other.org/page"),
            ),
        ]
    }

    #[test]
    fn test_grouping_and_compaction() {
        let table = NamespaceTable::well_known().with_base("https://example.org/");
        let out = serialize(&triples(), &table).unwrap();

        assert!(out.starts_with("@base <https://example.org/> .\n@prefix rdf: "));
        assert!(out.contains(
            "<events/1> a schema:Event , schema:SportsEvent ;\n    schema:name \"5K \\\"Classic\\\"\" ;\n    schema:startDate \"2024-01-01\"^^xsd:date .\n"
        ));
        assert!(out.contains("<http://other.org/x> schema:url <http://other.org/page> .\n"));
    }

    #[test]
    fn test_full_preamble_regardless_of_usage() {
        let table = NamespaceTable::well_known();
        let out = serialize(&[], &table).unwrap();
        assert_eq!(out.lines().count(), table.len());
        assert!(out.contains("@prefix foaf: <http://xmlns.com/foaf/0.1/> .\n"));
    }

    #[test]
    fn test_without_base_subjects_stay_absolute() {
        let out = serialize(&triples(), &NamespaceTable::well_known()).unwrap();
        assert!(out.contains("\n<https://example.org/events/1> a "));
        assert!(!out.contains("@base"));
    }

    #[test]
    fn test_variable_object_is_an_error() {
        let triple = Triple::new(Iri::new("http://ex.org/s"), ns::schema("name"), Term::variable("n"));
        let err = serialize(&[triple], &NamespaceTable::well_known()).unwrap_err();
        assert_eq!(err, SerializationError::UnboundVariable("n".into()));
    }
}
