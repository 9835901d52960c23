//! RDF/XML writer
//!
//! One top-level element per subject, named after the subject's first
//! `rdf:type` (or `rdf:Description` when it has none that can be written as a
//! qualified name). Namespaces missing from the table get generated `nsN`
//! prefixes declared on the root element.

use indexmap::IndexMap;

use super::xml::{document, XmlElement};
use super::{check_triple, SerializationError};
use crate::namespace::NamespaceTable;
use crate::term::iri::{ns, split_iri};
use crate::term::{Datatype, Iri, Term, Triple};

/// Assigns XML namespace prefixes
struct QNames<'a> {
    table: &'a NamespaceTable,
    /// namespace IRI -> prefix, in declaration order
    declared: IndexMap<String, String>,
    generated: usize,
}

impl<'a> QNames<'a> {
    fn new(table: &'a NamespaceTable) -> Self {
        let mut declared = IndexMap::new();
        declared.insert(ns::RDF.to_string(), "rdf".to_string());
        for (prefix, namespace) in table.iter() {
            if !prefix.is_empty() && !declared.contains_key(namespace) {
                declared.insert(namespace.to_string(), prefix.to_string());
            }
        }
        QNames { table, declared, generated: 0 }
    }

    /// `prefix:local` for an IRI, if its local part is a valid XML name
    fn qname(&mut self, iri: &str) -> Option<String> {
        let (namespace, local) = split_iri(iri);
        if !is_ncname(local) || namespace.is_empty() {
            return None;
        }
        if let Some(prefix) = self.declared.get(namespace) {
            return Some(format!("{}:{}", prefix, local));
        }
        let prefix = loop {
            let candidate = format!("ns{}", self.generated);
            self.generated += 1;
            if self.table.get(&candidate).is_none() {
                break candidate;
            }
        };
        self.declared.insert(namespace.to_string(), prefix.clone());
        Some(format!("{}:{}", prefix, local))
    }
}

fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn property_element(qnames: &mut QNames<'_>, predicate: &Iri, object: &Term) -> Result<XmlElement, SerializationError> {
    let name = qnames.qname(predicate.as_str()).ok_or_else(|| {
        SerializationError::Write(format!("predicate <{}> has no RDF/XML element name", predicate.as_str()))
    })?;
    let element = XmlElement::new(name);
    let element = match object {
        Term::Iri(iri) => element.attr("rdf:resource", iri.as_str()),
        Term::Literal(lit) => match lit.datatype() {
            Datatype::Plain => element.text(lit.value()),
            Datatype::Language(lang) => element.attr("xml:lang", lang.as_str()).text(lit.value()),
            Datatype::Typed(dt) => element.attr("rdf:datatype", dt.as_str()).text(lit.value()),
        },
        Term::Variable(v) => return Err(SerializationError::UnboundVariable(v.clone())),
    };
    Ok(element)
}

/// Format triples as RDF/XML
pub fn serialize(triples: &[Triple], namespaces: &NamespaceTable) -> Result<String, SerializationError> {
    let mut by_subject: IndexMap<&Iri, Vec<&Triple>> = IndexMap::new();
    for triple in triples {
        check_triple(triple)?;
        by_subject.entry(&triple.subject).or_default().push(triple);
    }

    let mut qnames = QNames::new(namespaces);
    let mut descriptions = Vec::with_capacity(by_subject.len());

    for (subject, triples) in by_subject {
        // The first nameable rdf:type becomes the element name and is not repeated
        let typed = triples.iter().enumerate().find_map(|(i, t)| {
            if t.predicate.as_str() != ns::RDF_TYPE {
                return None;
            }
            let Term::Iri(class) = &t.object else {
                return None;
            };
            qnames.qname(class.as_str()).map(|name| (i, name))
        });

        let (skip, name) = match typed {
            Some((i, name)) => (Some(i), name),
            None => (None, "rdf:Description".to_string()),
        };

        let mut element = XmlElement::new(name).attr("rdf:about", subject.as_str());
        for (i, triple) in triples.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            element.push(property_element(&mut qnames, &triple.predicate, &triple.object)?);
        }
        descriptions.push(element);
    }

    let mut root = XmlElement::new("rdf:RDF");
    for (namespace, prefix) in &qnames.declared {
        root.set_attr(format!("xmlns:{}", prefix), namespace.as_str());
    }
    for description in descriptions {
        root.push(description);
    }

    Ok(document(&root))
}
