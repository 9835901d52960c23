//! JSON-LD writer
//!
//! Produces a compacted document: the namespace table becomes `@context`,
//! each subject one node object in `@graph`. Property keys and `@type`
//! values are prefix-compacted where possible.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::{check_triple, SerializationError};
use crate::namespace::NamespaceTable;
use crate::term::iri::ns;
use crate::term::{Datatype, Iri, Literal, Term, Triple};

fn compact(namespaces: &NamespaceTable, iri: &str) -> String {
    namespaces.compact(iri).unwrap_or_else(|| iri.to_string())
}

/// Format a literal as a JSON-LD value
fn literal_value(namespaces: &NamespaceTable, lit: &Literal) -> Value {
    match lit.datatype() {
        Datatype::Plain => Value::String(lit.value().to_string()),
        Datatype::Language(lang) => json!({ "@value": lit.value(), "@language": lang }),
        Datatype::Typed(dt) => {
            if dt == ns::XSD_INTEGER {
                if let Some(n) = lit.as_integer() {
                    return Value::from(n);
                }
            }
            if dt == ns::XSD_BOOLEAN && matches!(lit.value(), "true" | "false") {
                return Value::Bool(lit.value() == "true");
            }
            json!({ "@value": lit.value(), "@type": compact(namespaces, dt) })
        }
    }
}

fn object_value(namespaces: &NamespaceTable, term: &Term) -> Result<Value, SerializationError> {
    match term {
        Term::Iri(iri) => Ok(json!({ "@id": iri.as_str() })),
        Term::Literal(lit) => Ok(literal_value(namespaces, lit)),
        Term::Variable(v) => Err(SerializationError::UnboundVariable(v.clone())),
    }
}

/// Collapse a list of values into one value or an array
fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

/// Build the JSON-LD document
pub fn to_value(triples: &[Triple], namespaces: &NamespaceTable) -> Result<Value, SerializationError> {
    let mut by_subject: IndexMap<&Iri, Vec<&Triple>> = IndexMap::new();
    for triple in triples {
        check_triple(triple)?;
        by_subject.entry(&triple.subject).or_default().push(triple);
    }

    let mut graph = Vec::with_capacity(by_subject.len());
    for (subject, triples) in by_subject {
        let mut types = Vec::new();
        let mut properties: IndexMap<String, Vec<Value>> = IndexMap::new();

        for triple in triples {
            match &triple.object {
                Term::Iri(class) if triple.predicate.as_str() == ns::RDF_TYPE => {
                    types.push(Value::String(compact(namespaces, class.as_str())));
                }
                object => {
                    properties
                        .entry(compact(namespaces, triple.predicate.as_str()))
                        .or_default()
                        .push(object_value(namespaces, object)?);
                }
            }
        }

        let mut node = Map::new();
        node.insert("@id".to_string(), Value::String(subject.as_str().to_string()));
        if !types.is_empty() {
            node.insert("@type".to_string(), collapse(types));
        }
        for (key, values) in properties {
            node.insert(key, collapse(values));
        }
        graph.push(Value::Object(node));
    }

    let context: Map<String, Value> = namespaces
        .iter()
        .map(|(prefix, namespace)| (prefix.to_string(), Value::String(namespace.to_string())))
        .collect();

    Ok(json!({ "@context": context, "@graph": graph }))
}

/// Format triples as pretty-printed JSON-LD
pub fn serialize(triples: &[Triple], namespaces: &NamespaceTable) -> Result<String, SerializationError> {
    let value = to_value(triples, namespaces)?;
    let mut out = serde_json::to_string_pretty(&value).map_err(|e| SerializationError::Write(e.to_string()))?;
    out.push('\n');
    Ok(out)
}
