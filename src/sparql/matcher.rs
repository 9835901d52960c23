//! Pattern matching and joins
//!
//! Required patterns are joined with a nested loop: for each pattern, every
//! binding so far is substituted into it and the whole store is scanned. Each
//! OPTIONAL block is then matched per outer binding. Its extensions replace the
//! binding, or the binding is kept unchanged when there are none. Group filters
//! run last, so they see variables bound by the optionals.

use super::ast::GraphPattern;
use super::filter;
use crate::store::TripleStore;
use crate::term::{Binding, Term, Triple, TriplePattern};

/// Evaluate a graph pattern, starting from a single empty binding
pub fn evaluate(pattern: &GraphPattern, store: &TripleStore) -> Vec<Binding> {
    evaluate_from(pattern, store, vec![Binding::new()])
}

/// Evaluate a graph pattern, extending the given bindings
pub fn evaluate_from(pattern: &GraphPattern, store: &TripleStore, seed: Vec<Binding>) -> Vec<Binding> {
    let mut solutions = seed;

    for triple_pattern in &pattern.required {
        solutions = join(triple_pattern, store, solutions);
        if solutions.is_empty() {
            return solutions;
        }
    }

    for optional in &pattern.optional {
        solutions = left_join(optional, store, solutions);
    }

    solutions.retain(|binding| filter::passes_all(&pattern.filters, binding));
    solutions
}

/// Extend every binding with each triple that matches the pattern
fn join(pattern: &TriplePattern, store: &TripleStore, solutions: Vec<Binding>) -> Vec<Binding> {
    let mut next = Vec::new();
    for binding in &solutions {
        let substituted = pattern.substitute(binding);
        for triple in store.iter() {
            if let Some(extended) = match_triple(&substituted, triple, binding) {
                next.push(extended);
            }
        }
    }
    next
}

/// Keep each outer binding whose optional block yields nothing
fn left_join(optional: &GraphPattern, store: &TripleStore, solutions: Vec<Binding>) -> Vec<Binding> {
    let mut next = Vec::with_capacity(solutions.len());
    for binding in solutions {
        let extensions = evaluate_from(optional, store, vec![binding.clone()]);
        if extensions.is_empty() {
            next.push(binding);
        } else {
            next.extend(extensions);
        }
    }
    next
}

/// Try to match one pattern against one triple, extending `binding`
pub fn match_triple(pattern: &TriplePattern, triple: &Triple, binding: &Binding) -> Option<Binding> {
    let mut extended = binding.clone();
    let subject = Term::Iri(triple.subject.clone());
    let predicate = Term::Iri(triple.predicate.clone());

    if !match_term(&pattern.subject, &subject, &mut extended) {
        return None;
    }
    if !match_term(&pattern.predicate, &predicate, &mut extended) {
        return None;
    }
    if !match_term(&pattern.object, &triple.object, &mut extended) {
        return None;
    }
    Some(extended)
}

/// A free variable binds to anything; a repeated variable must agree
fn match_term(pattern: &Term, value: &Term, binding: &mut Binding) -> bool {
    match pattern {
        Term::Variable(name) => match binding.get(name) {
            Some(existing) => existing == value,
            None => {
                binding.insert(name.clone(), value.clone());
                true
            }
        },
        _ => pattern == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::parser::parse_query;
    use crate::term::iri::ns;
    use crate::term::Iri;

    fn store() -> TripleStore {
        let e1 = Iri::new("http://ex.org/e1");
        let e2 = Iri::new("http://ex.org/e2");
        vec![
            Triple::new(e1.clone(), ns::rdf_type(), ns::schema("Event")),
            Triple::new(e1.clone(), ns::schema("name"), Term::literal("5K Classic")),
            Triple::new(e2.clone(), ns::rdf_type(), ns::schema("Event")),
            Triple::new(e2.clone(), ns::schema("name"), Term::literal("10K Run")),
            Triple::new(e2, ns::schema("startDate"), Term::literal("2023-06-01")),
        ]
        .into()
    }

    fn run(query: &str, store: &TripleStore) -> Vec<Binding> {
        evaluate(&parse_query(query).unwrap().where_clause, store)
    }

    #[test]
    fn test_join_binds_shared_variables() {
        let results = run("SELECT * WHERE { ?e a schema:Event . ?e schema:name ?n }", &store());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["n"], Term::literal("5K Classic"));
        assert_eq!(results[1]["n"], Term::literal("10K Run"));
    }

    #[test]
    fn test_empty_pattern_yields_one_empty_binding() {
        let results = evaluate(&GraphPattern::default(), &store());
        assert_eq!(results, vec![Binding::new()]);
    }

    #[test]
    fn test_optional_keeps_unextended_binding() {
        let e1 = Iri::new("http://ex.org/e1");
        let store: TripleStore = vec![Triple::new(e1, ns::rdf_type(), ns::schema("Event"))].into();
        let results = run(
            "SELECT ?s ?d WHERE { ?s a schema:Event . OPTIONAL { ?s schema:startDate ?d } }",
            &store,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["s"], Term::iri("http://ex.org/e1"));
        assert!(!results[0].contains_key("d"));
    }

    #[test]
    fn test_optional_extensions_replace_binding() {
        let results = run(
            "SELECT * WHERE { ?s a schema:Event OPTIONAL { ?s schema:startDate ?d } }",
            &store(),
        );
        assert_eq!(results.len(), 2);
        assert!(!results[0].contains_key("d"));
        assert_eq!(results[1]["d"], Term::literal("2023-06-01"));
    }

    #[test]
    fn test_filter_inside_optional_only_limits_extensions() {
        let results = run(
            "SELECT * WHERE { ?s a schema:Event OPTIONAL { ?s schema:name ?n FILTER(contains(?n, \"10K\")) } }",
            &store(),
        );
        assert_eq!(results.len(), 2);
        assert!(!results[0].contains_key("n"));
        assert_eq!(results[1]["n"], Term::literal("10K Run"));
    }

    #[test]
    fn test_group_filter_sees_optional_variables() {
        let results = run(
            "SELECT * WHERE { ?s a schema:Event OPTIONAL { ?s schema:startDate ?d } FILTER(!bound(?d)) }",
            &store(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["s"], Term::iri("http://ex.org/e1"));
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let a = Iri::new("http://ex.org/a");
        let b = Iri::new("http://ex.org/b");
        let p = Iri::new("http://ex.org/p");
        let store: TripleStore = vec![
            Triple::new(a.clone(), p.clone(), a.clone()),
            Triple::new(a, p, b),
        ]
        .into();
        let results = run("SELECT * WHERE { ?x <http://ex.org/p> ?x }", &store);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_duplicate_triples_produce_duplicate_bindings() {
        let t = Triple::new(Iri::new("http://ex.org/a"), ns::rdf_type(), ns::schema("Event"));
        let store: TripleStore = vec![t.clone(), t].into();
        assert_eq!(run("SELECT * WHERE { ?s a schema:Event }", &store).len(), 2);
    }
}
