//! FILTER evaluation
//!
//! Evaluation never fails loudly. An expression that touches an unbound
//! variable (or applies a function to the wrong kind of term) yields no
//! value, and a filter without a value rejects the row. `bound()` is the one
//! form that inspects unbound variables directly.

use std::cmp::Ordering;

use super::ast::{CompareOp, Expression};
use crate::term::iri::ns;
use crate::term::{Binding, Literal, Term};

/// Intermediate value of an expression
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Term(Term),
    Bool(bool),
}

impl Value {
    fn as_str(&self) -> &str {
        match self {
            Value::Term(term) => term.string_value(),
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
        }
    }

    /// Effective boolean value
    fn truthy(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Term(Term::Literal(lit)) => match lit.datatype_iri() {
                Some(ns::XSD_BOOLEAN) => Some(lit.value() == "true" || lit.value() == "1"),
                _ => match parse_number(lit.value()) {
                    Some(n) if lit.datatype_iri().is_some() => Some(n != 0.0),
                    _ => Some(!lit.value().is_empty()),
                },
            },
            Value::Term(_) => None,
        }
    }
}

/// Check whether a binding passes a filter
pub fn evaluate(expr: &Expression, binding: &Binding) -> bool {
    eval(expr, binding).and_then(|v| v.truthy()).unwrap_or(false)
}

/// Check a binding against every filter of a group
pub fn passes_all(filters: &[Expression], binding: &Binding) -> bool {
    filters.iter().all(|f| evaluate(f, binding))
}

fn eval(expr: &Expression, binding: &Binding) -> Option<Value> {
    match expr {
        Expression::Var(name) => binding.get(name).cloned().map(Value::Term),
        Expression::Constant(term) => Some(Value::Term(term.clone())),
        Expression::Bound(name) => Some(Value::Bool(binding.contains_key(name))),
        Expression::Not(inner) => {
            let value = eval(inner, binding)?.truthy()?;
            Some(Value::Bool(!value))
        }
        Expression::And(left, right) => {
            let l = eval(left, binding).and_then(|v| v.truthy());
            let r = eval(right, binding).and_then(|v| v.truthy());
            match (l, r) {
                (Some(false), _) | (_, Some(false)) => Some(Value::Bool(false)),
                (Some(true), Some(true)) => Some(Value::Bool(true)),
                _ => None,
            }
        }
        Expression::Or(left, right) => {
            let l = eval(left, binding).and_then(|v| v.truthy());
            let r = eval(right, binding).and_then(|v| v.truthy());
            match (l, r) {
                (Some(true), _) | (_, Some(true)) => Some(Value::Bool(true)),
                (Some(false), Some(false)) => Some(Value::Bool(false)),
                _ => None,
            }
        }
        Expression::Compare(op, left, right) => {
            let l = eval(left, binding)?;
            let r = eval(right, binding)?;
            let ordering = compare_values(l.as_str(), r.as_str());
            let result = match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::NotEq => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
            };
            Some(Value::Bool(result))
        }
        Expression::Regex(target, pattern) => {
            let value = eval(target, binding)?;
            Some(Value::Bool(pattern.regex.is_match(value.as_str())))
        }
        Expression::Contains(haystack, needle) => {
            let haystack = eval(haystack, binding)?;
            let needle = eval(needle, binding)?;
            let found = haystack.as_str().to_lowercase().contains(&needle.as_str().to_lowercase());
            Some(Value::Bool(found))
        }
        Expression::StrStarts(value, prefix) => {
            let value = eval(value, binding)?;
            let prefix = eval(prefix, binding)?;
            Some(Value::Bool(value.as_str().starts_with(prefix.as_str())))
        }
        Expression::StrEnds(value, suffix) => {
            let value = eval(value, binding)?;
            let suffix = eval(suffix, binding)?;
            Some(Value::Bool(value.as_str().ends_with(suffix.as_str())))
        }
        Expression::Str(inner) => {
            let value = eval(inner, binding)?;
            Some(Value::Term(Term::Literal(Literal::plain(value.as_str()))))
        }
        Expression::Lang(inner) => match eval(inner, binding)? {
            Value::Term(Term::Literal(lit)) => {
                Some(Value::Term(Term::literal(lit.language().unwrap_or_default())))
            }
            _ => None,
        },
        Expression::IsIri(inner) => {
            let value = eval(inner, binding)?;
            Some(Value::Bool(matches!(value, Value::Term(Term::Iri(_)))))
        }
        Expression::IsLiteral(inner) => {
            let value = eval(inner, binding)?;
            Some(Value::Bool(matches!(value, Value::Term(Term::Literal(_)))))
        }
    }
}

/// Parse a string that looks like a plain decimal number.
///
/// Only digits, one optional sign, one optional `.` and an optional exponent
/// qualify; `inf` and `NaN` spellings do not.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let mantissa = body.split(['e', 'E']).next().unwrap_or_default();
    if !mantissa.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Compare two string values: numerically when both look numeric, else
/// byte-wise. Zero-padded values such as `"007"` therefore compare as numbers.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.as_bytes().cmp(b.as_bytes()),
    }
}

/// Total order used by ORDER BY.
///
/// Empty values (unbound) come first, then numeric-looking values by number,
/// then everything else byte-wise. Within each group this agrees with
/// [`compare_values`]; across groups the rank decides, so a column mixing
/// numbers and words still sorts consistently.
pub fn sort_order(a: &str, b: &str) -> Ordering {
    fn rank(s: &str) -> (u8, Option<f64>) {
        if s.is_empty() {
            return (0, None);
        }
        match parse_number(s) {
            Some(n) => (1, Some(n)),
            None => (2, None),
        }
    }
    match (rank(a), rank(b)) {
        ((1, Some(x)), (1, Some(y))) => x.total_cmp(&y),
        ((ra, _), (rb, _)) if ra != rb => ra.cmp(&rb),
        _ => a.as_bytes().cmp(b.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::parser::parse_query;

    fn filter(expr: &str) -> Expression {
        let query = format!("SELECT * WHERE {{ ?s ?p ?o FILTER({}) }}", expr);
        parse_query(&query).unwrap().where_clause.filters.remove(0)
    }

    fn binding(pairs: &[(&str, Term)]) -> Binding {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_unbound_variable_excludes_row() {
        let b = binding(&[("s", Term::iri("http://ex.org/e1"))]);
        assert!(!evaluate(&filter("?d > \"2020\""), &b));
        assert!(!evaluate(&filter("regex(?d, \"x\")"), &b));
        assert!(!evaluate(&filter("contains(?d, \"x\")"), &b));
        assert!(!evaluate(&filter("!(?d = 1)"), &b));
    }

    #[test]
    fn test_bound() {
        let b = binding(&[("s", Term::iri("http://ex.org/e1"))]);
        assert!(evaluate(&filter("bound(?s)"), &b));
        assert!(evaluate(&filter("!bound(?d)"), &b));
    }

    #[test]
    fn test_numeric_versus_lexical_comparison() {
        let b = binding(&[("n", Term::typed_literal("10", ns::XSD_INTEGER))]);
        assert!(evaluate(&filter("?n > 9"), &b));
        assert!(evaluate(&filter("?n > \"9\""), &b));

        let b = binding(&[("n", Term::literal("abc"))]);
        assert!(evaluate(&filter("?n < \"abd\""), &b));
        assert!(evaluate(&filter("?n > \"ABC\""), &b));
    }

    #[test]
    fn test_zero_padded_values_compare_numerically() {
        assert_eq!(compare_values("007", "10"), Ordering::Less);
        assert_eq!(compare_values("007", "7"), Ordering::Equal);
        assert_eq!(compare_values("A07", "A10"), Ordering::Less);
        assert_eq!(compare_values("2024-01-01", "2023-06-01"), Ordering::Greater);
    }

    #[test]
    fn test_parse_number_rejects_words() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("2024-01-01"), None);
        assert_eq!(parse_number("-4.5e2"), Some(-450.0));
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn test_regex_flags() {
        let b = binding(&[("o", Term::literal("5K Classic"))]);
        assert!(evaluate(&filter("regex(?o, \"classic\", \"i\")"), &b));
        assert!(!evaluate(&filter("regex(?o, \"classic\")"), &b));
        assert!(evaluate(&filter("regex(?o, \"^5K\")"), &b));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let b = binding(&[("o", Term::literal("Leeds Half Marathon"))]);
        assert!(evaluate(&filter("contains(?o, \"HALF\")"), &b));
        assert!(evaluate(&filter("strstarts(?o, \"Leeds\")"), &b));
        assert!(evaluate(&filter("strends(?o, \"Marathon\")"), &b));
        assert!(!evaluate(&filter("strstarts(?o, \"leeds\")"), &b));
    }

    #[test]
    fn test_logical_operators() {
        let b = binding(&[("n", Term::typed_literal("5", ns::XSD_INTEGER))]);
        assert!(evaluate(&filter("?n > 1 && ?n < 10"), &b));
        assert!(!evaluate(&filter("?n > 1 && ?n > 10"), &b));
        assert!(evaluate(&filter("?n > 10 || ?n = 5"), &b));
        // An unbound side does not poison a true disjunct
        assert!(evaluate(&filter("?missing = 1 || ?n = 5"), &b));
        assert!(!evaluate(&filter("?missing = 1 && ?n = 5"), &b));
    }

    #[test]
    fn test_term_tests() {
        let b = binding(&[
            ("s", Term::iri("http://ex.org/e1")),
            ("o", Term::lang_literal("hello", "en")),
        ]);
        assert!(evaluate(&filter("isIRI(?s)"), &b));
        assert!(evaluate(&filter("isLiteral(?o)"), &b));
        assert!(evaluate(&filter("lang(?o) = \"en\""), &b));
        assert!(evaluate(&filter("str(?s) = \"http://ex.org/e1\""), &b));
    }
}
