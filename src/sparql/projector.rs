//! Solution modifiers and projection
//!
//! Applied in a fixed order: distinct → order → offset → limit, then the
//! rows are narrowed to the projected variables.

use fnv::FnvHashSet;
use indexmap::IndexSet;

use super::ast::{Modifiers, OrderCondition, Projection};
use super::filter::sort_order;
use crate::term::Binding;

/// Resolve the projected variable list.
///
/// `*` becomes every variable bound anywhere in the result, in the order
/// variables were first bound.
pub fn resolve_variables(projection: &Projection, bindings: &[Binding]) -> Vec<String> {
    match projection {
        Projection::Variables(vars) => vars.clone(),
        Projection::All => {
            let mut all = IndexSet::new();
            for binding in bindings {
                for name in binding.keys() {
                    if !all.contains(name) {
                        all.insert(name.clone());
                    }
                }
            }
            all.into_iter().collect()
        }
    }
}

/// DISTINCT key: projected values in projection order, joined by NUL
pub fn distinct_key(binding: &Binding, variables: &[String]) -> String {
    variables
        .iter()
        .map(|v| binding.get(v).map(|t| t.string_value()).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\0")
}

/// Drop later rows whose key was already seen
pub fn apply_distinct(bindings: &mut Vec<Binding>, variables: &[String]) {
    let mut seen = FnvHashSet::default();
    bindings.retain(|b| seen.insert(distinct_key(b, variables)));
}

/// Stable multi-key sort; unbound values sort as the empty string, first
pub fn apply_order(bindings: &mut [Binding], order: &[OrderCondition]) {
    if order.is_empty() {
        return;
    }
    bindings.sort_by(|a, b| {
        for cond in order {
            let va = a.get(&cond.variable).map(|t| t.string_value()).unwrap_or("");
            let vb = b.get(&cond.variable).map(|t| t.string_value()).unwrap_or("");
            let ordering = sort_order(va, vb);
            let ordering = if cond.ascending { ordering } else { ordering.reverse() };
            if ordering.is_ne() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Apply the modifiers to raw bindings without narrowing them
pub fn apply_modifiers(mut bindings: Vec<Binding>, variables: &[String], modifiers: &Modifiers) -> Vec<Binding> {
    if modifiers.distinct {
        apply_distinct(&mut bindings, variables);
    }
    apply_order(&mut bindings, &modifiers.order_by);
    bindings.into_iter().skip(modifiers.offset).take(modifiers.limit).collect()
}

/// Apply the modifiers and narrow every row to the projected variables
pub fn project(
    bindings: Vec<Binding>,
    projection: &Projection,
    modifiers: &Modifiers,
) -> (Vec<String>, Vec<Binding>) {
    let variables = resolve_variables(projection, &bindings);
    let rows = apply_modifiers(bindings, &variables, modifiers)
        .into_iter()
        .map(|binding| {
            variables
                .iter()
                .filter_map(|v| binding.get(v).map(|t| (v.clone(), t.clone())))
                .collect()
        })
        .collect();
    (variables, rows)
}
