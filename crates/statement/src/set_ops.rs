//! Set algebra over plain sequences.
//!
//! Metadata policy operators are defined in terms of membership, union,
//! intersection, and subset relations over JSON value sequences. These
//! helpers implement that algebra generically for any element type with
//! structural equality. All functions are pure and allocate fresh results;
//! inputs are never mutated.
//!
//! Equality is structural (`PartialEq`), not identity: two
//! [`serde_json::Value`] trees with the same shape compare equal.

use serde_json::Value;

/// Returns true iff some element of `s` structurally equals `v`.
pub fn contains<T: PartialEq>(v: &T, s: &[T]) -> bool {
    s.iter().any(|e| e == v)
}

/// Ordered union: all of `a` (duplicates preserved), then each element of
/// `b` that is absent from `a`.
pub fn union<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = a.to_vec();
    for v in b {
        if !contains(v, a) {
            out.push(v.clone());
        }
    }
    out
}

/// Ordered intersection: each element of `a` that is also in `b`, in `a`'s
/// order.
pub fn intersect<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().filter(|v| contains(*v, b)).cloned().collect()
}

/// Returns true iff every element of `x` is in `y`.
pub fn is_subset<T: PartialEq>(x: &[T], y: &[T]) -> bool {
    x.iter().all(|v| contains(v, y))
}

/// Returns true iff every element of `y` is in `x`.
pub fn is_superset<T: PartialEq>(x: &[T], y: &[T]) -> bool {
    is_subset(y, x)
}

/// Returns true iff `a` and `b` contain the same elements, order ignored.
///
/// Assumes neither sequence contains duplicates; the result is undefined
/// otherwise.
pub fn unordered_equal<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && is_subset(a, b)
}

/// Lifts a JSON value into a sequence: an array yields its elements, any
/// other value yields a one-element sequence containing it.
///
/// Policy operators such as `subset_of` apply to claims that may be either
/// a scalar or an array; `slicify` normalises both shapes.
pub fn slicify(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
