//! Policy subsumption — is one claim structure no broader than another?
//!
//! `is_lesser(a, b)` holds when `a` asserts nothing that `b` does not
//! already allow. It is asymmetric: a descendant statement must be lesser
//! than its ancestor, never the other way round.

use serde_json::{Map, Number, Value};

/// Return `true` if `a` is no broader than `b`.
///
/// - strings and booleans compare by equality, numbers by `a <= b`;
/// - integers and floats never compare with each other;
/// - every element of a list `a` needs some element of `b` it is lesser
///   than (elements of `b` may be reused, order is irrelevant);
/// - a mapping `a` needs every key present in `b`, each value lesser;
/// - any other pairing, including `null`, is `false`.
pub fn is_lesser(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number_le(x, y),
        (Value::Array(xs), Value::Array(ys)) => list_lesser(xs, ys),
        (Value::Object(x), Value::Object(y)) => map_lesser(x, y),
        _ => false,
    }
}

fn list_lesser(a: &[Value], b: &[Value]) -> bool {
    a.iter().all(|x| b.iter().any(|y| is_lesser(x, y)))
}

fn map_lesser(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    // Keys are strings, so covering a's key list with b's is membership.
    if !a.keys().all(|k| b.contains_key(k)) {
        return false;
    }
    a.iter().all(|(k, x)| match b.get(k) {
        Some(y) => is_lesser(x, y),
        None => false,
    })
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn number_le(a: &Number, b: &Number) -> bool {
    match (integer(a), integer(b)) {
        (Some(x), Some(y)) => x <= y,
        (None, None) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x <= y,
            _ => false,
        },
        _ => false,
    }
}
