//! Depth-first flattening of JSON documents into named numeric observations.
//!
//! Object keys become path segments verbatim. Arrays contribute a segment named
//! after their nesting depth (`array_0`, `array_1`, ...) and push the element
//! position onto the index path. Segments are joined with [`SEPARATOR`].
//!
//! ```text
//! {"x": [[1, 2], [3, 4]]}
//!   x::array_0::array_1  [0, 0] = 1
//!   x::array_0::array_1  [0, 1] = 2
//!   x::array_0::array_1  [1, 0] = 3
//!   x::array_0::array_1  [1, 1] = 4
//! ```

use serde_json::Value;
use tracing::warn;

/// Separator between flattened path segments.
pub const SEPARATOR: &str = "::";

/// Sink for observations produced by [`walk_json`].
pub trait Receiver {
    /// Receive one numeric leaf.
    ///
    /// `indices` holds one position per array level between the root and the
    /// leaf, outermost first.
    fn receive(&mut self, name: &str, value: f64, indices: &[usize]);
}

impl<F> Receiver for F
where
    F: FnMut(&str, f64, &[usize]),
{
    fn receive(&mut self, name: &str, value: f64, indices: &[usize]) {
        self(name, value, indices)
    }
}

/// Walk `value`, reporting every number and boolean to `receiver`.
///
/// Strings and nulls are skipped. Object members are visited in key order.
pub fn walk_json<R>(path: &str, value: &Value, indices: &[usize], receiver: &mut R)
where
    R: Receiver + ?Sized,
{
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) => receiver.receive(path, v, indices),
            None => warn!(path, number = %n, "Unsupported numeric value, skipping"),
        },
        Value::Bool(b) => receiver.receive(path, if *b { 1.0 } else { 0.0 }, indices),
        Value::String(_) | Value::Null => {}
        Value::Array(items) => {
            let child = join(path, &format!("array_{}", indices.len()));
            let mut next = Vec::with_capacity(indices.len() + 1);
            next.extend_from_slice(indices);
            next.push(0);

            for (i, item) in items.iter().enumerate() {
                if let Some(last) = next.last_mut() {
                    *last = i;
                }
                walk_json(&child, item, &next, receiver);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk_json(&join(path, key), item, indices, receiver);
            }
        }
    }
}

/// Append `segment` to `path`.
pub fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}{}{}", path, SEPARATOR, segment)
    }
}
