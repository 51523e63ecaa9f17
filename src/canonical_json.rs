//! Canonical JSON comparison for property equality (§4.2 rule 6, §9 design note).
//!
//! `serde_json::Value`'s `Map` is a `BTreeMap` by default (no `preserve_order`
//! feature enabled anywhere in this workspace), so key ordering is already
//! canonical. What's left is normalizing numbers: `1` and `1.0` must compare
//! equal, and floats must not depend on how serde chose to print them.

use serde_json::Value;

/// Render a JSON value into a canonical string suitable for equality
/// comparison. Two values that are "the same" under JSON's loose number
/// typing (`1` vs `1.0`) render identically.
#[must_use]
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Compare two JSON values for canonical equality.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    canonical_string(a) == canonical_string(b)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else if let Some(f) = n.as_f64() {
                // Normalize integral floats ("2.0") to match integer literals ("2").
                if f.fract() == 0.0 && f.is_finite() {
                    out.push_str(&format!("{f:.0}"));
                } else {
                    out.push_str(&format!("{f}"));
                }
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    _ => out.push(c),
                }
            }
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(&Value::String(k.clone()), out);
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
    }
}
