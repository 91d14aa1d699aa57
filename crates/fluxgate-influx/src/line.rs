//! Line protocol rendering.
//!
//! One [`Point`] becomes one line:
//!
//! ```text
//! state,node=n1,owner=o1,thing=t1 lat="1.0",lon="2.0" 1590330453
//! ```
//!
//! Tags and fields come out of the point's `BTreeMap`s, so the rendered key
//! order is deterministic. Every field value is written as a quoted string
//! and the trailing timestamp is in whole seconds, to match the `precision=s`
//! write query.

use fluxgate_core::{Point, MEASUREMENT};

/// Render a point as a single line-protocol line (no trailing newline).
pub fn render(point: &Point) -> String {
    let mut line = String::from(MEASUREMENT);
    for (key, value) in point.tags() {
        line.push(',');
        push_escaped_ident(&mut line, key);
        line.push('=');
        push_escaped_ident(&mut line, value);
    }
    line.push(' ');
    let mut first = true;
    for (key, value) in point.fields() {
        if !first {
            line.push(',');
        }
        first = false;
        push_escaped_ident(&mut line, key);
        line.push_str("=\"");
        push_escaped_field_value(&mut line, value);
        line.push('"');
    }
    line.push(' ');
    line.push_str(&point.timestamp().timestamp().to_string());
    line
}

/// Tag keys, tag values and field keys escape comma, equals and space.
fn push_escaped_ident(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// String field values escape the quote and the backslash itself.
fn push_escaped_field_value(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}
