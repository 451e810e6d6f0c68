//! Built-in predicates.
//!
//! ```text
//! atomic   string number boolean regexp object array function null undefined
//! derived  any catchall defined unset set char character regex numeric int integer
//! ```

use super::registry::{Predicate, Registry, Test};
use crate::{Kinds, Value};
use std::rc::Rc;

const ALIASES: &[(&str, &str)] = &[
    ("catchall", "any"),
    ("defined", "not undefined"),
    ("unset", "undefined or null"),
    ("set", "not unset"),
    ("character", "char"),
    ("regex", "regexp"),
    ("integer", "int"),
];

pub(super) fn install(registry: &Registry) {
    for (name, kinds) in Kinds::ATOMS {
        registry.install(name, Predicate::Atomic(Test::Kinds(kinds)));
    }
    registry.install("any", Predicate::Atomic(Test::Kinds(Kinds::all())));
    registry.install("char", custom(is_char));
    registry.install("numeric", custom(is_numeric));
    registry.install("int", custom(is_int));

    for (name, expression) in ALIASES {
        registry.install(name, Predicate::Alias(expression.to_string()));
    }
}

fn custom(test: fn(&Value) -> bool) -> Predicate {
    Predicate::Atomic(Test::Custom(Rc::new(test)))
}

/// A string of exactly one UTF-16 code unit.
fn is_char(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.encode_utf16().count() == 1)
}

/// Whether `parseFloat(String(value))` would produce a number.
fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(n) => !n.is_nan(),
        other => parse_float_prefix(&other.coerce_to_string()).is_some(),
    }
}

/// Whether `parseInt(String(value), 10) === value`: only finite, whole
/// numbers below the exponent-notation threshold survive the round trip.
fn is_int(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21)
}

/// Parse the longest leading float literal, ignoring leading whitespace and
/// any trailing garbage.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let caps = regex!(r"^\s*([+-]?)(Infinity|(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)").captures(text)?;
    let magnitude = match &caps[2] {
        "Infinity" => f64::INFINITY,
        literal => literal.parse::<f64>().ok()?,
    };
    Some(if &caps[1] == "-" { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_float_prefix_matches_host_parse_float() {
        let cases: Vec<(&str, Option<f64>)> = vec![
            ("3.5", Some(3.5)),
            ("  -2e3xyz", Some(-2000.0)),
            (".5", Some(0.5)),
            ("7.", Some(7.0)),
            ("1e", Some(1.0)),
            ("Infinity and beyond", Some(f64::INFINITY)),
            ("x1", None),
            ("", None),
            ("-", None),
        ];

        for (text, expected) in cases {
            assert_eq!(parse_float_prefix(text), expected, "parsing {text:?}");
        }
    }

    #[test]
    fn numeric_accepts_numbers_and_numeric_strings() {
        assert!(is_numeric(&Value::from(2)));
        assert!(is_numeric(&Value::from("1")));
        assert!(is_numeric(&Value::from("3.5 apples")));
        assert!(is_numeric(&Value::array(["12"])));
        assert!(!is_numeric(&Value::from("x")));
        assert!(!is_numeric(&Value::Number(f64::NAN)));
        assert!(!is_numeric(&Value::Null));
        assert!(!is_numeric(&Value::from(true)));
    }

    #[test]
    fn int_requires_a_whole_number_value() {
        assert!(is_int(&Value::from(5)));
        assert!(is_int(&Value::from(-0.0)));
        assert!(!is_int(&Value::from(2.5)));
        assert!(!is_int(&Value::from("5")));
        assert!(!is_int(&Value::Number(f64::INFINITY)));
        assert!(!is_int(&Value::Number(1e21)));
    }

    #[test]
    fn char_counts_utf16_units() {
        assert!(is_char(&Value::from("a")));
        assert!(is_char(&Value::from("é")));
        assert!(!is_char(&Value::from("ab")));
        assert!(!is_char(&Value::from("😀")));
        assert!(!is_char(&Value::from("")));
    }

    #[test]
    fn builtins_cover_every_documented_name() {
        let registry = Registry::new();
        let names = [
            "string", "number", "boolean", "regexp", "object", "array", "function", "null", "undefined", "any",
            "catchall", "defined", "unset", "set", "char", "character", "regex", "numeric", "int", "integer",
        ];

        for name in names {
            assert!(registry.contains(name), "missing built-in {name}");
        }
    }
}
