//! Type-expression normalization and parsing.
//!
//! Source text goes through two stages:
//!
//! ```text
//! "((!set) || number)[]"
//!        │ normalize()      symbolic operators -> keywords, whitespace folding
//!        ▼
//! "((not set)or number)array"
//!        │ ExprParser       innermost-leftmost groups first, then keywords
//!        ▼
//! ArrayOf(Or(Not(Named("set")), Named("number")))
//! ```
//!
//! Operators are resolved by *first match*, in a fixed order: `or`, `and`, a
//! trailing `array`, a leading `not`. There is no precedence beyond that, so
//! `a and b or c` splits at `or` and `a or b or c` nests to the right.
//!
//! Parenthesized groups are parsed on their own and replaced by a placeholder
//! token in the enclosing text. Placeholders live only inside one parse; they
//! are never visible as predicate names.

use std::fmt;

const GROUP_OPEN: char = '\u{E000}';
const GROUP_CLOSE: char = '\u{E001}';

/// A compiled type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Reference to a predicate in the registry, resolved at evaluation time.
    Named(String),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// An array whose every element satisfies the inner expression.
    ArrayOf(Box<Expr>),
}

impl Expr {
    /// Every predicate name referenced by the expression, left to right.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Named(name) => out.push(name),
            Expr::Or(left, right) | Expr::And(left, right) => {
                left.collect_names(out);
                right.collect_names(out);
            }
            Expr::Not(inner) | Expr::ArrayOf(inner) => inner.collect_names(out),
        }
    }
}

/// Renders source text that compiles back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Named(name) => f.write_str(name),
            Expr::Or(left, right) => write!(f, "({left} or {right})"),
            Expr::And(left, right) => write!(f, "({left} and {right})"),
            Expr::Not(inner) => match **inner {
                Expr::ArrayOf(_) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
            Expr::ArrayOf(inner) => write!(f, "{inner} array"),
        }
    }
}

/// Canonical spelling of a type expression.
///
/// `||`, `&&`, `!` and `[]` become the keywords `or`, `and`, `not` and
/// `array`; whitespace next to punctuation is dropped, runs of whitespace are
/// folded to one space and the edges are trimmed.
pub fn normalize(source: &str) -> String {
    let spelled = source.replace("||", " or ").replace("&&", " and ").replace('!', " not ").replace("[]", " array ");

    let tight_right = regex!(r"([[:word:]])\s+([^[:word:]])").replace_all(&spelled, "${1}${2}");
    let tight_left = regex!(r"([^[:word:]])\s+([[:word:]])").replace_all(&tight_right, "${1}${2}");
    let folded = regex!(r"\s+").replace_all(&tight_left, " ");

    folded.trim().to_string()
}

/// Single-use parser over normalized text.
///
/// `is_defined` lets a registered name win over keyword splitting, so a
/// predicate literally named `"a or b"` is found before the text is split.
pub(crate) struct ExprParser<'a> {
    is_defined: &'a dyn Fn(&str) -> bool,
    groups: Vec<Expr>,
}

impl<'a> ExprParser<'a> {
    pub(crate) fn new(is_defined: &'a dyn Fn(&str) -> bool) -> Self {
        ExprParser { is_defined, groups: Vec::new() }
    }

    pub(crate) fn parse(mut self, normalized: &str) -> Expr {
        let flat = self.eliminate_groups(normalized);
        self.parse_flat(&flat)
    }

    /// Replace groups innermost-leftmost first until no parentheses remain.
    ///
    /// ```text
    /// ((not set)or number)array
    ///  ^^^^^^^^^                -> #0 = Not(set)
    /// ( #0 or number)array
    /// ^^^^^^^^^^^^^^^           -> #1 = Or(#0, number)
    /// #1 array
    /// ```
    fn eliminate_groups(&mut self, source: &str) -> String {
        let mut current = source.trim().to_string();

        loop {
            let found = regex!(r"\(([^()]*)\)")
                .captures(&current)
                .and_then(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str().trim().to_string())));
            let Some((span, inner)) = found else {
                return current;
            };

            let group = self.parse_flat(&inner);
            let placeholder = self.push_group(group);
            current = format!("{} {} {}", &current[..span.start], placeholder, &current[span.end..]).trim().to_string();
        }
    }

    fn push_group(&mut self, group: Expr) -> String {
        self.groups.push(group);
        format!("{GROUP_OPEN}{}{GROUP_CLOSE}", self.groups.len() - 1)
    }

    fn group(&self, text: &str) -> Option<Expr> {
        let idx = text.strip_prefix(GROUP_OPEN)?.strip_suffix(GROUP_CLOSE)?.parse::<usize>().ok()?;
        self.groups.get(idx).cloned()
    }

    fn parse_flat(&mut self, text: &str) -> Expr {
        let text = text.trim();

        if (self.is_defined)(text) {
            return Expr::Named(text.to_string());
        }
        if let Some(group) = self.group(text) {
            return group;
        }

        if let Some(caps) = regex!(r"^\s*(.*?)\s*\bor\b\s*(.*?)\s*$").captures(text) {
            let left = self.parse_flat(&caps[1]);
            let right = self.parse_flat(&caps[2]);
            return Expr::Or(Box::new(left), Box::new(right));
        }
        if let Some(caps) = regex!(r"^\s*(.*?)\s*\band\b\s*(.*?)\s*$").captures(text) {
            let left = self.parse_flat(&caps[1]);
            let right = self.parse_flat(&caps[2]);
            return Expr::And(Box::new(left), Box::new(right));
        }
        if let Some(caps) = regex!(r"^\s*(.*?)\barray\s*$").captures(text) {
            return Expr::ArrayOf(Box::new(self.parse_flat(&caps[1])));
        }
        if let Some(caps) = regex!(r"^\s*not\b\s*(.*?)\s*$").captures(text) {
            return Expr::Not(Box::new(self.parse_flat(&caps[1])));
        }

        Expr::Named(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTINS: &[&str] = &["string", "number", "array", "set", "unset", "int", "null", "undefined"];

    fn parse(source: &str) -> Expr {
        let is_defined = |name: &str| BUILTINS.contains(&name);
        ExprParser::new(&is_defined).parse(&normalize(source))
    }

    fn named(name: &str) -> Box<Expr> {
        Box::new(Expr::Named(name.to_string()))
    }

    #[test]
    fn normalize_spells_out_symbolic_operators() {
        let cases = vec![
            ("string || number", "string or number"),
            ("!set", "not set"),
            ("string[]", "string array"),
            ("int && !null", "int and not null"),
            ("  ( not  set )  or number ", "(not set)or number"),
            ("((not set) or number) array", "((not set)or number)array"),
        ];

        for (source, expected) in cases {
            assert_eq!(normalize(source), expected, "normalizing {source:?}");
        }
    }

    #[test]
    fn or_splits_at_first_keyword_and_nests_right() {
        assert_eq!(
            parse("string or number or null"),
            Expr::Or(named("string"), Box::new(Expr::Or(named("number"), named("null"))))
        );
    }

    #[test]
    fn or_wins_over_and_regardless_of_position() {
        assert_eq!(
            parse("int and set or null"),
            Expr::Or(Box::new(Expr::And(named("int"), named("set"))), named("null"))
        );
    }

    #[test]
    fn array_and_not_suffix_prefix_forms() {
        assert_eq!(parse("number[]"), Expr::ArrayOf(named("number")));
        assert_eq!(parse("!undefined"), Expr::Not(named("undefined")));
        assert_eq!(parse("not number array"), Expr::ArrayOf(Box::new(Expr::Not(named("number")))));
    }

    #[test]
    fn groups_are_resolved_innermost_first() {
        assert_eq!(
            parse("((not set) or number) array"),
            Expr::ArrayOf(Box::new(Expr::Or(Box::new(Expr::Not(named("set"))), named("number"))))
        );
        assert_eq!(parse("not (string array)"), Expr::Not(Box::new(Expr::ArrayOf(named("string")))));
    }

    #[test]
    fn sibling_groups_keep_their_own_trees() {
        assert_eq!(
            parse("(string or null) and (int)"),
            Expr::And(Box::new(Expr::Or(named("string"), named("null"))), named("int"))
        );
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let sources =
            ["((not set) or number) array", "not (string array)", "not string array", "int and set or null"];

        for source in sources {
            let expr = parse(source);
            assert_eq!(parse(&expr.to_string()), expr, "round trip of {source:?} via {expr}");
        }
    }

    #[test]
    fn names_lists_every_reference() {
        assert_eq!(parse("(string or null) and not int").names(), vec!["string", "null", "int"]);
    }

    #[test]
    fn unbalanced_text_falls_through_to_a_name() {
        assert_eq!(parse("(string"), Expr::Named("(string".to_string()));
    }
}
