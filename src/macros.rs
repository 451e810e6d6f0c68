/// Compile a regex literal once and hand out a `&'static Regex`.
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`RuleDescriptor`](crate::RuleDescriptor) from literal syntax.
///
/// ```
/// use typex::{rule, RuleDescriptor};
///
/// let scalar = rule!("string");
/// let defaulted = rule!(["int", -5]);
/// let shape = rule!({ someNumber: ["number", 0], someString: "string" });
///
/// assert!(matches!(scalar, RuleDescriptor::Type(_)));
/// assert!(matches!(defaulted, RuleDescriptor::Defaulted(..)));
/// assert!(matches!(shape, RuleDescriptor::Shape(_)));
/// ```
#[macro_export]
macro_rules! rule {
    ({ $($field:ident : $desc:tt),* $(,)? }) => {
        $crate::RuleDescriptor::shape([ $( (stringify!($field), $crate::rule!($desc)) ),* ])
    };
    ([ $desc:tt, $default:expr ]) => {
        $crate::rule!($desc).with_default($default)
    };
    ($desc:expr) => {
        $crate::RuleDescriptor::from($desc)
    };
}

/// A `Vec` of rule descriptors, one per argument position.
///
/// ```
/// use typex::rules;
///
/// let signature = rules!["string", ["int", -5]];
/// assert_eq!(signature.len(), 2);
/// ```
#[macro_export]
macro_rules! rules {
    ($($desc:tt),* $(,)?) => {
        vec![ $( $crate::rule!($desc) ),* ]
    };
}
