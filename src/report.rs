use typex::{Dispatcher, Expr, Registry, Value};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
        if self.enabled { format!("{}{}{}", color, s.as_ref(), ansi::RESET) } else { s.as_ref().to_string() }
    }

    fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s, ansi::BOLD)
    }

    fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s, ansi::DIM)
    }

    fn verdict(&self, ok: bool) -> String {
        if ok { self.paint("true", ansi::GREEN) } else { self.paint("false", ansi::YELLOW) }
    }
}

pub fn print_check(expression: &str, outcomes: &[(&Value, bool)], palette: &Palette) {
    println!("{}", palette.dim(format!("# {expression}")));
    for (value, ok) in outcomes {
        println!(
            "{}  {} {}",
            palette.verdict(*ok),
            palette.dim(value.to_string()),
            palette.paint(format!("({})", value.type_name()), ansi::GRAY)
        );
    }
}

pub fn print_explain(source: &str, normalized: &str, expr: &Expr, registry: &Registry, palette: &Palette) {
    println!("{}", palette.bold(palette.paint(format!("⚙  Expression: \"{source}\""), ansi::CYAN)));
    println!("  {} {}", palette.dim("normalized:"), normalized);
    println!("  {} {}", palette.dim("canonical: "), expr);

    println!("\n{}", palette.paint("━━━ Tree ━━━", ansi::GRAY));
    print_tree(expr, "", true, registry, palette);
}

/// ```text
/// └─ or
///    ├─ not
///    │  └─ set
///    └─ number
/// ```
fn print_tree(expr: &Expr, prefix: &str, last: bool, registry: &Registry, palette: &Palette) {
    let branch = if last { "└─ " } else { "├─ " };
    let label = match expr {
        Expr::Named(name) if registry.contains(name) => palette.paint(name, ansi::GREEN),
        Expr::Named(name) => format!("{} {}", palette.paint(name, ansi::YELLOW), palette.dim("(undefined)")),
        Expr::Or(..) => palette.paint("or", ansi::BLUE),
        Expr::And(..) => palette.paint("and", ansi::BLUE),
        Expr::Not(_) => palette.paint("not", ansi::BLUE),
        Expr::ArrayOf(_) => palette.paint("array of", ansi::BLUE),
    };
    println!("  {}{}{}", palette.dim(prefix), palette.dim(branch), label);

    let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
    match expr {
        Expr::Named(_) => {}
        Expr::Or(left, right) | Expr::And(left, right) => {
            print_tree(left, &child_prefix, false, registry, palette);
            print_tree(right, &child_prefix, true, registry, palette);
        }
        Expr::Not(inner) | Expr::ArrayOf(inner) => print_tree(inner, &child_prefix, true, registry, palette),
    }
}

pub fn print_match(probe: &Dispatcher<'_>, args: &[Value], outcome: Option<&Value>, palette: &Palette) {
    for route in probe.routes() {
        println!("{} {}", palette.dim("rules:"), palette.paint(route.to_string(), ansi::CYAN));
    }
    println!("{} {}", palette.dim("args: "), Value::Array(args.to_vec()));

    match outcome {
        Some(rewritten) => println!("{} {}", palette.paint("match:", ansi::GREEN), palette.bold(rewritten.to_string())),
        None => println!("{}", palette.paint("no match", ansi::YELLOW)),
    }
}
