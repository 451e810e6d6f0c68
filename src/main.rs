mod report;

use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;
use typex::{Dispatcher, Error, Registry, RouteItem, RuleDescriptor, Value};

const LOG_ENV: &str = "TYPEX_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let default_filter = if config.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

enum Command {
    Check { expression: String, values: Vec<Value> },
    Explain { expression: String },
    Match { rules: Vec<RuleDescriptor>, args: Vec<Value> },
}

struct CliConfig {
    command: Command,
    defines: Vec<(String, String)>,
    color: bool,
    verbose: bool,
}

fn run(config: &CliConfig) -> Result<(), Error> {
    let registry = Registry::new();
    for (name, alias) in &config.defines {
        registry.define(name, alias.as_str())?;
    }

    let palette = report::Palette::new(config.color);
    match &config.command {
        Command::Check { expression, values } => {
            let mut outcomes = Vec::with_capacity(values.len());
            for value in values {
                outcomes.push((value, registry.evaluate(expression, value)?));
            }
            report::print_check(expression, &outcomes, &palette);
        }
        Command::Explain { expression } => {
            let expr = registry.compile(expression);
            report::print_explain(expression, &typex::normalize(expression), &expr, &registry, &palette);
        }
        Command::Match { rules, args } => {
            let probe: Dispatcher = Dispatcher::new(
                &registry,
                vec![RouteItem::Rules(rules.clone()), RouteItem::behavior(|_, rewritten| Ok(Value::Array(rewritten)))],
            )?;
            let outcome = match probe.call(args.clone()) {
                Ok(rewritten) => Some(rewritten),
                Err(Error::NoMatchingRoute { .. }) => None,
                Err(err) => return Err(err),
            };
            report::print_match(&probe, args, outcome.as_ref(), &palette);
            if outcome.is_none() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn parse_args() -> Result<CliConfig, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut defines = Vec::new();
    let mut color = io::stdout().is_terminal();
    let mut verbose = false;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("typex {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-v" | "--verbose" => verbose = true,
            "--define" | "-d" => {
                let value = args.next().ok_or_else(|| "error: --define expects name=alias".to_string())?;
                defines.push(parse_define(&value)?);
            }
            "--" => {
                positional.extend(args.by_ref());
                break;
            }
            _ if arg.starts_with("--define=") => {
                defines.push(parse_define(arg.trim_start_matches("--define="))?);
            }
            _ if arg.starts_with('-') && arg.len() > 1 && arg.parse::<f64>().is_err() => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("check") => {
            let expression = positional.next().ok_or_else(|| "error: check expects an expression".to_string())?;
            let sources: Vec<String> = positional.collect();
            let values = if sources.is_empty() {
                parse_json_stream(&read_stdin_input()?)?
            } else {
                sources.iter().map(|source| parse_json(source)).collect::<Result<_, _>>()?
            };
            Command::Check { expression, values }
        }
        Some("explain") => {
            let expression = positional.next().ok_or_else(|| "error: explain expects an expression".to_string())?;
            if let Some(extra) = positional.next() {
                return Err(format!("error: unexpected argument '{extra}'"));
            }
            Command::Explain { expression }
        }
        Some("match") => {
            let rules = positional.next().ok_or_else(|| "error: match expects a rule array".to_string())?;
            let args = positional.next().ok_or_else(|| "error: match expects an argument array".to_string())?;
            if let Some(extra) = positional.next() {
                return Err(format!("error: unexpected argument '{extra}'"));
            }
            Command::Match { rules: parse_rules(&rules)?, args: parse_array(&args, "arguments")? }
        }
        Some(other) => return Err(format!("error: unknown command '{other}'\n\n{}", help_text())),
        None => return Err(format!("error: no command provided\n\n{}", help_text())),
    };

    Ok(CliConfig { command, defines, color, verbose })
}

fn parse_define(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, alias)) if !name.trim().is_empty() => Ok((name.trim().to_string(), alias.to_string())),
        _ => Err(format!("error: invalid --define '{value}' (expected name=alias)")),
    }
}

fn parse_json(source: &str) -> Result<Value, String> {
    serde_json::from_str::<serde_json::Value>(source)
        .map(Value::from)
        .map_err(|err| format!("error: invalid JSON '{source}': {err}"))
}

fn parse_json_stream(source: &str) -> Result<Vec<Value>, String> {
    serde_json::Deserializer::from_str(source)
        .into_iter::<serde_json::Value>()
        .map(|value| value.map(Value::from).map_err(|err| format!("error: invalid JSON on stdin: {err}")))
        .collect()
}

fn parse_array(source: &str, what: &str) -> Result<Vec<Value>, String> {
    match parse_json(source)? {
        Value::Array(items) => Ok(items),
        other => Err(format!("error: {what} must be a JSON array, got {other}")),
    }
}

fn parse_rules(source: &str) -> Result<Vec<RuleDescriptor>, String> {
    parse_array(source, "rules")?
        .iter()
        .map(|value| RuleDescriptor::try_from(value).map_err(|err| format!("error: {err}")))
        .collect()
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "typex {version}

Type-predicate expressions and overload matching.

Usage:
  typex [OPTIONS] check <expression> [<json>...]
  typex [OPTIONS] explain <expression>
  typex [OPTIONS] match <rules-json> <args-json>

Commands:
  check      Test each JSON value against the expression. Reads a stream of
             JSON values from stdin when none are given.
  explain    Show the normalized expression and its compiled tree.
  match      Test a JSON argument array against a JSON rule array and print
             the arguments with defaults filled in.

Options:
  -d, --define <name=alias>  Define a type before running (repeatable).
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -v, --verbose              Log at debug level (overridden by {log_env}).
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  1  Evaluation error, or no match for `match`.
  2  Invalid arguments or input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV
    )
}
