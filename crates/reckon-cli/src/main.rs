//! Command-line interface for evaluating reckon expressions.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, NamedSource, SourceSpan};
use reckon_eval::{EvalError, Expression, Single, Store, Value};
use reckon_syntax::{parse, parse_value, print, print_value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SOURCE_NAME: &str = "<expr>";

/// CLI error with source context for pretty printing.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("parse error: {message}")]
    #[diagnostic(code(reckon::parse_error))]
    ParseError {
        message: String,
        #[source_code]
        src: NamedSource<Arc<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("build error: {message}")]
    #[diagnostic(code(reckon::build_error))]
    BuildError { message: String },

    #[error("invalid assignment '{assignment}': {message}")]
    #[diagnostic(code(reckon::assignment), help("use name=int{{11}} or name=null"))]
    AssignmentError { assignment: String, message: String },

    #[error("evaluation error: {0}")]
    #[diagnostic(code(reckon::eval_error))]
    Eval(#[from] EvalError),
}

impl CliError {
    fn from_parse_error(e: reckon_syntax::ParseError, source: Arc<String>) -> Self {
        match e.span() {
            Some(span) => CliError::ParseError {
                message: e.to_string(),
                src: NamedSource::new(SOURCE_NAME, source),
                span: (span.start, span.len()).into(),
            },
            None => CliError::BuildError {
                message: e.to_string(),
            },
        }
    }

    fn assignment(assignment: &str, message: impl ToString) -> Self {
        CliError::AssignmentError {
            assignment: assignment.to_string(),
            message: message.to_string(),
        }
    }
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "reckon", version)]
#[command(about = "Evaluate reckon expressions", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// Expression text
        #[arg(value_name = "EXPR")]
        expr: String,

        /// Variable assignments (name=value)
        #[arg(short, long, value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Recompute every node instead of reusing cached results
        #[arg(long)]
        no_cache: bool,

        /// Print every node with its result after evaluating
        #[arg(long)]
        log: bool,

        /// Value store to evaluate with
        #[arg(long, value_enum, default_value_t = StoreKind::Value)]
        store: StoreKind,
    },

    /// Parse and build an expression, then show its operations
    Check {
        /// Expression text
        #[arg(value_name = "EXPR")]
        expr: String,
    },

    /// Print an expression in canonical form
    Format {
        /// Expression text
        #[arg(value_name = "EXPR")]
        expr: String,
    },
}

/// Value store selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreKind {
    /// Any of bool, int, double and text
    Value,
    /// 64-bit integers only
    Int,
    /// Doubles only
    Double,
}

fn main() {
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Eval {
            expr,
            set,
            no_cache,
            log,
            store,
        } => {
            let source = Arc::new(expr);
            match store {
                StoreKind::Value => cmd_eval::<Value>(source, &set, !no_cache, log),
                StoreKind::Int => cmd_eval::<Single<i64>>(source, &set, !no_cache, log),
                StoreKind::Double => cmd_eval::<Single<f64>>(source, &set, !no_cache, log),
            }
        }
        Commands::Check { expr } => cmd_check(Arc::new(expr)),
        Commands::Format { expr } => cmd_format(Arc::new(expr)),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}

fn build<S: Store>(source: &Arc<String>) -> CliResult<Expression<S>> {
    parse(source).map_err(|e| CliError::from_parse_error(e, source.clone()))
}

fn cmd_eval<S: Store>(
    source: Arc<String>,
    assignments: &[String],
    cache: bool,
    log: bool,
) -> CliResult<()> {
    let expr = build::<S>(&source)?;
    let mut ctx = expr.context::<S>(cache);

    for assignment in assignments {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::assignment(assignment, "expected NAME=VALUE"))?;
        let value: S =
            parse_value(value.trim()).map_err(|e| CliError::assignment(assignment, e))?;
        ctx.assign_by_name(name.trim(), value)
            .map_err(|e| CliError::assignment(assignment, e))?;
        debug!(name = name.trim(), "assigned variable");
    }

    let outcome = expr.evaluate(&mut ctx);
    let stats = ctx.stats();
    debug!(hits = stats.hits, misses = stats.misses, "evaluated");

    if log {
        println!("{}", expr.log(&ctx));
    }
    println!("{}", print_value(&outcome?));
    Ok(())
}

fn cmd_check(source: Arc<String>) -> CliResult<()> {
    let expr = build::<Value>(&source)?;

    println!("Operations:");
    print!("{expr}");
    println!("Constants:");
    for (slot, value) in expr.consts().iter().enumerate() {
        println!("\t_{slot}: {}", print_value(value));
    }
    println!("Variables:");
    for (id, name) in expr.variables() {
        println!("\t#{id}: ${name}");
    }
    Ok(())
}

fn cmd_format(source: Arc<String>) -> CliResult<()> {
    let expr = build::<Value>(&source)?;
    println!("{}", print(&expr));
    Ok(())
}
