use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dialect_rewriter::{ConversionReport, FsSource, RewriteOptions, Session, generate_execution_id};
use tracing_subscriber::EnvFilter;

/// Rewrites AK-dialect C++ sources into standard C++
#[derive(Parser, Debug)]
#[command(name = "dialect-rewriter")]
#[command(version = "0.1.0")]
#[command(about = "Token-aware AK dialect to standard C++ rewriter", long_about = None)]
struct Args {
    /// Where to write the converted file
    output: PathBuf,

    /// File to convert
    input: String,

    /// Additional files searched for declarations
    extra: Vec<String>,

    /// Project root that file names are resolved against
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Prefix for rewritten quoted includes
    #[arg(long)]
    include_prefix: Option<String>,

    /// JSON file with rewrite options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output a structured JSON report instead of human-readable text
    #[arg(short, long)]
    json: bool,

    /// Print the input's tokens as JSON and exit
    #[arg(long)]
    dump_tokens: bool,

    /// Log rewrite decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dialect_rewriter=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(args: &Args) -> anyhow::Result<RewriteOptions> {
    let mut options = match &args.config {
        Some(path) => RewriteOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from '{}'", path.display()))?,
        None => RewriteOptions::default(),
    };
    if let Some(prefix) = &args.include_prefix {
        options.include_prefix = prefix.clone();
    }
    Ok(options)
}

/// Convert the input; `None` when only tokens were dumped
fn run(args: &Args, execution_id: &str) -> anyhow::Result<Option<ConversionReport>> {
    let source = match &args.root {
        Some(root) => FsSource::with_root(root),
        None => FsSource::new(),
    };
    let mut session = Session::new(source).with_options(load_options(args)?);

    for id in std::iter::once(&args.input).chain(&args.extra) {
        session
            .add_file(id.as_str())
            .with_context(|| format!("Failed to read file '{}'", id))?;
    }

    let index = session
        .tokens(&args.input)
        .with_context(|| format!("'{}' is not in the session", args.input))?;

    if args.dump_tokens {
        let tokens: Vec<serde_json::Value> = index
            .tokens()
            .iter()
            .enumerate()
            .map(|(i, token)| {
                serde_json::json!({
                    "kind": token.kind,
                    "span": token.span,
                    "text": index.text_of(i),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(None);
    }

    let conversion = session.convert(&args.input)?;
    fs::write(&args.output, conversion.text())
        .with_context(|| format!("Failed to write output to '{}'", args.output.display()))?;

    Ok(Some(ConversionReport::success(
        execution_id.to_string(),
        index.buffer().checksum.clone(),
        index.buffer().lines().len(),
        &conversion,
    )))
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let execution_id = generate_execution_id();
    let report = match run(&args, &execution_id) {
        Ok(Some(report)) => report,
        Ok(None) => return,
        Err(e) => ConversionReport::failure(execution_id, args.input.as_str(), format!("{:#}", e)),
    };

    let output = if args.json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| r#"{"error": "Failed to serialize report"}"#.to_string())
    } else {
        report.summary()
    };
    println!("{}", output);

    if !report.success {
        std::process::exit(1);
    }
}
