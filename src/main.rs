//! distner command line
//!
//! Usage:
//!   distner label -i news.txt -l LOC=cities.txt --stopwords stop_en.txt
//!   distner label -i dev.conll -f conll_tab -r en-LOC-P31-1.json -o dev.pred.conll
//!   distner evaluate -i dev.pred.conll -f conll_tab -n 20

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use distner_core::{
    ConllParser, ConllWriter, DocumentKind, ErrorAnalysis, ErrorAnalyzer, EvaluationReport,
    Evaluator, LabelColumns, LabelScheme, RawFormat, RuleSet, Session, Settings,
};
use distner_utils::progress::{LogSink, ProgressSink};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "distner")]
#[command(about = "Dictionary-based distant labeling of named entities", version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Label a document with entity names from rule sets
    Label(LabelArgs),

    /// Score predictions in a token/gold/predicted CoNLL file
    Evaluate(EvaluateArgs),
}

#[derive(Args)]
struct LabelArgs {
    /// Document to label
    #[arg(short, long)]
    input: PathBuf,

    /// Format of the document (simple_text, conll_tab, conll_space)
    #[arg(short, long, default_value = "simple_text")]
    format: RawFormat,

    /// Rule set definition as JSON (repeatable)
    #[arg(short, long = "rule-set")]
    rule_sets: Vec<PathBuf>,

    /// Manual list as LABEL=PATH with one name per line (repeatable)
    #[arg(short, long = "list", value_parser = parse_list)]
    lists: Vec<ManualList>,

    /// Stopword list with one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Language code of manual and stopword lists
    #[arg(long, default_value = "en")]
    language: String,

    /// Settings file (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Tag scheme (BIO-2 or IO), overrides the settings file
    #[arg(long)]
    scheme: Option<LabelScheme>,

    /// Rule set store; stored rule sets are used and new ones are added to it
    #[arg(long)]
    store: Option<PathBuf>,

    /// Print the matches covering each token as JSON instead of CoNLL
    #[arg(long)]
    matches: bool,

    /// Output file, stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// CoNLL file with token, gold and predicted columns
    #[arg(short, long)]
    input: PathBuf,

    /// Column separator (conll_tab or conll_space)
    #[arg(short, long, default_value = "conll_tab")]
    format: RawFormat,

    /// Tag of tokens outside any entity
    #[arg(long, default_value = "O")]
    outside: String,

    /// Number of errors to show per kind
    #[arg(short = 'n', long, default_value_t = 10)]
    top: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Debug)]
struct ManualList {
    label: String,
    path: PathBuf,
}

fn parse_list(value: &str) -> std::result::Result<ManualList, String> {
    match value.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok(ManualList {
            label: label.to_string(),
            path: PathBuf::from(path),
        }),
        _ => Err(format!("expected LABEL=PATH, got '{value}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Label(args) => label(args),
        Command::Evaluate(args) => evaluate(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn open_session(args: &LabelArgs) -> Result<Session> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("invalid settings file {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(scheme) = args.scheme {
        settings = settings.with_label_scheme(scheme);
    }

    let Some(dir) = &args.store else {
        return Ok(Session::new(settings));
    };
    let format = settings.store_format;
    let mut session = Session::open(settings.with_store(dir, format))
        .with_context(|| format!("failed to open rule set store {}", dir.display()))?;
    let stored: Vec<_> = session.rule_sets().iter().map(|(key, ..)| *key).collect();
    for key in stored {
        session.load(key)?;
    }
    Ok(session)
}

fn label(args: LabelArgs) -> Result<()> {
    let mut session = open_session(&args)?;

    for path in &args.rule_sets {
        let rule_set: RuleSet = serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid rule set definition {}", path.display()))?;
        session.import_rule_set(rule_set)?;
    }
    for list in &args.lists {
        let rule_set = RuleSet::manual_list(&args.language, &list.label, &read(&list.path)?);
        session.add_rule_set(rule_set)?;
    }
    if let Some(path) = &args.stopwords {
        session.add_rule_set(RuleSet::stopwords(&args.language, &read(path)?))?;
    }
    if session.rule_sets().is_empty() {
        bail!("no rule sets given; use --rule-set, --list, --stopwords or --store");
    }

    let kind = DocumentKind::UnlabeledInput;
    session
        .load_document(kind, read(&args.input)?, args.format)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    let progress: &dyn ProgressSink = &LogSink;
    session.annotate(kind, Some(progress))?;

    let document = session
        .document(kind)
        .context("labeled document is missing from the session")?;
    let annotation = document
        .annotation()
        .context("labeled document has no annotation")?;

    if args.matches {
        let views = document
            .token_matches()
            .context("labeled document has no annotation")?;
        return emit(args.output.as_deref(), &serde_json::to_string_pretty(&views)?);
    }

    let predicted = annotation.tags.as_slice();
    if let Some(gold) = document.gold() {
        let report = Evaluator::new(session.settings().outside_label.clone())
            .evaluate(gold, predicted)?;
        tracing::info!(
            precision = report.overall.precision,
            recall = report.overall.recall,
            f1 = report.overall.f1,
            "Scored against gold labels"
        );
    }

    let text = ConllWriter::new().write(document.tokens(), document.gold(), Some(predicted))?;
    emit(args.output.as_deref(), &text)
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let parsed = ConllParser::new(args.format)?
        .with_columns(LabelColumns::GoldAndPredicted)
        .parse(&read(&args.input)?)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    let (Some(gold), Some(predicted)) = (&parsed.gold, &parsed.predicted) else {
        bail!("{} has no label columns", args.input.display());
    };

    let report = Evaluator::new(args.outside.clone()).evaluate(gold, predicted)?;
    let errors = ErrorAnalyzer::new(args.outside).analyze(&parsed.tokens, predicted, gold, args.top)?;

    if args.json {
        let value = serde_json::json!({ "report": report, "errors": errors });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_report(parsed.tokens.len(), &report);
        print_errors(&errors);
    }
    Ok(())
}

fn print_report(tokens: usize, report: &EvaluationReport) {
    let overall = &report.overall;
    println!(
        "processed {tokens} tokens with {} phrases; found: {} phrases; correct: {}.",
        overall.gold, overall.predicted, overall.correct
    );
    println!(
        "accuracy: {:6.2}%; precision: {:6.2}%; recall: {:6.2}%; FB1: {:6.2}",
        report.token_accuracy * 100.0,
        overall.precision * 100.0,
        overall.recall * 100.0,
        overall.f1 * 100.0
    );
    for (label, metrics) in &report.per_label {
        println!(
            "{label:>17}: precision: {:6.2}%; recall: {:6.2}%; FB1: {:6.2}  {}",
            metrics.precision * 100.0,
            metrics.recall * 100.0,
            metrics.f1 * 100.0,
            metrics.predicted
        );
    }
}

fn print_errors(errors: &ErrorAnalysis) {
    for (title, list) in [
        ("Precision errors", &errors.precision_errors),
        ("Recall errors", &errors.recall_errors),
    ] {
        println!();
        println!("{title}:");
        if list.is_empty() {
            println!("  none");
        }
        for error in list {
            println!("  {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let list = parse_list("LOC=lists/cities.txt").unwrap();
        assert_eq!(list.label, "LOC");
        assert_eq!(list.path, PathBuf::from("lists/cities.txt"));
        assert!(parse_list("cities.txt").is_err());
        assert!(parse_list("=cities.txt").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
