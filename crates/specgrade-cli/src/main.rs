//! specgrade CLI
//!
//! Usage:
//!   specgrade grade <FILE> [--legacy] [--format json|text] [--fail-under <SCORE>]
//!   specgrade compare <FILE> [--format json|text]
//!   specgrade catalog check <FILE>
//!   specgrade hash <FILE>
//!
//! Exit codes:
//!   0 - Graded (or checked) successfully
//!   1 - Error (bad input, bad catalog, collaborator failure)
//!   2 - Graded below `--fail-under`, or blocked by prerequisites

mod telemetry;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use specgrade_core::{spec_hash, GradeReport, RuleCatalog, ScoringMode};
use specgrade_runtime::{GradingPipeline, ModeComparison, RefValidator, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "specgrade")]
#[command(about = "Grade OpenAPI documents against a weighted rule catalog")]
#[command(version)]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule catalog to grade against (overrides the config file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grade a document
    Grade(GradeArgs),

    /// Grade a document under both scoring modes and show the difference
    Compare {
        /// Path to the OpenAPI document (YAML or JSON)
        file: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Catalog utilities
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },

    /// Print the content hash of a document
    Hash {
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GradeArgs {
    /// Path to the OpenAPI document (YAML or JSON)
    file: PathBuf,

    /// Use legacy binary scoring with auto-fail
    #[arg(long)]
    legacy: bool,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Exit with code 2 when the total is below this score
    #[arg(long)]
    fail_under: Option<f64>,

    /// Skip the unresolved-$ref validator
    #[arg(long)]
    no_ref_check: bool,
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Validate a catalog file and print its summary
    Check {
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(catalog) = &cli.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::Grade(args) => grade(config, args).await,
        Commands::Compare { file, format } => compare(config, &file, format).await,
        Commands::Catalog {
            command: CatalogCommand::Check { file },
        } => check_catalog(&file),
        Commands::Hash { file } => hash(&file),
    }
}

async fn grade(config: RuntimeConfig, args: GradeArgs) -> Result<ExitCode> {
    let mode = args.legacy.then_some(ScoringMode::Legacy);
    let mut pipeline = GradingPipeline::from_config(config).await?;
    if !args.no_ref_check {
        pipeline.register_validator(Arc::new(RefValidator::new()));
    }

    let record = pipeline
        .grade_file(&args.file, mode)
        .await
        .with_context(|| format!("Failed to grade {}", args.file.display()))?;
    let report = &record.report;

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json_pretty()?),
        OutputFormat::Text => print!("{}", render_report(report)),
    }

    let below = args.fail_under.is_some_and(|min| report.total < min);
    if report.blocked_by_prerequisites || below {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn compare(config: RuntimeConfig, file: &Path, format: OutputFormat) -> Result<ExitCode> {
    let mut pipeline = GradingPipeline::from_config(config).await?;
    pipeline.register_validator(Arc::new(RefValidator::new()));

    let comparison = pipeline
        .compare_file(file)
        .await
        .with_context(|| format!("Failed to compare {}", file.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
        OutputFormat::Text => print!("{}", render_comparison(&comparison)),
    }
    Ok(ExitCode::SUCCESS)
}

fn check_catalog(file: &Path) -> Result<ExitCode> {
    let catalog = RuleCatalog::from_file(file)
        .with_context(|| format!("Invalid catalog {}", file.display()))?;

    println!("{}", catalog.version_label());
    if let Some(description) = catalog.description() {
        println!("  {}", description);
    }
    println!("  rules:      {}", catalog.len());
    println!("  categories: {}", catalog.categories().len());
    println!("  points:     {}", catalog.total_points());
    println!("  format:     {} {}", catalog.format().name, catalog.format().required);
    println!("  hash:       {}", catalog.content_hash());
    Ok(ExitCode::SUCCESS)
}

fn hash(file: &Path) -> Result<ExitCode> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", spec_hash(&source));
    Ok(ExitCode::SUCCESS)
}

fn render_report(report: &GradeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {:.2} ({:.2}% compliant), {} scoring, catalog {}",
        report.letter, report.total, report.compliance_pct, report.scoring_mode, report.catalog_version
    );

    if report.blocked_by_prerequisites {
        let _ = writeln!(out, "Blocked by prerequisites");
    }
    for reason in &report.auto_fail_reasons {
        let _ = writeln!(out, "Auto-fail: {}", reason);
    }

    if !report.per_category.is_empty() {
        let _ = writeln!(out);
        for (category, totals) in &report.per_category {
            let _ = writeln!(
                out,
                "  {:<16} {:>6.2} / {:<6.2} {:>6.2}%",
                category, totals.earned, totals.max, totals.percentage
            );
        }
    }

    if !report.findings.is_empty() {
        let _ = writeln!(out);
        for finding in &report.findings {
            let _ = writeln!(
                out,
                "  {:<5} {:<12} {}  {}",
                finding.severity, finding.rule_id, finding.location, finding.message
            );
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", report.spec_hash);
    out
}

fn render_comparison(comparison: &ModeComparison) -> String {
    let (legacy, coverage) = comparison.letters();
    let mut out = String::new();
    let _ = writeln!(out, "legacy:   {:>6.2} {}", comparison.legacy.total, legacy);
    let _ = writeln!(out, "coverage: {:>6.2} {}", comparison.coverage.total, coverage);
    let _ = writeln!(out, "delta:    {:>+6.2}", comparison.score_delta);
    if comparison.grade_changed {
        let _ = writeln!(out, "grade changed: {} -> {}", legacy, coverage);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use specgrade_core::{grade, RuleCatalog, SpecDocument};

    const SOURCE: &str = r#"{
        "openapi": "3.0.3",
        "info": {"title": "T", "version": "1.0.0", "x-api-id": "0b3a5c1e-7f7e-4d0a-9d3c-2f4b1c6e8a90"},
        "paths": {"/things": {"get": {"responses": {"200": {"description": "ok"}}}}}
    }"#;

    fn report(mode: ScoringMode) -> GradeReport {
        let doc = SpecDocument::parse(SOURCE).unwrap();
        let result = grade(&doc, &RuleCatalog::builtin().unwrap(), mode, &[]);
        GradeReport::new(&result, spec_hash(SOURCE))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "specgrade",
            "grade",
            "api.yaml",
            "--legacy",
            "--catalog",
            "rules.yaml",
            "--format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("rules.yaml")));
        match cli.command {
            Commands::Grade(args) => {
                assert!(args.legacy);
                assert_eq!(args.format, OutputFormat::Text);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_catalog_check_parses() {
        let cli = Cli::try_parse_from(["specgrade", "catalog", "check", "rules.yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Catalog {
                command: CatalogCommand::Check { .. }
            }
        ));
    }

    #[test]
    fn test_text_report_lists_findings_and_hash() {
        let report = report(ScoringMode::CoverageBased);
        let text = render_report(&report);
        assert!(text.contains("coverage-based scoring"));
        assert!(text.contains("SEC-001"));
        assert!(text.ends_with(&format!("{}\n", report.spec_hash)));
    }

    #[test]
    fn test_text_report_shows_auto_fail_reasons() {
        let text = render_report(&report(ScoringMode::Legacy));
        assert!(text.starts_with("F "));
        assert!(text.contains("Auto-fail: "));
    }
}
