use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use soql_compiler::config::{CliOverrides, CompilerConfig, TargetVersion};
use soql_compiler::field_rewriter::CollectingSink;
use soql_compiler::query_plan::QueryPlan;
use soql_compiler::soql_generator::{SalesforceDialect, SoqlCompiler};

/// soqlc - compile a relational query plan (JSON) to SOQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Query plan file in JSON
    plan: PathBuf,

    /// YAML configuration file; SOQL_* environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render every query with minimal aliases
    #[arg(long)]
    minimal_aliases: bool,

    /// Fail on fragments that cannot be rewritten
    #[arg(long)]
    strict: bool,

    /// Leave LIMIT and OFFSET out of the query
    #[arg(long)]
    no_limits: bool,

    /// Name unaliased columns Col1, Col2, ...
    #[arg(long)]
    col_aliases: bool,

    /// Target version, e.g. 4.2
    #[arg(long)]
    target_version: Option<TargetVersion>,

    /// Compile as if inside a transaction block (allows FOR UPDATE)
    #[arg(long)]
    in_transaction: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        CliOverrides {
            minimal_aliases: cli.minimal_aliases,
            strict_fragments: cli.strict,
            chunk_size: None,
            target_version: cli.target_version,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CompilerConfig> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CompilerConfig::from_env().context("reading SOQL_* environment")?,
    };
    config.apply_cli(&CliOverrides::from(cli))?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Defaults to WARN so rewrite warnings are visible; override with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::debug!("soqlc: {:?}", config);

    let text = std::fs::read_to_string(&cli.plan)
        .with_context(|| format!("reading {}", cli.plan.display()))?;
    let mut plan: QueryPlan = serde_json::from_str(&text)
        .with_context(|| format!("parsing query plan {}", cli.plan.display()))?;

    let dialect = if cli.in_transaction {
        SalesforceDialect::new().in_transaction()
    } else {
        SalesforceDialect::new()
    };
    let sink = CollectingSink::new();
    let query = SoqlCompiler::new(&mut plan, &dialect, &config)
        .with_sink(&sink)
        .as_sql(!cli.no_limits, cli.col_aliases)?;

    if cli.json {
        let warnings: Vec<String> = sink.warnings().iter().map(|w| w.to_string()).collect();
        let output = serde_json::json!({
            "sql": query.sql,
            "params": query.params,
            "empty": query.is_empty(),
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if query.is_empty() {
        println!("-- query matches no rows, nothing to send");
        return Ok(());
    }
    println!("{}", query.sql);
    if !query.params.is_empty() {
        let params: Vec<String> = query.params.iter().map(|p| p.to_string()).collect();
        println!("-- params: [{}]", params.join(", "));
    }
    Ok(())
}
