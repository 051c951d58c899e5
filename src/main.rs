use anyhow::{Context, Result};
use clap::Parser;
use scholar::cli::{Cli, SummaryFormat};
use scholar::compiler::Compiler;
use scholar::config::CompilerConfig;
use scholar::lookup::{ContextValue, Lookup, TuningSlot};
use scholar::store::TrialStore;
use scholar::variable::{TypedValue, VariableId};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings always, everything with --debug
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Answer one query against a compiled artifact
fn probe(path: &Path, context: &[(VariableId, String)]) -> Result<()> {
    let lookup = Lookup::load(path)
        .with_context(|| format!("Failed to load artifact: {}", path.display()))?;
    let table = lookup.table();

    let mut values = Vec::with_capacity(context.len());
    for (id, text) in context {
        let Some(slot) = table.inputs.iter().find(|s| s.variable == *id) else {
            anyhow::bail!("Variable {} is not an input of problem {}", id, table.problem);
        };
        let value = TypedValue::parse(text, slot.value_type)
            .map_err(|e| anyhow::anyhow!("Variable {} ({}): {}", id, slot.name, e))?;
        values.push(ContextValue::new(*id, value));
    }

    let mut slots: Vec<TuningSlot> = table
        .outputs
        .iter()
        .map(|s| TuningSlot::new(s.variable))
        .collect();
    match lookup.recommend_into(&values, &mut slots) {
        Ok(index) => {
            println!("bucket {}", index);
            for (slot, filled) in table.outputs.iter().zip(&slots) {
                if let Some(value) = filled.value {
                    println!("{} = {}", slot.name, value);
                }
            }
        }
        Err(miss) => println!("no recommendation: {}", miss),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Some(path) = &cli.probe {
        return probe(path, &cli.context);
    }

    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_toml_file(path)?,
        None => CompilerConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }

    if !config.database.exists() {
        anyhow::bail!("Trial store not found: {}", config.database.display());
    }
    let store = TrialStore::open(&config.database)
        .with_context(|| format!("Failed to open trial store: {}", config.database.display()))?;
    let catalog = store.load_catalog().context("Failed to load trial store")?;

    let compilation = Compiler::new(&catalog, &config)
        .compile_all()
        .context("Compilation failed, no artifacts written")?;
    let summary = compilation
        .write(&config.output_dir, config.format)
        .context("Failed to write artifacts")?;

    match cli.summary {
        SummaryFormat::Text => println!("{}", summary.to_report_string()),
        SummaryFormat::Json => println!("{}", summary.to_json()?),
    }
    Ok(())
}
