use anyhow::{Context, Result};
use buildstall::cli::{Cli, OutputFormat};
use buildstall::config::AnalysisConfig;
use buildstall::pipeline::Analysis;
use buildstall::{csv_output, event_log, json_output, text_output};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let events = event_log::read_events(&args.event_log)
        .with_context(|| format!("Failed to load events from {}", args.event_log.display()))?;

    let analysis = Analysis::run(&events, &config);
    let sections = args.sections();

    let output = match args.format {
        OutputFormat::Text => text_output::render(&analysis, sections),
        OutputFormat::Json => {
            let mut json = json_output::render(&analysis, sections)
                .context("Failed to serialize JSON report")?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => csv_output::render(&analysis, sections),
    };

    print!("{}", output);
    Ok(())
}
