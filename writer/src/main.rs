mod cli;
mod config;
mod crew;
mod prompt;

use agent::Result;
use agent::llm::OpenAI;
use agent::tools::{SerperSearch, SharedTool};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    init_logging(args.verbose);

    config::load_env_file(args.env_file.as_deref())?;
    let settings = config::Settings::from_env(&args)?;

    println!("{}", prompt::WELCOME);
    let topic = match &args.topic {
        Some(topic) => prompt::validate_topic(topic)?,
        None => prompt::read_topic(std::io::stdin().lock(), std::io::stdout())?,
    };

    let llm = OpenAI::compatible(
        settings.model.clone(),
        &settings.api_base,
        &settings.google_api_key,
    );
    let search: SharedTool = Arc::new(SerperSearch::new(settings.serper_api_key.clone())?);

    let mut crew = crew::build_crew(&topic, llm, search, &args.output)?;
    if let Some(dir) = &args.log_dir {
        crew = crew.log_dir(dir);
    }

    info!(topic = %topic, model = %settings.model, output = %args.output.display(), "researching");

    let result = crew.kickoff().await?;

    prompt::report(std::io::stdout().lock(), &result)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("agent=debug,writer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agent=info,writer=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
