use crate::crew::OUTPUT_FILE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Research a topic on the web and write a markdown article about it"
)]
pub struct Args {
    /// Topic to research, prompted for on standard input when omitted
    #[arg(short, long)]
    pub topic: Option<String>,

    /// File the article is written to
    #[arg(short, long, default_value = OUTPUT_FILE)]
    pub output: PathBuf,

    /// Chat model used by both agents [env: LLM_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint serving the model [env: LLM_API_BASE]
    #[arg(long)]
    pub api_base: Option<String>,

    /// Environment file holding the API keys (defaults to ./.env when present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Directory receiving a markdown transcript of every task
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
