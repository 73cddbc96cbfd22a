// banana: edit an image by describing the change, one version at a time.

mod commands;
mod logging;
mod repl;
mod settings;

use anyhow::Context;
use banana_ai::GeminiBackend;
use banana_session::Workspace;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "banana", version, about = "Edit images with natural-language instructions")]
struct Args {
    /// JSON file with backend settings (api_key, model, base_url, timeout_secs).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model to use instead of the configured one.
    #[arg(long)]
    model: Option<String>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Image to load on start.
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Log level when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let overrides = settings::Overrides {
        model: args.model.clone(),
        timeout_secs: args.timeout_secs,
    };
    let config = settings::resolve(args.config.as_deref(), &overrides)?;
    let backend = GeminiBackend::new(config).context("set up Gemini backend")?;
    let ws = Workspace::new(backend);

    if let Some(path) = &args.input {
        let image = repl::load(&ws, path)?;
        println!("loaded {} ({} bytes)", path.display(), image.content().len());
    }
    println!("type `help` for commands");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(&ws, stdin, &mut stdout).await
}
