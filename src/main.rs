//! essence-survey - ask several LLMs the same question, many times
//!
//! Every configured provider answers one message under every system prompt
//! variant; one provider then names the essence of each batch of replies.

mod app;
mod config;
mod error;
mod llm;
mod survey;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::Config;
use survey::FINAL_REPORT_TITLE;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Samples per provider/prompt combination
    #[arg(short = 'n', long, env = "NUM_REQUESTS")]
    samples: Option<u32>,

    /// Output directory for responses and reports
    #[arg(short, long)]
    output: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(samples) = args.samples {
        config.survey.sample_count = samples;
    }
    if let Some(output) = args.output {
        config.output.directory = PathBuf::from(output);
    }

    let app = App::new(config)?;
    let lines = match app.run().await {
        Ok(lines) => lines,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            return Err(err);
        }
    };

    println!("\n{}", FINAL_REPORT_TITLE);
    println!("{}", "=".repeat(60));
    for line in &lines {
        println!("{}", line);
    }

    Ok(())
}
