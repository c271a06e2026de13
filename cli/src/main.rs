//! Semsearch CLI entry point

use clap::Parser;
use semsearch_cli::{list_models, render, run, Args};
use semsearch_core::SessionManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "semsearch=info,semsearch_cli=info,semsearch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.list_models {
        println!("{}", list_models());
        return;
    }

    let manager = SessionManager::new(args.session_config());

    match run(&manager, &args).await.and_then(|report| render(&report, args.json)) {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            tracing::error!("semsearch failed: {}", e);
            std::process::exit(1);
        }
    }
}
