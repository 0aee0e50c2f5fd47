use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use console::style;
use miette::IntoDiagnostic;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pypisync_core::config::Config;
use pypisync_core::{http, DestinationLock, IndexClient, Resolver};

mod simple_index;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON config file
    #[clap(short = 'c', long, default_value = "./pypisync.conf")]
    config: PathBuf,

    /// Lay out mirrored artifacts in the hash-sharded "simple" layout and
    /// emit a PEP 503 index alongside them
    #[clap(short = 's')]
    simple_layout: bool,

    /// Write the dependency graph to ./graph.dot after a successful run
    #[clap(short = 'g')]
    graph: bool,

    /// Verbose logging
    #[clap(short = 'd')]
    debug: bool,

    /// Disable the per-project info cache. Recognized for surface
    /// compatibility with the historical CLI; this run's cache is
    /// process-scoped only, so there is nothing for this flag to disable.
    #[clap(short = 'n', long = "no-cache")]
    no_cache: bool,
}

async fn actual_main() -> miette::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| get_default_env_filter(args.debug)),
        )
        .init();

    let _ = args.no_cache;

    let config_text = std::fs::read_to_string(&args.config).into_diagnostic()?;
    let config = Config::from_json(&config_text).into_diagnostic()?;

    let _lock = DestinationLock::acquire(&config.lock_path()).into_diagnostic()?;

    let client = http::build_client().into_diagnostic()?;
    let index = Arc::new(IndexClient::new(client.clone(), config.endpoint.clone()));
    let resolver = Resolver::new(
        client,
        index,
        config.destination_folder.clone(),
        args.simple_layout,
        &config,
    );

    let started = Instant::now();
    let (downloaded, graph) = resolver.run().await;
    let elapsed = started.elapsed();

    tracing::info!(
        packages = downloaded.len(),
        nodes = graph.node_count(),
        elapsed_secs = elapsed.as_secs_f64(),
        "mirror run complete"
    );
    println!(
        "mirrored {} artifact(s) in {:.1}s",
        style(downloaded.len()).bold(),
        elapsed.as_secs_f64()
    );

    if args.simple_layout {
        simple_index::emit(&config.destination_folder, &downloaded).into_diagnostic()?;
    }

    if args.graph {
        std::fs::write("./graph.dot", graph.to_dot()).into_diagnostic()?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = actual_main().await {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

/// Default filter when `RUST_LOG` isn't set: `info` for this crate's own
/// targets, `debug` when `-d` is passed, and `info` for every dependency
/// either way.
fn get_default_env_filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    EnvFilter::new(format!("pypisync={level}"))
        .add_directive(Directive::from_str(&format!("pypisync_core={level}")).unwrap())
}
