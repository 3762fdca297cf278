use std::error::Error;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use env_logger::Builder;
use log::{debug, info, LevelFilter};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use pced_rs::cli::{query_pced, Args, Command, RunOptions};
use pced_rs::{config, Controller, MemoryStore, Server, SqliteStore, Store};

async fn run(options: &RunOptions) -> Result<(), Box<dyn Error>> {
    let config = config::from_file(&options.config_path)?;
    debug!(
        "Found {} routers in {}",
        config.routers.len(),
        options.config_path
    );
    let store: Arc<dyn Store> = if options.ephemeral {
        info!("Running with an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        info!("Using store at {}", config.store_path.display());
        Arc::new(SqliteStore::open(&config.store_path)?)
    };
    let api_socket = config.api_socket;
    let controller = Controller::new(config, store).await?;
    let server = Server::new(controller.clone());
    let (_, api) = server.serve_rpc_api(api_socket).await?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!("Received signal {}, shutting down", signal);
            let _ = shutdown_tx.send(());
        }
    });

    tokio::select! {
        result = server.serve() => result?,
        _ = shutdown_rx => (),
    }
    controller.close_sessions().await;
    let _ = api.stop();
    info!("Shutdown complete");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let (pced_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };

    let runtime = Runtime::new()?;
    match &args.cmd {
        Command::Run(options) => {
            Builder::new()
                .filter(Some("pced"), pced_level)
                .filter(None, other_level)
                .init();
            info!("Logging at levels {}/{}", pced_level, other_level);
            runtime.block_on(run(options))?;
        }
        _ => runtime.block_on(query_pced(&args)),
    }
    Ok(())
}
