use std::future::Future;
use std::io::{stderr, stdout, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use paysim_console::api::paysim::PaySimClient;
use paysim_console::commands::{self, router::Route, Outcome};
use paysim_console::query::{QueryClient, QueryState};
use paysim_console::utils::status_hint;
use paysim_console::{Config, Console};

fn init_tracing() {
    // Console pages go to stdout, diagnostics to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("paysim_console=info,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(stderr)
        .init();
}

/// Drive `work` to completion, printing screens the console emits meanwhile
async fn with_updates<F: Future>(work: F, updates: &mut UnboundedReceiver<String>) -> F::Output {
    tokio::pin!(work);
    let output = loop {
        tokio::select! {
            biased;
            Some(update) = updates.recv() => println!("{}", update),
            output = &mut work => break output,
        }
    };
    // anything still queued predates the screen `work` produced
    while updates.try_recv().is_ok() {}
    output
}

fn prompt(route: &Route) {
    print!("paysim {}> ", route.path());
    let _ = stdout().flush();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting PaySim console...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let client = match PaySimClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using sandbox API at {}", config.api_url);

    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel::<String>();
    let mut console = Console::new(Arc::new(client), Arc::new(QueryClient::new()), updates_tx);
    console.start();

    if let QueryState::Failed(e) = console.health().await {
        warn!("{} at {}: {}", status_hint(&e), config.api_url, e);
    }

    let screen = with_updates(console.render(), &mut updates_rx).await;
    println!("{}", screen);
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(console.route());

        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match with_updates(commands::handle_line(&mut console, &line), &mut updates_rx).await {
                    Ok(Outcome::Output(text)) => {
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Ok(Outcome::Quit) => break,
                    Err(e) => {
                        warn!("Command failed: {}", e);
                        println!("! {}", e);
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            Some(update) = updates_rx.recv() => {
                // a poller aborted mid-tick can still deliver one late screen
                if *console.route() == Route::Dashboard {
                    println!("\n{}", update);
                }
            }
        }
    }

    console.stop();
    info!("PaySim console stopped");
}
