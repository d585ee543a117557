use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use writeup::config::{self, ConfigResult};
use writeup::runtime::{self, HostCommand};
use writeup::session::SessionView;
use writeup::store::{self, FileStore, KeyValueStore, MemoryStore};

/// Write with live suggestions from a text generation service
///
/// Type a line to add it to the document as a finished word or phrase.
/// Commands: :up :down :pick :choose <index> :esc :set <name> <value> :quit
#[derive(Debug, Parser)]
#[command(name = "writeup", version)]
struct Args {
    /// Config file to use instead of ~/.config/writeup/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service endpoint, overriding the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let ConfigResult {
        mut config,
        warning,
    } = match &args.config {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };
    if let Some(warning) = warning {
        log::warn!("{}", warning);
    }
    if let Some(endpoint) = args.endpoint {
        config.server.endpoint = endpoint;
    }

    let mut store: Box<dyn KeyValueStore> = match store::store_path() {
        Some(path) => Box::new(FileStore::open(path)),
        None => {
            log::warn!("No home directory; the document will not be saved");
            Box::new(MemoryStore::new())
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = rt.block_on(async {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_commands(command_tx));
        let printer = tokio::spawn(print_views(view_rx));

        let result = runtime::run_session(&config, store.as_mut(), command_rx, view_tx).await;
        let _ = printer.await;
        result
    });

    // The stdin reader may still be parked on a blocking read
    rt.shutdown_background();

    result?;
    Ok(())
}

async fn read_commands(commands: mpsc::UnboundedSender<HostCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match runtime::parse_line(&line) {
            Ok(parsed) => {
                for command in parsed {
                    if commands.send(command).is_err() {
                        return;
                    }
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

async fn print_views(mut views: mpsc::UnboundedReceiver<SessionView>) {
    let mut last: Option<SessionView> = None;
    while let Some(view) = views.recv().await {
        if last.as_ref() == Some(&view) {
            continue;
        }
        print_view(&view);
        last = Some(view);
    }
}

fn print_view(view: &SessionView) {
    let mut status = view.connection.to_string();
    if view.degraded {
        status.push_str(", degraded");
    }
    if view.waiting {
        status.push_str(", waiting");
    }

    println!("--- [{}]", status);
    println!("{}", view.document);
    for (i, candidate) in view.candidates.iter().enumerate() {
        let marker = if view.selected == Some(i) { '>' } else { ' ' };
        println!("{} [{}] {}", marker, i, candidate);
    }
}
