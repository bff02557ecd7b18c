use clap::Parser;
use log::{info, warn};

use tutorpad::{App, Commands, Config, KeyValueStore, Session, Settings};

/// Markdown note workspace with an AI teacher and text-to-speech.
#[derive(Parser)]
#[command(name = "tutorpad", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

pub fn initialize_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();
}

#[tokio::main]
async fn main() {
    initialize_logger();

    let cli = Cli::parse();
    let config = Config::load();

    let mut store = match KeyValueStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // External edits to the store directory evict cached entries. Losing the
    // watcher only costs cache freshness, so it is not fatal.
    if let Err(e) = store.watch() {
        warn!("Store watcher unavailable: {}", e);
    }

    let settings = Settings::load(&store);
    let session = Session::open(store, config.autosave_delay);

    info!("Workspace opened at {}", config.data_dir.display());

    let mut app = App::new(session, config, settings);
    if let Err(e) = app.run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
