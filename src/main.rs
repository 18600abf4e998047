use std::sync::Arc;

use hydrate_engine::{
    config, logging,
    notification::{StaticAuthorizer, TracingSink},
    paths,
    storage::FileSettingsStore,
    tasks::watch_day_changes,
    HydrationEngine,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Notify,
};
use tracing::{error, info, warn};

/// What a bare `drink` logs, in milliliters
const DEFAULT_DRINK_ML: u32 = 200;

fn handle_command(engine: &HydrationEngine, line: &str) -> bool {
    let volume = match line.trim() {
        "" => return true,
        "quit" => return false,
        "status" => {
            match serde_json::to_string_pretty(&engine.snapshot()) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Unable to render status: {e}"),
            }
            return true;
        }
        "drink" => DEFAULT_DRINK_ML,
        other => match other.parse::<u32>() {
            Ok(ml) => ml,
            Err(_) => {
                println!("Unknown command: {other} (try `drink`, a volume in ml, `status` or `quit`)");
                return true;
            }
        },
    };

    match engine.log_intake(volume) {
        Ok(logged) => println!(
            "🥛 {}ml logged, {}ml today",
            logged.event.volume_ml, logged.today_total_ml
        ),
        Err(e) => println!("{e}"),
    }
    true
}

#[tokio::main]
async fn main() {
    let _log_guard = match paths::log_dir() {
        Ok(dir) => Some(logging::init_logging("info", &dir)),
        Err(e) => {
            eprintln!("Logging to file disabled: {e}");
            None
        }
    };

    let config = match paths::config_file_path().map(|path| config::load_config(&path)) {
        Ok(Ok(config)) => Some(config),
        Ok(Err(e)) => {
            warn!("{e}, using stored settings");
            None
        }
        Err(e) => {
            warn!("{e}, using stored settings");
            None
        }
    };

    let store = match FileSettingsStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            error!("Unable to open settings: {e}");
            return;
        }
    };
    info!("Settings at {:?}", store.path());

    let mut builder = HydrationEngine::builder(Arc::new(store), Arc::new(TracingSink));
    if let Some(config) = config {
        builder = builder.config(config);
    }
    let engine = match builder.build() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Unable to start: {e}");
            return;
        }
    };

    let mut changes = engine.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let snapshot = changes.borrow_and_update().clone();
            info!(
                "{}/{}ml today, {} day streak",
                snapshot.today_intake_ml, snapshot.daily_goal_ml, snapshot.streak_days
            );
        }
    });

    let _ = engine.request_permission(Arc::new(StaticAuthorizer(true)));

    let shutdown = Arc::new(Notify::new());
    let day_watch = tokio::spawn(watch_day_changes(engine.clone(), shutdown.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !handle_command(&engine, &line) {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Unable to read input: {e}");
                break;
            }
        }
    }

    shutdown.notify_one();
    if let Err(e) = day_watch.await {
        warn!("Day watch ended abnormally: {e}");
    }
    if let Err(e) = engine.flush() {
        error!("Unable to save state: {e}");
    }
}
