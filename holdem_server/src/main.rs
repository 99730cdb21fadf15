//! Multi-table holdem host using the async actor model.
//!
//! Spawns TableActor instances managed by TableManager and drives them with
//! JSON commands read from stdin.

mod config;
mod console;
mod logging;

use anyhow::Error;
use config::ServerConfig;
use console::Console;
use holdem::table::TableManager;
use log::{error, info};
use pico_args::Arguments;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};

const HELP: &str = "\
Host holdem tables driven by JSON commands on stdin

USAGE:
  holdem_server [OPTIONS]

OPTIONS:
  --tables     N           Number of tables to create  [default: env MAX_TABLES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  MAX_TABLES               Number of tables to create
  TABLE_MAX_PLAYERS        Seats per table (2-9)
  TABLE_SMALL_BLIND        Small blind
  TABLE_BIG_BLIND          Big blind
  TABLE_INITIAL_CHIPS      Starting stack
  TABLE_SPEED              normal, turbo or hyper
  TABLE_TURN_TIMEOUT_SECS  Per-turn clock override, 0 disables it
  RUST_LOG                 Log filter, logs go to stderr
  (A .env file in the working directory is loaded first)

COMMANDS (one JSON object per line):
  {\"cmd\":\"join\",\"table\":1,\"player\":\"p1\",\"name\":\"Ann\"}
  {\"cmd\":\"start\",\"table\":1}
  {\"cmd\":\"action\",\"table\":1,\"player\":\"p1\",\"action\":{\"type\":\"raise\",\"amount\":40}}
  {\"cmd\":\"view\",\"table\":1,\"player\":\"p1\"}
  {\"cmd\":\"leave\",\"table\":1,\"player\":\"p1\"}
  {\"cmd\":\"tables\"}
";

struct Args {
    num_tables: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        num_tables: pargs.opt_value_from_str("--tables")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.num_tables)?;
    config.validate()?;

    let table_manager = TableManager::new();

    info!("Creating {} table(s)...", config.num_tables);
    for i in 0..config.num_tables {
        match table_manager.create_table(config.table_config(i)).await {
            Ok(table_id) => info!("Created table {} with ID {}", i + 1, table_id),
            Err(e) => error!("Failed to create table {}: {}", i + 1, e),
        }
    }

    info!("Active tables:");
    for table in table_manager.list_tables().await {
        info!(
            "  - {} (ID: {}) - {}/{} players, blinds: {}/{}, {} speed",
            table.table_name,
            table.table_id,
            table.player_count,
            table.max_players,
            table.small_blind,
            table.big_blind,
            table.speed
        );
    }

    // Every stdout line goes through one writer task.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                break;
            }
        }
    });

    let console = Console::new(table_manager.clone(), out_tx.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Ready. Reading commands from stdin, Ctrl+C to stop.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = console.handle_line(&line).await;
                if out_tx.send(response.to_line()).await.is_err() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Shutting down...");
    for table in table_manager.list_tables().await {
        if let Err(e) = table_manager.close_table(table.table_id).await {
            error!("Failed to close table {}: {}", table.table_id, e);
        }
    }

    // Closing the tables ends every forwarding task, which lets the writer drain.
    drop(console);
    drop(out_tx);
    let _ = writer.await;

    Ok(())
}
