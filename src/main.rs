use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use generals::{
    client::{Cursor, Key},
    driver::{self, DriverConfig},
    world::WorldSnapshot,
    PlayerId, Scenario, ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Grid conquest simulation runner")]
struct Cli {
    /// Path to a scenario YAML file (built-in reference board when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Stop after this many ticks (runs until Ctrl+C when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Number of players to join (defaults to the scenario's max_players)
    #[arg(long)]
    players: Option<usize>,

    /// Keys fed to player 1's cursor, one per tick (w/a/s/d, space toggles order mode)
    #[arg(long, default_value = "")]
    keys: String,

    /// Log filter, overrides the scenario's logging level
    #[arg(long)]
    log_level: Option<String>,

    /// Print the final board as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::reference(),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| scenario.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let simulation = scenario.build_simulation()?;
    let interval = cli
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| scenario.tick_interval());
    if interval.is_zero() {
        bail!("tick interval must be greater than zero");
    }
    let config = DriverConfig {
        tick_interval: Some(interval),
        max_ticks: scenario.ticks(cli.ticks),
        ..DriverConfig::default()
    };
    let width = simulation.width();
    let height = simulation.height();
    let (handle, task) = driver::spawn(simulation, config);

    let mut joined = Vec::new();
    for _ in 0..cli.players.unwrap_or(scenario.max_players) {
        let id = handle.join().await?;
        if id.is_neutral() {
            tracing::warn!("join refused, roster is full");
            break;
        }
        joined.push(id);
    }

    let input = {
        let handle = handle.clone();
        let player = joined.first().copied().unwrap_or(PlayerId::NEUTRAL);
        let mut keys = cli.keys.chars().filter_map(Key::from_char).collect::<Vec<_>>().into_iter();
        let mut cursor = Cursor::new(width, height);
        let mut frames = Box::pin(handle.frames());
        tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                tracing::debug!(
                    tick = frame.summary.tick,
                    captures = frame.summary.captures.len(),
                    "frame"
                );
                let Some(key) = keys.next() else { continue };
                if let Some((from, to)) = cursor.press(key) {
                    if let Err(err) = handle.queue_order(player, from, to).await {
                        tracing::warn!(%err, "order not queued");
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = shutdown_signal() => {
            handle.shutdown().await.ok();
        }
        _ = handle.closed() => {}
    }

    let simulation = task.await.context("simulation task failed")?;
    input.abort();

    let snapshot = simulation.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    println!("{}", render(&snapshot));
    println!(
        "Scenario '{}' stopped after {} ticks.",
        snapshot.scenario, snapshot.tick
    );
    for player in &snapshot.players {
        println!("  player {player}: {} troops", snapshot.troops_of(*player));
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

fn render(snapshot: &WorldSnapshot) -> String {
    let mut out = String::new();
    for y in 0..snapshot.height {
        for x in 0..snapshot.width {
            let Some(tile) = snapshot.tile(x, y) else { continue };
            let marker = if tile.is_capital {
                'W'
            } else if tile.is_city {
                'm'
            } else {
                ' '
            };
            out.push_str(&format!("{}{marker}{:>4} ", tile.owner, tile.troops));
        }
        out.push('\n');
    }
    out
}
