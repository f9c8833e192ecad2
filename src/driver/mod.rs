//! Runs a [`Simulation`] as a single-owner task. Joins, orders, ticks and
//! snapshot reads all go through one command channel, so an order is
//! either seen by the next tick in full or left for the one after.

use std::time::Duration;

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    engine::{Simulation, TickSummary},
    orders::OrderError,
    world::{PlayerId, Position, WorldSnapshot},
};

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Cadence of the built-in timer. `None` or a zero duration leaves
    /// ticking to [`SimulationHandle::tick`].
    pub tick_interval: Option<Duration>,
    /// Stop after this many timer or manual ticks.
    pub max_ticks: Option<u64>,
    pub command_capacity: usize,
    pub frame_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Some(Duration::from_secs(1)),
            max_ticks: None,
            command_capacity: 256,
            frame_capacity: 64,
        }
    }
}

/// Published after every tick for rendering sinks.
#[derive(Debug, Clone)]
pub struct Frame {
    pub summary: TickSummary,
    pub snapshot: WorldSnapshot,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("simulation task has stopped")]
    Closed,
}

enum Command {
    Join {
        reply: oneshot::Sender<PlayerId>,
    },
    QueueOrder {
        player: PlayerId,
        from: Position,
        to: Position,
        reply: oneshot::Sender<Result<(), OrderError>>,
    },
    Tick {
        reply: oneshot::Sender<TickSummary>,
    },
    Snapshot {
        reply: oneshot::Sender<WorldSnapshot>,
    },
    Shutdown,
}

#[derive(Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    frames: broadcast::Sender<Frame>,
}

impl SimulationHandle {
    /// Returns [`PlayerId::NEUTRAL`] when the roster is full.
    pub async fn join(&self) -> Result<PlayerId, DriverError> {
        self.request(|reply| Command::Join { reply }).await
    }

    pub async fn queue_order(
        &self,
        player: PlayerId,
        from: Position,
        to: Position,
    ) -> Result<(), DriverError> {
        self.request(|reply| Command::QueueOrder {
            player,
            from,
            to,
            reply,
        })
        .await??;
        Ok(())
    }

    pub async fn tick(&self) -> Result<TickSummary, DriverError> {
        self.request(|reply| Command::Tick { reply }).await
    }

    pub async fn snapshot(&self) -> Result<WorldSnapshot, DriverError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| DriverError::Closed)
    }

    /// Resolves once the simulation task has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }

    /// Frames published from now on. Lagging subscribers skip frames
    /// instead of stalling the simulation.
    pub fn frames(&self) -> impl Stream<Item = Frame> {
        BroadcastStream::new(self.frames.subscribe()).filter_map(|frame| frame.ok())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| DriverError::Closed)?;
        response.await.map_err(|_| DriverError::Closed)
    }
}

/// Spawns the simulation task. The join handle yields the simulation
/// back once it stops.
pub fn spawn(simulation: Simulation, config: DriverConfig) -> (SimulationHandle, JoinHandle<Simulation>) {
    let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
    let (frames, _) = broadcast::channel(config.frame_capacity.max(1));
    let handle = SimulationHandle {
        commands,
        frames: frames.clone(),
    };
    let task = tokio::spawn(run(simulation, receiver, frames, config));
    (handle, task)
}

async fn run(
    mut simulation: Simulation,
    mut commands: mpsc::Receiver<Command>,
    frames: broadcast::Sender<Frame>,
    config: DriverConfig,
) -> Simulation {
    let period = config.tick_interval.filter(|period| !period.is_zero());
    if config.tick_interval.is_some() && period.is_none() {
        warn!("zero tick interval, timer disabled");
    }
    let mut timer = period.map(|period| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let mut ticks_run = 0_u64;

    info!(
        scenario = %simulation.settings().scenario_name,
        interval_ms = period.map(|d| d.as_millis() as u64),
        "simulation started"
    );

    loop {
        if config.max_ticks.is_some_and(|max| ticks_run >= max) {
            break;
        }
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Join { reply } => {
                        let _ = reply.send(simulation.join());
                    }
                    Command::QueueOrder { player, from, to, reply } => {
                        let result = simulation.queue_order(player, from, to);
                        if let Err(err) = &result {
                            debug!(player = %player, %err, "order rejected");
                        }
                        let _ = reply.send(result);
                    }
                    Command::Tick { reply } => {
                        let summary = tick(&mut simulation, &frames);
                        ticks_run += 1;
                        let _ = reply.send(summary);
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(simulation.snapshot());
                    }
                    Command::Shutdown => break,
                }
            }
            _ = next_tick(&mut timer) => {
                tick(&mut simulation, &frames);
                ticks_run += 1;
            }
        }
    }

    info!(tick = simulation.current_tick(), "simulation stopped");
    simulation
}

fn tick(simulation: &mut Simulation, frames: &broadcast::Sender<Frame>) -> TickSummary {
    let summary = simulation.advance_tick();
    if frames.receiver_count() > 0 {
        let _ = frames.send(Frame {
            summary: summary.clone(),
            snapshot: simulation.snapshot(),
        });
    }
    summary
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
