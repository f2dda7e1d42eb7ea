//! Driving Behavior Monitor
//!
//! Replays a recorded session (newline-delimited JSON) through the
//! behavior engine and writes every driving event as a JSON line.

pub mod config;
pub mod replay;

pub use config::{ConfigError, LoggingConfig, MonitorConfig, ReplayConfig, Sensitivity};
pub use replay::{ReplayRecord, ReplaySources};

use std::sync::Arc;
use std::time::Duration;

use behavior_engine::{BehaviorEngine, DrivingEvent, EngineError};
use context_adapter::{HttpContextAdapter, LookupError};
use sensor_source::{Clock, ManualClock, TokioClock};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Context adapter error: {0}")]
    Context(#[from] LookupError),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Event writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// Install the global subscriber; logs go to stderr so stdout stays a
/// clean event stream. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Counters reported at the end of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub records: u64,
    pub skipped: u64,
    pub events: u64,
}

/// Replay `reader` through a fresh engine, writing events to `writer`.
///
/// The engine clock starts at the first record's timestamp. At recorded
/// pace it follows tokio time; with `replay.fast` it jumps to each record's
/// timestamp instead. Either way, once input ends every hold whose deadline
/// falls within `drain_ms` of the last record is released before shutdown.
pub async fn run<R, W>(
    config: &MonitorConfig,
    reader: R,
    writer: W,
) -> Result<ReplaySummary, MonitorError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = reader.lines();
    let mut summary = ReplaySummary::default();

    // The first record fixes the time origin
    let first = loop {
        let Some(line) = lines.next_line().await? else {
            info!("Replay input is empty");
            return Ok(summary);
        };
        match ReplayRecord::parse_line(&line) {
            Ok(Some(record)) => break record,
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                summary.skipped += 1;
            }
        }
    };
    let first_ms = first.timestamp_ms();
    let origin = Instant::now();

    let sample_clock = config.replay.fast.then(|| ManualClock::new(first_ms));
    let clock: Arc<dyn Clock> = match &sample_clock {
        Some(clock) => Arc::new(clock.clone()),
        None => Arc::new(TokioClock::starting_at(first_ms)),
    };

    let sources = ReplaySources::new(config.replay.channel_capacity);
    let mut engine = BehaviorEngine::new(config.engine.clone())?.with_clock(clock);
    if config.context_enabled {
        let adapter = HttpContextAdapter::new(config.context.clone())?;
        engine = engine.with_context(Arc::new(adapter));
    }

    let (handle, events) = engine.start(sources.samples.clone(), sources.positions.clone())?;
    let writer_task = tokio::spawn(write_events(events, writer));

    info!(
        "Replaying from {}ms ({} pace)",
        first_ms,
        if config.replay.fast { "fast" } else { "recorded" }
    );

    let mut pending = Some(first);
    let mut last_ms = first_ms;
    loop {
        let record = match pending.take() {
            Some(record) => record,
            None => {
                let Some(line) = lines.next_line().await? else {
                    break;
                };
                match ReplayRecord::parse_line(&line) {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Skipping malformed record: {}", e);
                        summary.skipped += 1;
                        continue;
                    }
                }
            }
        };

        let ts = record.timestamp_ms();
        match &sample_clock {
            Some(clock) => clock.set(ts.max(clock.now_ms())),
            None => {
                let offset = ts.saturating_sub(first_ms);
                tokio::time::sleep_until(origin + Duration::from_millis(offset)).await;
            }
        }
        last_ms = last_ms.max(ts);
        sources.publish(record, &handle);
        summary.records += 1;
    }

    let drain_ms = config.drain_ms();
    if sample_clock.is_none() {
        tokio::time::sleep(Duration::from_millis(drain_ms)).await;
    }
    // Timers racing the drain, or never due on the sample clock, end here
    handle.settle(last_ms.saturating_add(drain_ms));
    handle.shutdown().await;

    summary.events = writer_task.await??;
    Ok(summary)
}

/// Write each event as one JSON line; ends when the engine stops
async fn write_events<W>(
    mut events: mpsc::Receiver<DrivingEvent>,
    mut writer: W,
) -> Result<u64, MonitorError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driving_events::{AngularState, LateralState};
    use tokio::io::AsyncReadExt;

    async fn replay(config: &MonitorConfig, input: &str) -> (ReplaySummary, Vec<DrivingEvent>) {
        let (writer, mut output) = tokio::io::duplex(1 << 16);
        let summary = run(config, input.as_bytes(), writer).await.unwrap();

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        let events = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (summary, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_emits_held_sharp_turn() {
        let input = r#"
# recorded on the ring road
{"kind":"gyro","timestamp_ms":1000,"x":0,"y":0,"z":2.0}
not json
{"kind":"accel","timestamp_ms":1500,"x":2.6,"y":0,"z":0}
"#;
        let (summary, events) = replay(&MonitorConfig::default(), input).await;

        assert_eq!(
            summary,
            ReplaySummary {
                records: 2,
                skipped: 1,
                events: 3
            }
        );
        assert_eq!(
            events,
            vec![
                DrivingEvent::Angular {
                    timestamp_ms: 1000,
                    state: AngularState::SharpTurn
                },
                DrivingEvent::Lateral {
                    timestamp_ms: 1500,
                    state: LateralState::Drift
                },
                DrivingEvent::Angular {
                    timestamp_ms: 4000,
                    state: AngularState::Stable
                },
            ]
        );
    }

    async fn turn_as_final_record(fast: bool) -> Vec<DrivingEvent> {
        let input = concat!(
            r#"{"kind":"accel","timestamp_ms":0,"x":0,"y":0,"z":0}"#,
            "\n",
            r#"{"kind":"gyro","timestamp_ms":60000,"x":0,"y":0,"z":2.0}"#,
            "\n",
        );
        let mut config = MonitorConfig::default();
        config.replay.fast = fast;
        let (summary, events) = replay(&config, input).await;
        assert_eq!(summary.records, 2);
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_on_final_record_released_at_recorded_pace() {
        assert_eq!(
            turn_as_final_record(false).await,
            vec![
                DrivingEvent::Angular {
                    timestamp_ms: 60_000,
                    state: AngularState::SharpTurn
                },
                DrivingEvent::Angular {
                    timestamp_ms: 63_000,
                    state: AngularState::Stable
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_turn_on_final_record_released_in_fast_mode() {
        let started = std::time::Instant::now();
        assert_eq!(
            turn_as_final_record(true).await,
            vec![
                DrivingEvent::Angular {
                    timestamp_ms: 60_000,
                    state: AngularState::SharpTurn
                },
                DrivingEvent::Angular {
                    timestamp_ms: 63_000,
                    state: AngularState::Stable
                },
            ]
        );
        // Released from sample time, not by waiting out the hold
        assert!(started.elapsed() < Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_speed_from_fixes() {
        let input = concat!(
            r#"{"kind":"fix","timestamp_ms":0,"latitude":0.0,"longitude":0.0,"accuracy_m":3.0}"#,
            "\n",
            r#"{"kind":"fix","timestamp_ms":10000,"latitude":0.000899321,"longitude":0.0,"accuracy_m":3.0}"#,
            "\n",
        );
        let mut config = MonitorConfig::default();
        config.replay.drain_ms = Some(0);
        let (summary, events) = replay(&config, input).await;

        assert_eq!(summary.records, 2);
        match events.last() {
            Some(DrivingEvent::Speed {
                timestamp_ms,
                speed,
                positioning_available,
            }) => {
                assert_eq!(*timestamp_ms, 10_000);
                assert!(*positioning_available);
                assert!((speed.meters_per_second - 10.0).abs() < 0.01);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (summary, events) = replay(&MonitorConfig::default(), "\n# nothing\n").await;
        assert_eq!(summary, ReplaySummary::default());
        assert!(events.is_empty());
    }
}
