//! Classifier worker loops
//!
//! Each worker owns its classifier outright and reacts to one input at a
//! time, so state transitions are totally ordered per classifier.

use std::sync::Arc;
use std::time::Duration;

use context_adapter::{describe_all, ContextProvider};
use driving_events::{
    AngularClassifier, AngularPhase, AngularState, HoldTimer, LateralClassifier, LateralState,
    LongitudinalClassifier,
};
use sensor_source::{Clock, PositionFix, PositionSource, SensorSample, Subscription};
use speed_estimator::SpeedEstimator;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::{DrivingEvent, EngineSnapshot};

/// Control message fanned out to every worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Recalibrate,
    /// End holds whose deadline has passed by this sample time
    Settle(u64),
    Shutdown,
}

/// What a worker should do after reading its command channel
enum Control {
    Continue,
    Recalibrate,
    Settle(u64),
    Stop,
}

fn read_command(result: Result<Command, broadcast::error::RecvError>) -> Control {
    match result {
        Ok(Command::Recalibrate) => Control::Recalibrate,
        Ok(Command::Settle(now_ms)) => Control::Settle(now_ms),
        Ok(Command::Shutdown) | Err(broadcast::error::RecvError::Closed) => Control::Stop,
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!("Worker missed {} commands", n);
            Control::Continue
        }
    }
}

/// Next item from an optional subscription; pends forever when absent
async fn next_or_pending<T: Clone>(subscription: &mut Option<Subscription<T>>) -> Option<T> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

fn release<T>(subscription: &mut Option<Subscription<T>>) {
    if let Some(mut sub) = subscription.take() {
        sub.unsubscribe();
    }
}

/// Shared plumbing handed to every worker
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub clock: Arc<dyn Clock>,
    pub events: mpsc::Sender<DrivingEvent>,
    pub snapshot: Arc<watch::Sender<EngineSnapshot>>,
}

impl WorkerContext {
    /// Forward an event; false once nobody is listening
    async fn emit(&self, event: DrivingEvent) -> bool {
        debug!("Emitting {:?}", event);
        self.events.send(event).await.is_ok()
    }
}

pub(crate) async fn run_longitudinal(
    mut classifier: LongitudinalClassifier,
    mut accel: Option<Subscription<SensorSample>>,
    mut gravity: Option<Subscription<SensorSample>>,
    mut commands: broadcast::Receiver<Command>,
    ctx: WorkerContext,
) {
    info!("Longitudinal worker started");

    loop {
        let before = classifier.state();
        let mut timestamp_ms = None;

        tokio::select! {
            // Inputs already queued are handled before a command
            biased;

            sample = next_or_pending(&mut accel) => match sample {
                Some(sample) => {
                    classifier.on_sample(&sample);
                    timestamp_ms = Some(sample.timestamp_ms);
                }
                None => {
                    warn!("Acceleration stream ended");
                    accel = None;
                }
            },
            sample = next_or_pending(&mut gravity) => match sample {
                Some(sample) => classifier.on_gravity(&sample),
                None => {
                    debug!("Gravity stream ended");
                    gravity = None;
                }
            },
            command = commands.recv() => match read_command(command) {
                Control::Continue | Control::Settle(_) => continue,
                Control::Stop => break,
                Control::Recalibrate => {
                    info!("Recalibration requested, next sample becomes the baseline");
                    classifier.request_calibration();
                }
            },
        }

        let after = classifier.state();
        let baseline = classifier.baseline();
        ctx.snapshot.send_modify(|s| {
            s.longitudinal = after;
            s.baseline = baseline;
        });

        if after != before {
            let timestamp_ms = timestamp_ms.unwrap_or_else(|| ctx.clock.now_ms());
            if !ctx
                .emit(DrivingEvent::Longitudinal {
                    timestamp_ms,
                    state: after,
                })
                .await
            {
                break;
            }
        }
    }

    release(&mut accel);
    release(&mut gravity);
    info!("Longitudinal worker stopped");
}

pub(crate) async fn run_angular(
    mut classifier: AngularClassifier,
    mut gyro: Option<Subscription<SensorSample>>,
    mut commands: broadcast::Receiver<Command>,
    ctx: WorkerContext,
) {
    info!("Angular worker started");

    // Expiries come back through the worker's own queue, keyed by trigger
    let (expiry_tx, mut expiry_rx) = mpsc::channel::<u64>(8);
    let mut timer = HoldTimer::new();
    let mut armed_for: Option<u64> = None;

    loop {
        let before = classifier.state();
        let mut timestamp_ms = None;

        tokio::select! {
            // Inputs already queued are handled before a command
            biased;

            sample = next_or_pending(&mut gyro) => match sample {
                Some(sample) => {
                    classifier.on_sample(&sample);
                    timestamp_ms = classifier.last_confirmed_ms();
                }
                None => {
                    warn!("Rotation stream ended");
                    gyro = None;
                }
            },
            Some(trigger_ms) = expiry_rx.recv() => {
                if classifier.expire(trigger_ms) {
                    timestamp_ms = classifier.last_confirmed_ms();
                } else {
                    debug!("Ignoring stale expiry for trigger {}ms", trigger_ms);
                }
            }
            command = commands.recv() => match read_command(command) {
                Control::Continue => continue,
                Control::Stop => break,
                Control::Recalibrate => {
                    timer.cancel();
                    armed_for = None;
                    classifier.reset();
                }
                Control::Settle(now_ms) => {
                    if classifier.settle(now_ms) {
                        timestamp_ms = classifier.last_confirmed_ms();
                    }
                }
            },
        }

        // Keep exactly one timer aimed at the current deadline
        match (classifier.phase(), classifier.deadline_ms()) {
            (AngularPhase::SharpTurnActive { last_trigger_ms }, Some(deadline)) => {
                if armed_for != Some(last_trigger_ms) {
                    let delay = deadline.saturating_sub(ctx.clock.now_ms());
                    timer.arm(Duration::from_millis(delay), expiry_tx.clone(), last_trigger_ms);
                    armed_for = Some(last_trigger_ms);
                }
            }
            _ => {
                if timer.is_armed() {
                    timer.cancel();
                }
                armed_for = None;
            }
        }

        let after = classifier.state();
        ctx.snapshot.send_modify(|s| s.angular = after);

        if after != before {
            let timestamp_ms = timestamp_ms.unwrap_or_else(|| ctx.clock.now_ms());
            if after == AngularState::Stable {
                info!("Sharp turn over at {}ms", timestamp_ms);
            }
            if !ctx
                .emit(DrivingEvent::Angular {
                    timestamp_ms,
                    state: after,
                })
                .await
            {
                break;
            }
        }
    }

    timer.cancel();
    release(&mut gyro);
    info!("Angular worker stopped");
}

pub(crate) async fn run_lateral(
    mut classifier: LateralClassifier,
    mut accel: Option<Subscription<SensorSample>>,
    mut commands: broadcast::Receiver<Command>,
    ctx: WorkerContext,
) {
    info!("Lateral worker started");

    loop {
        let before = classifier.state();
        let mut timestamp_ms = None;

        tokio::select! {
            // Inputs already queued are handled before a command
            biased;

            sample = next_or_pending(&mut accel) => match sample {
                Some(sample) => {
                    classifier.on_sample(&sample);
                    timestamp_ms = Some(sample.timestamp_ms);
                }
                None => {
                    warn!("Acceleration stream ended");
                    accel = None;
                }
            },
            command = commands.recv() => match read_command(command) {
                Control::Continue | Control::Settle(_) => continue,
                Control::Stop => break,
                Control::Recalibrate => classifier.reset(),
            },
        }

        let after = classifier.state();
        ctx.snapshot.send_modify(|s| s.lateral = after);

        if after != before {
            if after == LateralState::Drift {
                debug!("Lane drift detected");
            }
            let timestamp_ms = timestamp_ms.unwrap_or_else(|| ctx.clock.now_ms());
            if !ctx
                .emit(DrivingEvent::Lateral {
                    timestamp_ms,
                    state: after,
                })
                .await
            {
                break;
            }
        }
    }

    release(&mut accel);
    info!("Lateral worker stopped");
}

pub(crate) async fn run_speed(
    positions: Arc<dyn PositionSource>,
    mut fixes: Option<Subscription<PositionFix>>,
    context: Option<(Arc<dyn ContextProvider>, u64)>,
    mut commands: broadcast::Receiver<Command>,
    ctx: WorkerContext,
) {
    info!("Speed worker started");

    let mut estimator = SpeedEstimator::new();
    let mut last_lookup_ms: Option<u64> = None;

    loop {
        tokio::select! {
            // Inputs already queued are handled before a command
            biased;

            fix = next_or_pending(&mut fixes) => match fix {
                Some(fix) => {
                    let availability = positions.availability();
                    let speed = estimator.on_fix(fix, availability);
                    ctx.snapshot.send_modify(|s| s.speed = speed);

                    let available = availability.is_available();
                    if !ctx
                        .emit(DrivingEvent::Speed {
                            timestamp_ms: fix.timestamp_ms,
                            speed,
                            positioning_available: available,
                        })
                        .await
                    {
                        break;
                    }

                    if let Some((provider, refresh_ms)) = &context {
                        let due = last_lookup_ms
                            .map_or(true, |last| fix.timestamp_ms.saturating_sub(last) >= *refresh_ms);
                        if available && due {
                            last_lookup_ms = Some(fix.timestamp_ms);
                            spawn_context_lookup(provider.clone(), fix, ctx.events.clone());
                        }
                    }
                }
                None => {
                    warn!("Position stream ended");
                    fixes = None;
                }
            },
            command = commands.recv() => match read_command(command) {
                Control::Continue | Control::Recalibrate | Control::Settle(_) => continue,
                Control::Stop => break,
            },
        }
    }

    release(&mut fixes);
    info!("Speed worker stopped");
}

/// Lookups run off the worker so a slow service never delays speed updates
fn spawn_context_lookup(
    provider: Arc<dyn ContextProvider>,
    fix: PositionFix,
    events: mpsc::Sender<DrivingEvent>,
) {
    tokio::spawn(async move {
        let report = describe_all(provider.as_ref(), fix.latitude, fix.longitude).await;
        debug!(
            "Context for ({}, {}): weather={}, traffic={}, road={}",
            fix.latitude,
            fix.longitude,
            report.weather.is_available(),
            report.traffic.is_available(),
            report.road_type.is_available()
        );
        let _ = events.send(DrivingEvent::Context(report)).await;
    });
}
