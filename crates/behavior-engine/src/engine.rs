//! Engine lifecycle: subscribe, spawn workers, tear down

use std::sync::Arc;

use context_adapter::ContextProvider;
use driving_events::{AngularClassifier, LateralClassifier, LongitudinalClassifier};
use sensor_source::{
    Channel, Clock, PositionSource, SampleSource, SensorSample, SourceError, Subscription,
    TokioClock,
};
use speed_estimator::SpeedSample;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::worker::{self, Command, WorkerContext};
use crate::{DrivingEvent, EngineConfig, EngineError, EngineSnapshot};

/// Driving behavior engine
pub struct BehaviorEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    context: Option<Arc<dyn ContextProvider>>,
}

impl BehaviorEngine {
    /// Build an engine whose clock reads zero at construction, matching
    /// sources that stamp samples relative to session start
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(TokioClock::new()),
            context: None,
        })
    }

    /// Clock used to schedule hold timers; must share the samples' time domain
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable context lookups on new fixes
    pub fn with_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(provider);
        self
    }

    /// Subscribe to the sources and start one worker per classifier.
    ///
    /// A source that cannot be subscribed is logged and its classifier
    /// stays `Stable`; it never fails the engine.
    pub fn start(
        &self,
        samples: Arc<dyn SampleSource>,
        positions: Arc<dyn PositionSource>,
    ) -> Result<(EngineHandle, mpsc::Receiver<DrivingEvent>), EngineError> {
        let events_config = &self.config.events;
        let longitudinal = LongitudinalClassifier::new(&events_config.longitudinal)?;
        let angular = AngularClassifier::new(&events_config.angular)?;
        let lateral = LateralClassifier::new(&events_config.lateral)?;

        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer);
        let (commands, _) = broadcast::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());

        let ctx = WorkerContext {
            clock: self.clock.clone(),
            events: events_tx,
            snapshot: Arc::new(snapshot_tx),
        };

        // Subscribe before spawning so nothing published after start is missed
        let longitudinal_accel = subscribe_channel(samples.as_ref(), Channel::LinearAcceleration);
        let gravity = subscribe_channel(samples.as_ref(), Channel::Gravity);
        let lateral_accel = subscribe_channel(samples.as_ref(), Channel::LinearAcceleration);
        let gyro = subscribe_channel(samples.as_ref(), Channel::AngularVelocity);
        let fixes = match positions.subscribe() {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!("Position updates unavailable: {}", e);
                None
            }
        };

        let context = self
            .context
            .clone()
            .map(|provider| (provider, self.config.context_refresh_ms));

        let tasks = vec![
            tokio::spawn(worker::run_longitudinal(
                longitudinal,
                longitudinal_accel,
                gravity,
                commands.subscribe(),
                ctx.clone(),
            )),
            tokio::spawn(worker::run_angular(
                angular,
                gyro,
                commands.subscribe(),
                ctx.clone(),
            )),
            tokio::spawn(worker::run_lateral(
                lateral,
                lateral_accel,
                commands.subscribe(),
                ctx.clone(),
            )),
            tokio::spawn(worker::run_speed(
                positions.clone(),
                fixes,
                context,
                commands.subscribe(),
                ctx,
            )),
        ];

        info!(
            "Behavior engine started (context lookups: {})",
            self.context.is_some()
        );

        let handle = EngineHandle {
            commands,
            tasks,
            snapshot: snapshot_rx,
            positions,
        };
        Ok((handle, events_rx))
    }
}

fn subscribe_channel(
    source: &dyn SampleSource,
    channel: Channel,
) -> Option<Subscription<SensorSample>> {
    match source.subscribe(channel) {
        Ok(sub) => Some(sub),
        Err(SourceError::ChannelUnavailable(channel)) => {
            warn!("Sensor channel {} unavailable, classifier stays Stable", channel);
            None
        }
        Err(e) => {
            warn!("Failed to subscribe to {}: {}", channel, e);
            None
        }
    }
}

/// Handle to a running engine
pub struct EngineHandle {
    commands: broadcast::Sender<Command>,
    tasks: Vec<JoinHandle<()>>,
    snapshot: watch::Receiver<EngineSnapshot>,
    positions: Arc<dyn PositionSource>,
}

impl EngineHandle {
    /// Recapture the baseline from the next sample and reset every
    /// classifier to `Stable`, cancelling any pending hold timer.
    pub fn recalibrate(&self) {
        if self.commands.send(Command::Recalibrate).is_err() {
            warn!("Recalibration requested but no worker is running");
        }
    }

    /// End any sharp-turn hold whose deadline has passed by `now_ms`.
    ///
    /// For callers whose sample time runs ahead of the engine clock, such
    /// as a replay that has published its last record.
    pub fn settle(&self, now_ms: u64) {
        if self.commands.send(Command::Settle(now_ms)).is_err() {
            warn!("Settle requested but no worker is running");
        }
    }

    /// Latest outputs. Speed reads zero while positioning is unavailable,
    /// whatever the last fix said.
    pub fn snapshot(&self) -> EngineSnapshot {
        let mut snapshot = *self.snapshot.borrow();
        if !self.positions.availability().is_available() {
            snapshot.speed = SpeedSample::ZERO;
        }
        snapshot
    }

    /// Stop every worker, releasing subscriptions and timers
    pub async fn shutdown(mut self) {
        info!("Shutting down behavior engine");
        let _ = self.commands.send(Command::Shutdown);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                error!("Worker task failed: {}", e);
            }
        }
        info!("Behavior engine stopped");
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use context_adapter::Lookup;
    use driving_events::{AngularState, LateralState, LongitudinalState};
    use sensor_source::{ChannelPositionSource, ChannelSampleSource, ManualClock, PositionFix};
    use std::time::Duration;

    struct Fixture {
        samples: Arc<ChannelSampleSource>,
        positions: Arc<ChannelPositionSource>,
        handle: EngineHandle,
        events: mpsc::Receiver<DrivingEvent>,
    }

    fn start_with(engine: BehaviorEngine, samples: ChannelSampleSource) -> Fixture {
        let samples = Arc::new(samples);
        let positions = Arc::new(ChannelPositionSource::default());
        let (handle, events) = engine
            .start(samples.clone(), positions.clone())
            .unwrap();
        Fixture {
            samples,
            positions,
            handle,
            events,
        }
    }

    fn start() -> Fixture {
        let engine = BehaviorEngine::new(EngineConfig::default()).unwrap();
        start_with(engine, ChannelSampleSource::default())
    }

    fn gyro(ts: u64, z: f64) -> SensorSample {
        SensorSample::new(ts, 0.0, 0.0, z)
    }

    async fn quiet(events: &mut mpsc::Receiver<DrivingEvent>, ms: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(ms), events.recv())
            .await
            .is_err()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sharp_turn_held_then_released() {
        // Default clock, no override
        let mut f = start();
        let started = tokio::time::Instant::now();

        f.samples.publish(Channel::AngularVelocity, gyro(0, 2.0));
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Angular {
                timestamp_ms: 0,
                state: AngularState::SharpTurn
            }
        );
        assert_eq!(f.handle.snapshot().angular, AngularState::SharpTurn);

        // Paused time auto-advances to the hold deadline
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Angular {
                timestamp_ms: 3000,
                state: AngularState::Stable
            }
        );
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert_eq!(f.handle.snapshot().angular, AngularState::Stable);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_releases_turn_ahead_of_clock() {
        let engine = BehaviorEngine::new(EngineConfig::default())
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(60_000)));
        let mut f = start_with(engine, ChannelSampleSource::default());
        let started = tokio::time::Instant::now();

        f.samples.publish(Channel::AngularVelocity, gyro(60_000, 2.0));
        f.events.recv().await.unwrap();

        f.handle.settle(62_999);
        assert!(quiet(&mut f.events, 1000).await);

        f.handle.settle(63_000);
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Angular {
                timestamp_ms: 63_000,
                state: AngularState::Stable
            }
        );
        assert!(started.elapsed() < Duration::from_millis(3000));

        // The timer armed for the same trigger is stale now
        assert!(quiet(&mut f.events, 5000).await);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_extends_hold() {
        let mut f = start();

        f.samples.publish(Channel::AngularVelocity, gyro(0, 2.0));
        f.events.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        f.samples.publish(Channel::AngularVelocity, gyro(1000, -2.0));

        // Nothing at the first 3000ms deadline
        assert!(quiet(&mut f.events, 2500).await);

        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Angular {
                timestamp_ms: 4000,
                state: AngularState::Stable
            }
        );

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_samples_do_not_end_turn_early() {
        let mut f = start();

        f.samples.publish(Channel::AngularVelocity, gyro(0, 2.0));
        f.events.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        f.samples.publish(Channel::AngularVelocity, gyro(500, 0.1));
        assert!(quiet(&mut f.events, 2000).await);
        assert_eq!(f.handle.snapshot().angular, AngularState::SharpTurn);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_longitudinal_events() {
        let mut f = start();

        for (ts, z) in [(0, 0.0), (5, 0.2), (10, 1.6), (20, -1.7), (30, 0.0)] {
            f.samples
                .publish(Channel::LinearAcceleration, SensorSample::new(ts, 0.0, 0.0, z));
        }

        let expected = [
            (10, LongitudinalState::Braking),
            (20, LongitudinalState::Accelerating),
            (30, LongitudinalState::Stable),
        ];
        for (ts, state) in expected {
            assert_eq!(
                f.events.recv().await.unwrap(),
                DrivingEvent::Longitudinal {
                    timestamp_ms: ts,
                    state
                }
            );
        }
        assert!(f.handle.snapshot().baseline.is_some());

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lateral_drift_reported_immediately() {
        let mut f = start();

        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(5, 2.6, 0.0, 0.0));
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Lateral {
                timestamp_ms: 5,
                state: LateralState::Drift
            }
        );

        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(6, 2.5, 0.0, 0.0));
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Lateral {
                timestamp_ms: 6,
                state: LateralState::Stable
            }
        );

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_recalibrate_cancels_hold() {
        let mut f = start();

        f.samples.publish(Channel::AngularVelocity, gyro(0, 2.0));
        f.events.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;
        f.handle.recalibrate();
        match f.events.recv().await.unwrap() {
            DrivingEvent::Angular { state, .. } => assert_eq!(state, AngularState::Stable),
            other => panic!("unexpected event {:?}", other),
        }

        // The cancelled timer never fires
        assert!(quiet(&mut f.events, 5000).await);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_recalibrate_recaptures_baseline() {
        let mut f = start();

        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(0, 0.0, 0.0, 0.0));
        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(10, 0.0, 0.0, 2.0));
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Longitudinal {
                timestamp_ms: 10,
                state: LongitudinalState::Braking
            }
        );

        f.handle.recalibrate();
        assert!(matches!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Longitudinal {
                state: LongitudinalState::Stable,
                ..
            }
        ));

        // New baseline z0 = 2.0, so 2.0 is no longer braking
        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(20, 0.0, 0.0, 2.0));
        f.samples
            .publish(Channel::LinearAcceleration, SensorSample::new(30, 0.0, 0.0, 2.1));
        assert!(quiet(&mut f.events, 100).await);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_channel_degrades_to_stable() {
        let engine = BehaviorEngine::new(EngineConfig::default()).unwrap();
        let samples = ChannelSampleSource::with_channels(&[Channel::LinearAcceleration], 16);
        let f = start_with(engine, samples);

        assert_eq!(f.handle.snapshot().angular, AngularState::Stable);
        assert_eq!(f.samples.listener_count(Channel::LinearAcceleration), 2);

        f.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_subscriptions() {
        let f = start();
        assert_eq!(f.samples.listener_count(Channel::LinearAcceleration), 2);
        assert_eq!(f.samples.listener_count(Channel::AngularVelocity), 1);
        assert_eq!(f.samples.listener_count(Channel::Gravity), 1);
        assert_eq!(f.positions.listener_count(), 1);

        f.handle.shutdown().await;

        assert_eq!(f.samples.listener_count(Channel::LinearAcceleration), 0);
        assert_eq!(f.samples.listener_count(Channel::AngularVelocity), 0);
        assert_eq!(f.samples.listener_count(Channel::Gravity), 0);
        assert_eq!(f.positions.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_pinned_at_zero_when_unavailable() {
        let mut f = start();

        f.positions.publish(PositionFix::new(0, 0.0, 0.0, 5.0));
        f.positions
            .publish(PositionFix::new(10_000, 100.0 / 111_194.93, 0.0, 5.0));

        f.events.recv().await.unwrap();
        match f.events.recv().await.unwrap() {
            DrivingEvent::Speed {
                speed,
                positioning_available,
                ..
            } => {
                assert!(positioning_available);
                assert!((speed.meters_per_second - 10.0).abs() < 0.01);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(f.handle.snapshot().speed.meters_per_second > 9.9);

        f.positions.set_provider_enabled(false);
        assert_eq!(f.handle.snapshot().speed, SpeedSample::ZERO);

        f.positions
            .publish(PositionFix::new(20_000, 200.0 / 111_194.93, 0.0, 5.0));
        assert_eq!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Speed {
                timestamp_ms: 20_000,
                speed: SpeedSample::ZERO,
                positioning_available: false
            }
        );

        f.handle.shutdown().await;
    }

    struct FixedProvider;

    #[async_trait]
    impl ContextProvider for FixedProvider {
        async fn describe_weather(&self, _: f64, _: f64) -> Lookup {
            Lookup::Available("Weather: Clear sky\nTemp: 20°C\nHumidity: 40%".to_string())
        }

        async fn describe_traffic(&self, _: f64, _: f64) -> Lookup {
            Lookup::Unavailable
        }

        async fn describe_road_type(&self, _: f64, _: f64) -> Lookup {
            Lookup::Available("Highway".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_lookup_on_fix() {
        let engine = BehaviorEngine::new(EngineConfig::default())
            .unwrap()
            .with_context(Arc::new(FixedProvider));
        let mut f = start_with(engine, ChannelSampleSource::default());

        f.positions.publish(PositionFix::new(0, 48.1, 11.6, 5.0));

        let mut report = None;
        for _ in 0..2 {
            if let DrivingEvent::Context(r) = f.events.recv().await.unwrap() {
                report = Some(r);
            }
        }
        let report = report.unwrap();
        assert_eq!(report.latitude, 48.1);
        assert_eq!(report.traffic, Lookup::Unavailable);
        assert_eq!(report.road_type.text(), Some("Highway"));

        // Within the refresh interval: speed only, no second lookup
        f.positions.publish(PositionFix::new(1000, 48.1, 11.6, 5.0));
        assert!(matches!(
            f.events.recv().await.unwrap(),
            DrivingEvent::Speed { .. }
        ));
        assert!(quiet(&mut f.events, 100).await);

        f.handle.shutdown().await;
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.events.angular.hold_ms = 0;
        assert!(matches!(
            BehaviorEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));

        let config = EngineConfig {
            event_buffer: 0,
            ..Default::default()
        };
        assert!(matches!(
            BehaviorEngine::new(config),
            Err(EngineError::ZeroBuffer)
        ));
    }
}
