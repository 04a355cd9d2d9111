//! Recording fakes for the platform adapters.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use trail_tracker::{
    AccuracyTier, BackgroundGrant, EngineAdapters, EventSink, Fix, GrantToken, LocationProvider,
    StaticPowerSource, TrackingConfig, TrackingEngine, TrackingEvent, TrackingState,
};

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    StartUpdates,
    StopUpdates,
    Accuracy(AccuracyTier),
    StartSignificant,
    StopSignificant,
    RequestAuthorization,
}

#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<ProviderCall>>,
}

impl FakeProvider {
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether fine-grained updates are running according to the last command.
    pub fn updates_running(&self) -> bool {
        self.calls()
            .iter()
            .rev()
            .find_map(|c| match c {
                ProviderCall::StartUpdates => Some(true),
                ProviderCall::StopUpdates => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl LocationProvider for FakeProvider {
    fn start_updates(&self) {
        self.push(ProviderCall::StartUpdates);
    }
    fn stop_updates(&self) {
        self.push(ProviderCall::StopUpdates);
    }
    fn set_desired_accuracy(&self, tier: AccuracyTier) {
        self.push(ProviderCall::Accuracy(tier));
    }
    fn start_significant_changes(&self) {
        self.push(ProviderCall::StartSignificant);
    }
    fn stop_significant_changes(&self) {
        self.push(ProviderCall::StopSignificant);
    }
    fn request_authorization(&self) {
        self.push(ProviderCall::RequestAuthorization);
    }
}

#[derive(Default)]
pub struct FakeGrant {
    issued: AtomicU64,
    released: Mutex<Vec<GrantToken>>,
}

impl FakeGrant {
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<GrantToken> {
        self.released.lock().unwrap().clone()
    }

    /// Grants issued but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.issued() - self.released().len() as u64
    }
}

impl BackgroundGrant for FakeGrant {
    fn acquire(&self) -> Option<GrantToken> {
        Some(GrantToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn release(&self, token: GrantToken) {
        self.released.lock().unwrap().push(token);
    }
}

#[derive(Default)]
pub struct FakeSink {
    events: Mutex<Vec<TrackingEvent>>,
}

impl FakeSink {
    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<TrackingState> {
        self.events().iter().filter_map(|e| e.as_state()).collect()
    }

    pub fn fixes(&self) -> Vec<Fix> {
        self.events().iter().filter_map(|e| e.as_fix().copied()).collect()
    }
}

impl EventSink for FakeSink {
    fn on_event(&self, event: TrackingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Rig {
    pub engine: Arc<TrackingEngine>,
    pub provider: Arc<FakeProvider>,
    pub grant: Arc<FakeGrant>,
    pub sink: Arc<FakeSink>,
}

pub fn rig() -> Rig {
    rig_with(TrackingConfig::default())
}

pub fn rig_with(config: TrackingConfig) -> Rig {
    init_test_logging();
    let provider = Arc::new(FakeProvider::default());
    let grant = Arc::new(FakeGrant::default());
    let sink = Arc::new(FakeSink::default());
    let engine = TrackingEngine::with_config(
        config,
        EngineAdapters {
            provider: provider.clone(),
            grant: grant.clone(),
            power: Arc::new(StaticPowerSource::new(0.64, true)),
            sink: sink.clone(),
        },
    );
    Rig {
        engine: Arc::new(engine),
        provider,
        grant,
        sink,
    }
}

/// A plausible trail-running fix at `t_ms`.
pub fn fix(t_ms: i64, accuracy: f64, speed: f64) -> Fix {
    let drift = t_ms.rem_euclid(1_000_000) as f64 * 1e-8;
    Fix::new(46.5197 + drift, 6.6323, accuracy, t_ms)
        .with_speed(speed)
        .with_heading(90.0)
        .with_elevation(520.0)
}
