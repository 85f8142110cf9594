//! Shared test infrastructure: stub asset loader, scripted pose sources
//! and tour configuration builders.

use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use waymark_common::config::{PartConfig, SlotConfig, TargetConfig, TourConfig, TuningConfig};
use waymark_common::events::TourEvent;
use waymark_common::Transform;
use waymark_tour::assets::{AssetLoadError, AssetLoader, AssetOutcome, LoadedAsset};
use waymark_tour::tour::PoseSource;

/// Initialise tracing for a test run (idempotent)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Asset loader stub with configurable latency and failing sources
pub struct StubLoader {
    delay: Duration,
    fail_sources: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubLoader {
    pub fn instant() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            fail_sources: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, source: &str) -> Self {
        self.fail_sources.insert(source.to_string());
        self
    }

    /// Sources requested so far, in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl AssetLoader for StubLoader {
    fn load(&self, source: &str) -> BoxFuture<'static, AssetOutcome> {
        self.calls.lock().unwrap().push(source.to_string());
        let source = source.to_string();
        let delay = self.delay;
        let fail = self.fail_sources.contains(&source);
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                Err(AssetLoadError {
                    source_handle: source,
                    message: "stubbed failure".to_string(),
                })
            } else {
                Ok(LoadedAsset {
                    content_key: source,
                    animations: vec![],
                })
            }
        })
    }
}

/// Pose source returning a settable transform
pub struct ScriptedPose {
    transform: Mutex<Transform>,
}

impl ScriptedPose {
    pub fn at_origin() -> Arc<Self> {
        Arc::new(Self {
            transform: Mutex::new(Transform::IDENTITY),
        })
    }

    pub fn set(&self, transform: Transform) {
        *self.transform.lock().unwrap() = transform;
    }
}

impl PoseSource for ScriptedPose {
    fn world_transform(&self) -> Transform {
        *self.transform.lock().unwrap()
    }
}

/// Slot builder from `(reveal_at_ms, hide_after_ms)` pairs
pub fn slot(timing: &[(u64, u64)]) -> SlotConfig {
    SlotConfig {
        exclusive: false,
        reset_on_enter: true,
        reset_on_leave: true,
        parts: timing
            .iter()
            .enumerate()
            .map(|(i, &(reveal_at_ms, hide_after_ms))| PartConfig {
                source: format!("part-{}.glb", i),
                reveal_at_ms,
                hide_after_ms,
            })
            .collect(),
    }
}

pub fn target(name: &str, slots: Vec<SlotConfig>) -> TargetConfig {
    TargetConfig {
        name: name.to_string(),
        props: vec![],
        slots,
    }
}

/// Tour with fast test timings (short grace, fast retry)
pub fn tour(targets: Vec<TargetConfig>) -> TourConfig {
    TourConfig {
        tuning: TuningConfig {
            grace_delay_ms: 150,
            retry_interval_ms: 25,
            retry_limit: 10,
            ..TuningConfig::default()
        },
        targets,
    }
}

/// One pose source per target
pub fn sources_for(config: &TourConfig) -> Vec<Arc<dyn PoseSource>> {
    config
        .targets
        .iter()
        .map(|_| ScriptedPose::at_origin() as Arc<dyn PoseSource>)
        .collect()
}

/// Await an event matching the predicate, failing after `timeout`
pub async fn wait_for_event<F>(
    rx: &mut tokio::sync::broadcast::Receiver<TourEvent>,
    timeout: Duration,
    predicate: F,
) -> anyhow::Result<TourEvent>
where
    F: Fn(&TourEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .ok_or_else(|| anyhow::anyhow!("timed out waiting for event"))?;
        let event = tokio::time::timeout(remaining, rx.recv())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for event"))??;
        if predicate(&event) {
            return Ok(event);
        }
    }
}

/// Assert that no matching event arrives within `window`
pub async fn assert_no_event<F>(
    rx: &mut tokio::sync::broadcast::Receiver<TourEvent>,
    window: Duration,
    predicate: F,
) where
    F: Fn(&TourEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now()) else {
            return;
        };
        match tokio::time::timeout(remaining, rx.recv()).await {
            Err(_) => return,
            Ok(Err(_)) => return,
            Ok(Ok(event)) => {
                assert!(!predicate(&event), "unexpected event: {:?}", event);
            }
        }
    }
}
