//! Asset loader seam
//!
//! The engine never touches asset bytes: it hands a renderer-opaque source
//! handle to an [`AssetLoader`] and waits for the resolution message. Loads
//! are spawned as independent tokio tasks, so a slow or hung loader can
//! never block the engine actor, and a failed load resolves the part just
//! like a successful one (the part simply never becomes visible).

use futures::future::BoxFuture;
use thiserror::Error;

/// Result of a successful asset load, as far as the engine cares
///
/// The renderer keeps the actual geometry; the engine only needs a stable
/// key to name it by and the animation clips to start on reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAsset {
    /// Renderer-side key for the loaded content (often the source handle)
    pub content_key: String,

    /// Names of animation clips bundled with the asset
    pub animations: Vec<String>,
}

/// Asset load failure
///
/// Recoverable by design: the owning slot counts the part as resolved and
/// its timeline proceeds without it.
#[derive(Debug, Clone, Error)]
#[error("failed to load {source_handle}: {message}")]
pub struct AssetLoadError {
    pub source_handle: String,
    pub message: String,
}

/// Terminal outcome of one load attempt
pub type AssetOutcome = std::result::Result<LoadedAsset, AssetLoadError>;

/// Asynchronous asset resolver provided by the host application
///
/// Implementations must be cheap to call: the returned future is spawned on
/// the runtime and may take as long as it likes, but `load` itself runs on
/// the engine's task.
pub trait AssetLoader: Send + Sync + 'static {
    /// Begin resolving a source handle into a loaded asset
    fn load(&self, source: &str) -> BoxFuture<'static, AssetOutcome>;
}
