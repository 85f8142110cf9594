//! # Waymark Tour Engine (waymark-tour)
//!
//! Timed composite-reveal scheduler and multi-target orchestration state
//! machine for guided AR tours.
//!
//! **Purpose:** decide, for any point in time and any combination of sensor
//! events, which sub-assets are visible, when timers fire, when a scene is
//! complete, and when control hands off between physical targets. Rendering,
//! marker tracking and asset decoding are external collaborators reached
//! through small trait seams.
//!
//! **Architecture:** a single engine actor (tokio task) owns all tour state
//! and drains a message channel; timers and asset loads are spawned tasks
//! that message back; observers consume a broadcast event stream and a
//! shared read surface.
//!
//! ```no_run
//! use std::sync::Arc;
//! use waymark_common::config::TourConfig;
//! use waymark_tour::tour::Tour;
//! # use waymark_tour::assets::{AssetLoader, AssetOutcome};
//! # use waymark_tour::tour::PoseSource;
//! # use futures::future::BoxFuture;
//! # struct L; impl AssetLoader for L { fn load(&self, s: &str) -> BoxFuture<'static, AssetOutcome> { unimplemented!() } }
//! # struct P; impl PoseSource for P { fn world_transform(&self) -> waymark_common::Transform { unimplemented!() } }
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = TourConfig::load("tour.toml")?;
//! let sources: Vec<Arc<dyn PoseSource>> = vec![Arc::new(P)];
//! let tour = Tour::launch(config, Arc::new(L), sources)?;
//!
//! tour.target_found(0)?;          // from the marker tracker
//! let tick = tour.tick().await?;  // once per render frame
//! tour.go_next()?;                // from the UI
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod error;
pub mod state;
pub mod tour;

pub use error::{Error, Result};
pub use state::{PartView, SharedState};
pub use tour::{TickOutput, Tour};
