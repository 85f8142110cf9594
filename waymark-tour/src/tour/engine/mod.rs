//! Tour engine: the async shell around the orchestrator
//!
//! - `core`: the actor task owning all tour state, its message loop and
//!   effect execution (timers, asset loads, event emission)
//! - `handle`: the cloneable [`Tour`](handle::Tour) handle exposed to the
//!   host application (commands, sensor events, tick, observation)

mod core;
mod handle;

pub use self::core::TickOutput;
pub use self::handle::Tour;
