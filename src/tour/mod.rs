//! Tour module: the orchestrator and the state it publishes.
//!
//! ```text
//!   position source ──┐
//!   user controls ────┼──▶ mpsc<TourCommand> ──▶ TourOrchestrator::run
//!   key entry ────────┘                               │
//!                                                     ▼
//!                                   watch<TourSnapshot> ──▶ front end
//! ```

pub mod orchestrator;
pub mod state;

pub use orchestrator::{TourCommand, TourOrchestrator, CONFIGURE_API_KEY_MESSAGE};
pub use state::{MapRegion, TourSnapshot, TourStore};
