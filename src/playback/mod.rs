//! Playback core: keys, handles, the pool and the fade-out engine.
//!
//! ## Architecture
//!
//! ```text
//! PlaybackPool
//!   ├── prepared: key → PlaybackHandle   (opened, awaiting readiness)
//!   ├── active:   key → PlaybackHandle   (producing at target gain)
//!   ├── fading:   key → PlaybackHandle   (decaying toward silence)
//!   └── Fader (idle/armed)               (one shared tick chain)
//!
//! Each PlaybackHandle owns:
//!   └── Box<dyn EngineInstance>          (exactly one, released exactly once)
//! ```
//!
//! A key lives in at most one map at a time. Stops move handles between
//! maps or out of them entirely; the fader drives every fading handle from
//! a single self-rescheduling tick and releases handles that drop below
//! the inaudibility floor.

mod fader;
pub mod handle;
pub mod key;
pub mod pool;

// Re-export commonly used types
pub use handle::{gain_from_percent, Subscription};
pub use key::{BoardId, PlaybackKey, SoundId};
pub use pool::PlaybackPool;
