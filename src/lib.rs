//! Soundboard playback core.
//!
//! `cueboard` tracks every in-flight audio clip a soundboard UI triggers:
//! several clips play concurrently, each one can be stopped abruptly or
//! faded out, and the native playback resource behind each clip is released
//! exactly once. The crate is an in-process API (no wire protocol, no CLI)
//! built around a single-threaded cooperative scheduler so the pool itself
//! needs no locking.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cueboard::{
//!     FadeSettings, MemoryCatalog, PlaybackKey, PlaybackPool, RodioEngine,
//!     Scheduler, SoundId, SoundSource, Subscription,
//! };
//!
//! let mut scheduler = Scheduler::new();
//! let handle = scheduler.handle();
//! let mut pool = PlaybackPool::new(
//!     Box::new(RodioEngine::new()),
//!     Arc::new(MemoryCatalog::new()),
//!     handle.clone(),
//!     FadeSettings::default(),
//! );
//!
//! let key = PlaybackKey::preview(SoundId(1));
//! pool.initialize(
//!     key,
//!     SoundSource::File("airhorn.mp3".into()),
//!     80,
//!     false,
//!     Subscription::none().with_stopped(|| println!("done")),
//! )?;
//! pool.start(key)?;
//! pool.stop(key, true); // fade out
//!
//! // UI thread and engine threads re-enter through `handle.post(...)`;
//! // the scheduler loop drives everything, fader ticks included.
//! scheduler.run(&mut pool);
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod scheduler;

// Re-export the API surface a host actually touches
pub use catalog::{Catalog, CatalogEntry, MemoryCatalog};
pub use config::{
    FadeSettings, FADE_DECAY_DIVISOR, FADE_FIRST_TICK_DELAY, FADE_TICK_INTERVAL,
    INAUDIBILITY_FLOOR,
};
pub use engine::{
    AudioEngine, EngineEvent, EngineEventSink, EngineInstance, RodioEngine, SoundSource,
};
pub use error::{AppResult, EngineError, PoolResult, SettingsError};
pub use playback::{BoardId, PlaybackKey, PlaybackPool, SoundId, Subscription};
pub use scheduler::{Scheduler, SchedulerHandle};
