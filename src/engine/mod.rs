//! Audio engine boundary.
//!
//! The pool treats sample decoding and output as a black box behind two
//! traits: [`AudioEngine`] opens a source into an [`EngineInstance`], and the
//! instance exposes the capability set the pool relies on (start, pause,
//! stop, release, set gain, set loop). Instances live and die on the
//! scheduler thread and are never required to be `Send`; anything
//! asynchronous inside an engine (preparation, completion, runtime failure)
//! comes back through the [`EngineEventSink`], which may be called from any
//! thread.

pub mod rodio;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::PoolResult;

pub use self::rodio::RodioEngine;

/// An already-resolved audio source.
///
/// The catalog resolves its storage subtypes (file-system sound vs. bundled
/// asset) one level up; the engine only ever sees one of these two variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// Absolute or host-relative path on the file system
    File(PathBuf),

    /// Name of a bundled asset, resolved against the engine's asset root
    Asset(String),
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundSource::File(path) => write!(f, "{}", path.display()),
            SoundSource::Asset(name) => write!(f, "asset:{}", name),
        }
    }
}

/// Asynchronous notifications from an engine instance.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Preparation finished; the instance began producing audio
    Ready,

    /// A non-looping source reached its natural end
    Completed,

    /// The engine failed after a successful open (corrupt stream, device
    /// failure); treated like completion for pool bookkeeping
    Failed(String),
}

/// Callback through which an engine instance reports [`EngineEvent`]s.
///
/// May be invoked from engine-internal threads; the pool wraps it so every
/// event is posted back onto the scheduler thread before it touches state.
pub type EngineEventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// One opened playback instance, exclusively owned by a `PlaybackHandle`.
pub trait EngineInstance {
    /// Begin audio production. Preparation may complete asynchronously; the
    /// instance signals [`EngineEvent::Ready`] once audio is actually
    /// produced.
    fn start(&mut self) -> PoolResult<()>;

    /// Suspend audio production without discarding position
    fn pause(&mut self);

    /// Stop audio production
    fn stop(&mut self);

    /// Set the linear gain (0.0–1.0)
    fn set_gain(&mut self, gain: f32);

    /// Toggle looped playback
    fn set_loop(&mut self, looped: bool);

    /// Whether the instance is currently producing audio
    fn is_producing(&self) -> bool;

    /// Dispose of the underlying playback resources. Called exactly once,
    /// after which the instance is never touched again.
    fn release(&mut self) -> PoolResult<()>;
}

/// Factory for engine instances, injected into the pool at construction.
pub trait AudioEngine {
    /// Open `source` for playback. Fails with
    /// [`EngineError::SourceUnavailable`](crate::error::EngineError) when the
    /// source cannot be read or decoded; no resources are retained on
    /// failure.
    fn open(
        &self,
        source: &SoundSource,
        events: EngineEventSink,
    ) -> PoolResult<Box<dyn EngineInstance>>;
}
