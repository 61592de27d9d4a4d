/// rodio-backed audio engine
///
/// Production implementation of the engine boundary. Each instance preloads
/// its source into memory, verifies it decodes, and owns a dedicated output
/// stream and sink. Completion and looping are driven by a watcher thread
/// per started instance that waits for the sink to drain.
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rodio::{Decoder, OutputStream, Sink};
use tracing::{debug, info};

use crate::error::{EngineError, PoolResult};

use super::{AudioEngine, EngineEvent, EngineEventSink, EngineInstance, SoundSource};

/// Engine factory backed by rodio.
pub struct RodioEngine {
    /// Directory asset-type sources resolve against
    asset_root: Option<PathBuf>,
}

impl RodioEngine {
    pub fn new() -> Self {
        Self { asset_root: None }
    }

    /// Engine whose `Asset` sources resolve under `root`
    pub fn with_asset_root(root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: Some(root.into()),
        }
    }

    fn resolve(&self, source: &SoundSource) -> PathBuf {
        match source {
            SoundSource::File(path) => path.clone(),
            SoundSource::Asset(name) => match &self.asset_root {
                Some(root) => root.join(name),
                None => PathBuf::from(name),
            },
        }
    }
}

impl Default for RodioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for RodioEngine {
    fn open(
        &self,
        source: &SoundSource,
        events: EngineEventSink,
    ) -> PoolResult<Box<dyn EngineInstance>> {
        let path = self.resolve(source);
        if !path.exists() {
            return Err(EngineError::missing_source(source.to_string()));
        }

        let data = fs::read(&path).map_err(|err| EngineError::SourceUnavailable {
            reference: source.to_string(),
            source: Some(Box::new(err)),
        })?;

        // Verify the audio decodes before committing any output resources.
        // Note: rodio's Decoder requires owned data with 'static lifetime.
        let cursor = Cursor::new(data.clone());
        let decoder = Decoder::new(cursor).map_err(|err| EngineError::SourceUnavailable {
            reference: source.to_string(),
            source: Some(Box::new(err)),
        })?;
        let _ = decoder.count(); // Warm up decoder

        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|err| EngineError::OutputUnavailable(Box::new(err)))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|err| EngineError::OutputUnavailable(Box::new(err)))?;

        info!(source = %source, bytes = data.len(), "preloaded audio source");

        Ok(Box::new(RodioInstance {
            _stream: stream,
            sink: Arc::new(sink),
            data: Arc::new(data),
            label: source.to_string(),
            looped: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
            events,
            started: false,
        }))
    }
}

/// One playing (or ready-to-play) rodio sink.
struct RodioInstance {
    // Keeps the output device alive for the sink's lifetime
    _stream: OutputStream,
    sink: Arc<Sink>,
    data: Arc<Vec<u8>>,
    label: String,
    looped: Arc<AtomicBool>,
    /// Set on release; tells the watcher thread to exit silently
    closed: Arc<AtomicBool>,
    events: EngineEventSink,
    started: bool,
}

impl RodioInstance {
    fn spawn_watcher(&self) {
        let sink = Arc::clone(&self.sink);
        let data = Arc::clone(&self.data);
        let looped = Arc::clone(&self.looped);
        let closed = Arc::clone(&self.closed);
        let events = Arc::clone(&self.events);
        let label = self.label.clone();

        thread::spawn(move || loop {
            sink.sleep_until_end();
            if closed.load(Ordering::Acquire) {
                break;
            }
            if looped.load(Ordering::Acquire) {
                // Re-append from the preloaded bytes for another pass.
                match Decoder::new(Cursor::new((*data).clone())) {
                    Ok(decoder) => {
                        debug!(source = %label, "loop pass restarted");
                        sink.append(decoder);
                        sink.play();
                        continue;
                    }
                    Err(err) => {
                        (*events)(EngineEvent::Failed(err.to_string()));
                        break;
                    }
                }
            }
            (*events)(EngineEvent::Completed);
            break;
        });
    }
}

impl EngineInstance for RodioInstance {
    fn start(&mut self) -> PoolResult<()> {
        if self.started {
            return Ok(());
        }

        // Note: rodio's Decoder requires owned data with 'static lifetime.
        let cursor = Cursor::new((*self.data).clone());
        let decoder =
            Decoder::new(cursor).map_err(|err| EngineError::Runtime(err.to_string()))?;

        self.sink.append(decoder);
        self.sink.play();
        self.started = true;
        debug!(source = %self.label, "sink playing");

        // rodio produces audio as soon as the sink is fed; readiness is
        // immediate here, unlike engines that prepare asynchronously.
        (*self.events)(EngineEvent::Ready);
        self.spawn_watcher();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn set_gain(&mut self, gain: f32) {
        self.sink.set_volume(gain.clamp(0.0, 1.0));
    }

    fn set_loop(&mut self, looped: bool) {
        self.looped.store(looped, Ordering::Release);
    }

    fn is_producing(&self) -> bool {
        self.started && !self.sink.empty() && !self.sink.is_paused()
    }

    fn release(&mut self) -> PoolResult<()> {
        debug!(source = %self.label, "releasing sink");
        // Flag first so the watcher wakes into a closed instance and exits
        // without reporting a completion.
        self.closed.store(true, Ordering::Release);
        self.sink.stop();
        Ok(())
    }
}
