#![allow(dead_code)]

//! Shared test harness: a scripted audio engine driven by hand, plus a
//! deterministic way to run the scheduler's pending work. No audio
//! hardware is involved anywhere in these suites.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use cueboard::{
    AudioEngine, Catalog, EngineError, EngineEvent, EngineEventSink, EngineInstance,
    FadeSettings, MemoryCatalog, PlaybackPool, PoolResult, Scheduler, SoundSource, Subscription,
};

/// Everything one scripted instance records, shared with the test body so
/// it stays observable after the pool releases the handle.
#[derive(Default)]
pub struct InstanceState {
    pub started: bool,
    pub producing: bool,
    pub paused: bool,
    pub stopped: bool,
    pub released: u32,
    pub looped: Option<bool>,
    pub gains: Vec<f32>,
    pub fail_start: bool,
    pub fail_release: bool,
}

pub struct OpenedInstance {
    pub source: String,
    pub state: Arc<Mutex<InstanceState>>,
    pub events: EngineEventSink,
}

/// Scripted engine: records every instance it opens and lets the test emit
/// engine events whenever it likes.
#[derive(Default)]
pub struct ScriptedEngine {
    pub opened: Arc<Mutex<Vec<OpenedInstance>>>,
    pub unavailable: Arc<Mutex<HashSet<String>>>,
}

struct ScriptedInstance {
    state: Arc<Mutex<InstanceState>>,
}

impl EngineInstance for ScriptedInstance {
    fn start(&mut self) -> PoolResult<()> {
        let mut state = self.state.lock();
        if state.fail_start {
            return Err(EngineError::Runtime("scripted start failure".to_string()));
        }
        state.started = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().paused = true;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.producing = false;
    }

    fn set_gain(&mut self, gain: f32) {
        self.state.lock().gains.push(gain);
    }

    fn set_loop(&mut self, looped: bool) {
        self.state.lock().looped = Some(looped);
    }

    fn is_producing(&self) -> bool {
        let state = self.state.lock();
        state.producing && !state.stopped
    }

    fn release(&mut self) -> PoolResult<()> {
        let mut state = self.state.lock();
        state.released += 1;
        state.producing = false;
        if state.fail_release {
            return Err(EngineError::Release(
                "scripted release failure".to_string().into(),
            ));
        }
        Ok(())
    }
}

impl AudioEngine for ScriptedEngine {
    fn open(
        &self,
        source: &SoundSource,
        events: EngineEventSink,
    ) -> PoolResult<Box<dyn EngineInstance>> {
        let reference = source.to_string();
        if self.unavailable.lock().contains(&reference) {
            return Err(EngineError::missing_source(reference));
        }
        let state = Arc::new(Mutex::new(InstanceState::default()));
        self.opened.lock().push(OpenedInstance {
            source: reference,
            state: Arc::clone(&state),
            events: Arc::clone(&events),
        });
        Ok(Box::new(ScriptedInstance { state }))
    }
}

/// Pool + scheduler + scripted engine, wired together the way a host would
/// wire the real thing.
pub struct Harness {
    pub scheduler: Scheduler,
    pub pool: PlaybackPool,
    pub opened: Arc<Mutex<Vec<OpenedInstance>>>,
    pub unavailable: Arc<Mutex<HashSet<String>>>,
    pub catalog: Arc<MemoryCatalog>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(FadeSettings::default())
    }

    pub fn with_settings(settings: FadeSettings) -> Self {
        let engine = ScriptedEngine::default();
        let opened = Arc::clone(&engine.opened);
        let unavailable = Arc::clone(&engine.unavailable);
        let catalog = Arc::new(MemoryCatalog::new());
        let shared: Arc<dyn Catalog> = catalog.clone();

        let scheduler = Scheduler::new();
        let pool = PlaybackPool::new(Box::new(engine), shared, scheduler.handle(), settings);

        Self {
            scheduler,
            pool,
            opened,
            unavailable,
            catalog,
        }
    }

    /// Run everything already posted (engine events, follow-up tasks)
    /// without advancing to any delayed tick.
    pub fn pump(&mut self) {
        self.scheduler.run_due(&mut self.pool, Instant::now());
    }

    /// Run exactly the next delayed task (a fade tick, in these suites).
    /// Returns false when nothing is scheduled.
    pub fn tick(&mut self) -> bool {
        self.pump();
        match self.scheduler.next_deadline() {
            Some(deadline) => {
                self.scheduler.run_due(&mut self.pool, deadline);
                true
            }
            None => false,
        }
    }

    /// Ticks until the fader goes idle; returns how many ticks ran.
    /// Panics past `limit` so a non-terminating fade fails loudly.
    pub fn tick_until_idle(&mut self, limit: u32) -> u32 {
        let mut ticks = 0;
        while self.tick() {
            ticks += 1;
            assert!(ticks <= limit, "fade did not terminate within {limit} ticks");
        }
        ticks
    }

    /// Number of engine instances opened so far
    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Recorded state of the nth opened instance
    pub fn state(&self, index: usize) -> Arc<Mutex<InstanceState>> {
        Arc::clone(&self.opened.lock()[index].state)
    }

    /// Emit an engine event from the nth opened instance
    pub fn emit(&self, index: usize, event: EngineEvent) {
        let opened = self.opened.lock();
        (*opened[index].events)(event);
    }

    /// Flip the nth instance to producing and emit its readiness signal
    pub fn make_ready(&self, index: usize) {
        {
            let opened = self.opened.lock();
            opened[index].state.lock().producing = true;
        }
        self.emit(index, EngineEvent::Ready);
    }

    /// Make `open` fail for this source reference
    pub fn mark_unavailable(&self, reference: &str) {
        self.unavailable.lock().insert(reference.to_string());
    }
}

/// Subscription whose firings are counted.
pub fn counting_subscription() -> (Subscription, Arc<AtomicU32>, Arc<AtomicU32>) {
    let started = Arc::new(AtomicU32::new(0));
    let stopped = Arc::new(AtomicU32::new(0));

    let started_count = Arc::clone(&started);
    let stopped_count = Arc::clone(&stopped);
    let subscription = Subscription::none()
        .with_started(move || {
            started_count.fetch_add(1, Ordering::SeqCst);
        })
        .with_stopped(move || {
            stopped_count.fetch_add(1, Ordering::SeqCst);
        });

    (subscription, started, stopped)
}

pub fn src(name: &str) -> SoundSource {
    SoundSource::File(std::path::PathBuf::from(name))
}
