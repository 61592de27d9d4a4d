/// Playback pool
///
/// Tracks every in-flight player instance across three disjoint slot maps:
/// *prepared* (source opened, not yet producing audio), *active* (producing
/// at full gain) and *fading* (decaying toward silence). All operations run
/// on the scheduler thread; the pool holds no locks.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::FadeSettings;
use crate::engine::{AudioEngine, EngineEvent, EngineEventSink, SoundSource};
use crate::error::{EngineError, PoolResult};
use crate::scheduler::SchedulerHandle;

use super::fader::{decay_step, Fader};
use super::handle::{gain_from_percent, PlaybackHandle, Subscription};
use super::key::{BoardId, PlaybackKey, SoundId};

/// Owns every live player and the fade-out engine.
///
/// Constructed once by the host with its collaborators injected, then driven
/// from the scheduler thread. A handle reachable from none of the three maps
/// has already been released and is never touched again; removal always
/// happens before release.
pub struct PlaybackPool {
    engine: Box<dyn AudioEngine>,
    catalog: Arc<dyn Catalog>,
    scheduler: SchedulerHandle,
    settings: FadeSettings,
    fader: Fader,

    /// Initialized slots waiting for the engine's readiness signal
    prepared: HashMap<PlaybackKey, PlaybackHandle>,
    /// Slots producing audio at their target gain
    active: HashMap<PlaybackKey, PlaybackHandle>,
    /// Slots decaying toward the inaudibility floor
    fading: HashMap<PlaybackKey, PlaybackHandle>,

    /// Creation stamp for the next handle
    next_instance: u64,
}

impl PlaybackPool {
    pub fn new(
        engine: Box<dyn AudioEngine>,
        catalog: Arc<dyn Catalog>,
        scheduler: SchedulerHandle,
        settings: FadeSettings,
    ) -> Self {
        let fader = Fader::new(&settings);
        Self {
            engine,
            catalog,
            scheduler,
            settings,
            fader,
            prepared: HashMap::new(),
            active: HashMap::new(),
            fading: HashMap::new(),
            next_instance: 0,
        }
    }

    /// Prepare a slot for playback.
    ///
    /// If `key` is already tracked, the existing handle is reset and
    /// reconfigured in place (a fading handle moves back to *active* with
    /// its fade cancelled) and no new source is opened. Otherwise the
    /// source is opened into a fresh prepared handle. On failure nothing is
    /// retained and the error is returned to the caller.
    pub fn initialize(
        &mut self,
        key: PlaybackKey,
        source: SoundSource,
        volume_percent: u8,
        looped: bool,
        subscription: Subscription,
    ) -> PoolResult<()> {
        let label = source.to_string();
        self.init_inner(key, source, volume_percent, looped, label, subscription)
    }

    /// Prepare a slot from its catalog entry.
    ///
    /// A sound id the catalog no longer knows maps to `SourceUnavailable`;
    /// from the caller's point of view a stale reference and a missing file
    /// need the same recovery.
    pub fn initialize_sound(
        &mut self,
        key: PlaybackKey,
        subscription: Subscription,
    ) -> PoolResult<()> {
        let Some(entry) = self.catalog.resolve(key.sound) else {
            warn!(%key, "sound missing from catalog");
            return Err(EngineError::missing_source(key.sound.to_string()));
        };
        self.init_inner(
            key,
            entry.source,
            entry.volume_percent,
            entry.looped,
            entry.display_name,
            subscription,
        )
    }

    fn init_inner(
        &mut self,
        key: PlaybackKey,
        source: SoundSource,
        volume_percent: u8,
        looped: bool,
        label: String,
        subscription: Subscription,
    ) -> PoolResult<()> {
        let gain = gain_from_percent(volume_percent);

        if let Some(handle) = self.active.get_mut(&key) {
            handle.reconfigure(gain, looped, subscription);
            return Ok(());
        }
        if let Some(mut handle) = self.fading.remove(&key) {
            handle.reconfigure(gain, looped, subscription);
            debug!(%key, "fade cancelled by re-initialize");
            self.active.insert(key, handle);
            return Ok(());
        }
        if let Some(handle) = self.prepared.get_mut(&key) {
            handle.reconfigure(gain, looped, subscription);
            return Ok(());
        }

        let instance = self.next_instance;
        self.next_instance += 1;
        let events = self.event_sink(key, instance);
        let engine = self.engine.open(&source, events)?;
        info!(%key, source = %label, gain, looped, "opened playback source");
        self.prepared.insert(
            key,
            PlaybackHandle::new(engine, gain, looped, label, subscription, instance),
        );
        Ok(())
    }

    /// Begin audio production for a previously initialized slot.
    ///
    /// Production begins asynchronously; the slot moves to *active* and
    /// `on_started` fires when the engine signals readiness. Starting an
    /// already-active slot does not restart it; starting a fading slot
    /// cancels the fade and restores its target gain.
    pub fn start(&mut self, key: PlaybackKey) -> PoolResult<()> {
        if self.active.contains_key(&key) {
            debug!(%key, "start ignored, already active");
            return Ok(());
        }
        if let Some(mut handle) = self.fading.remove(&key) {
            handle.restore_target_gain();
            debug!(%key, "fade cancelled by restart");
            self.active.insert(key, handle);
            return Ok(());
        }

        let started = match self.prepared.get_mut(&key) {
            Some(handle) => handle.start_engine(),
            None => {
                warn!(%key, "start on uninitialized slot ignored");
                return Ok(());
            }
        };
        if let Err(err) = started {
            // Release and remove before the error surfaces; no handle
            // survives a reported failure.
            if let Some(handle) = self.prepared.remove(&key) {
                handle.release();
            }
            warn!(%key, error = %err, "engine start failed");
            return Err(err);
        }
        Ok(())
    }

    /// Stop one slot, abruptly or with a fade-out.
    ///
    /// A hard stop releases immediately wherever the slot is; a fade stop
    /// moves an active slot into *fading* (at its current gain) and arms
    /// the fader. Fade-stopping an already-fading slot is a no-op, and a
    /// slot that is not tracked at all is ignored.
    pub fn stop(&mut self, key: PlaybackKey, fade_out: bool) {
        if let Some(handle) = self.active.remove(&key) {
            if fade_out {
                debug!(%key, gain = handle.gain(), "slot fading out");
                self.fading.insert(key, handle);
                self.fader.arm(&self.scheduler);
            } else {
                debug!(%key, "slot stopped");
                handle.release();
            }
            return;
        }

        if self.fading.contains_key(&key) {
            if !fade_out {
                if let Some(handle) = self.fading.remove(&key) {
                    debug!(%key, "fade pre-empted by hard stop");
                    handle.release();
                }
            }
            return;
        }

        // A slot stopped before it ever produced audio: fade-out is
        // meaningless here, release directly.
        if let Some(handle) = self.prepared.remove(&key) {
            debug!(%key, "prepared slot discarded");
            handle.release();
        }
    }

    /// Stop every tracked slot whose key satisfies `predicate`.
    pub fn stop_matching(&mut self, predicate: impl Fn(&PlaybackKey) -> bool, fade_out: bool) {
        let keys: Vec<PlaybackKey> = self
            .prepared
            .keys()
            .chain(self.active.keys())
            .chain(self.fading.keys())
            .filter(|key| predicate(key))
            .copied()
            .collect();
        for key in keys {
            self.stop(key, fade_out);
        }
    }

    /// Stop every tracked slot. A hard stop also drains anything mid-fade.
    pub fn stop_all(&mut self, fade_out: bool) {
        debug!(fade_out, tracked = self.tracked_count(), "stopping all slots");
        self.stop_matching(|_| true, fade_out);
    }

    /// Apply a new configured volume to every slot playing `sound`,
    /// whatever board it plays on and whatever state it is in. A fading
    /// slot decays from the new gain on its next tick.
    pub fn set_volume_percent(&mut self, sound: SoundId, percent: u8) {
        for (_, handle) in self
            .prepared
            .iter_mut()
            .chain(self.active.iter_mut())
            .chain(self.fading.iter_mut())
            .filter(|(key, _)| key.sound == sound)
        {
            handle.set_volume_percent(percent);
        }
    }

    /// Apply a new loop flag to every slot playing `sound`.
    pub fn set_loop(&mut self, sound: SoundId, looped: bool) {
        for (_, handle) in self
            .prepared
            .iter_mut()
            .chain(self.active.iter_mut())
            .chain(self.fading.iter_mut())
            .filter(|(key, _)| key.sound == sound)
        {
            handle.set_loop(looped);
        }
    }

    /// Whether the slot is in *active* and its engine is producing audio.
    /// A fading slot is never "actively playing", even though it is still
    /// audible.
    pub fn is_actively_playing(&self, key: PlaybackKey) -> bool {
        self.active
            .get(&key)
            .map(|handle| handle.is_producing())
            .unwrap_or(false)
    }

    /// Distinct sound ids with at least one actively playing slot.
    pub fn actively_playing_sound_ids(&self) -> Vec<SoundId> {
        let mut ids: Vec<SoundId> = self
            .active
            .iter()
            .filter(|(_, handle)| handle.is_producing())
            .map(|(key, _)| key.sound)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Whether any slot on `board` is actively playing.
    pub fn is_playing_any(&self, board: BoardId) -> bool {
        self.active
            .iter()
            .any(|(key, handle)| key.board == Some(board) && handle.is_producing())
    }

    /// Whether two or more slots on `board` are actively playing.
    pub fn is_playing_multiple(&self, board: BoardId) -> bool {
        self.active
            .iter()
            .filter(|(key, handle)| key.board == Some(board) && handle.is_producing())
            .count()
            >= 2
    }

    /// Number of slots in *active*
    pub fn count_active(&self) -> usize {
        self.active.len()
    }

    /// Number of slots tracked in any state
    pub fn tracked_count(&self) -> usize {
        self.prepared.len() + self.active.len() + self.fading.len()
    }

    /// Whether the slot is tracked in any state
    pub fn is_tracked(&self, key: PlaybackKey) -> bool {
        self.prepared.contains_key(&key)
            || self.active.contains_key(&key)
            || self.fading.contains_key(&key)
    }

    /// Whether the slot is mid-fade
    pub fn is_fading(&self, key: PlaybackKey) -> bool {
        self.fading.contains_key(&key)
    }

    /// One fade tick: decay every fading slot, release the ones below the
    /// inaudibility floor, and re-post while work remains.
    pub(crate) fn fade_tick(&mut self) {
        debug_assert!(self.fader.is_armed(), "fade tick fired while idle");
        let divisor = self.settings.decay_divisor;
        let floor = self.settings.inaudibility_floor;

        let keys: Vec<PlaybackKey> = self.fading.keys().copied().collect();
        for key in keys {
            let Some(handle) = self.fading.get_mut(&key) else {
                continue;
            };
            let next = decay_step(handle.gain(), divisor);
            if next < floor {
                // Remove first, release second: a handle reachable from a
                // map is never a released one.
                if let Some(handle) = self.fading.remove(&key) {
                    debug!(%key, "fade complete");
                    handle.release();
                }
            } else {
                handle.apply_fade_gain(next);
            }
        }

        if self.fading.is_empty() {
            self.fader.disarm();
        } else {
            self.fader.reschedule(&self.scheduler);
        }
    }

    /// Handle an engine notification, re-posted onto the scheduler thread
    /// by the per-instance event sink. Events from superseded instances
    /// (the slot was stopped or re-initialized meanwhile) are discarded.
    pub(crate) fn on_engine_event(&mut self, key: PlaybackKey, instance: u64, event: EngineEvent) {
        match event {
            EngineEvent::Ready => {
                let current = self
                    .prepared
                    .get(&key)
                    .map(|handle| handle.instance() == instance)
                    .unwrap_or(false);
                if !current {
                    debug!(%key, instance, "ready event for superseded instance ignored");
                    return;
                }
                if let Some(mut handle) = self.prepared.remove(&key) {
                    info!(%key, label = handle.label(), "playback started");
                    handle.fire_started();
                    self.active.insert(key, handle);
                }
            }
            EngineEvent::Completed => {
                debug!(%key, instance, "playback completed");
                self.finish_instance(key, instance);
            }
            EngineEvent::Failed(message) => {
                warn!(%key, instance, %message, "engine reported failure");
                self.finish_instance(key, instance);
            }
        }
    }

    /// Release the handle for (key, instance) wherever it is tracked.
    fn finish_instance(&mut self, key: PlaybackKey, instance: u64) {
        for map in [&mut self.prepared, &mut self.active, &mut self.fading] {
            let current = map
                .get(&key)
                .map(|handle| handle.instance() == instance)
                .unwrap_or(false);
            if current {
                if let Some(handle) = map.remove(&key) {
                    handle.release();
                }
                return;
            }
        }
        debug!(%key, instance, "event for released instance ignored");
    }

    fn event_sink(&self, key: PlaybackKey, instance: u64) -> EngineEventSink {
        let scheduler = self.scheduler.clone();
        Arc::new(move |event: EngineEvent| {
            scheduler.post(move |pool| pool.on_engine_event(key, instance, event));
        })
    }
}
