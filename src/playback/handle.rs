/// One in-flight player: an engine instance plus its playback parameters
/// and the UI's lifecycle callbacks.
use std::fmt;

use tracing::{debug, warn};

use crate::engine::EngineInstance;

/// Lifecycle callback supplied by the UI layer
pub type LifecycleCallback = Box<dyn FnOnce() + Send>;

/// The `on_started`/`on_stopped` pair wired at initialize time.
///
/// Re-initializing a key replaces the whole subscription (last-writer-wins);
/// callbacks replaced away are dropped without firing.
#[derive(Default)]
pub struct Subscription {
    on_started: Option<LifecycleCallback>,
    on_stopped: Option<LifecycleCallback>,
}

impl Subscription {
    /// Subscription with no callbacks
    pub fn none() -> Self {
        Self::default()
    }

    /// Fire once when the slot's audio actually begins producing sound
    pub fn with_started(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_started = Some(Box::new(callback));
        self
    }

    /// Fire exactly once at final release, regardless of cause
    pub fn with_stopped(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_stopped = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("on_started", &self.on_started.is_some())
            .field("on_stopped", &self.on_stopped.is_some())
            .finish()
    }
}

/// Convert a catalog volume percentage (0–100) to a linear gain.
pub fn gain_from_percent(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}

/// Wraps exactly one engine instance together with its target gain, loop
/// flag, diagnostic label and subscription.
///
/// The handle is the sole owner of the instance; releasing consumes the
/// handle, so a released instance cannot be touched again.
pub(crate) struct PlaybackHandle {
    engine: Box<dyn EngineInstance>,
    /// Gain the slot plays at while active
    target_gain: f32,
    /// Gain currently applied to the engine; decays below `target_gain`
    /// while the slot is fading
    gain: f32,
    looped: bool,
    label: String,
    subscription: Subscription,
    /// Creation stamp used to discard events from superseded instances
    instance: u64,
}

impl PlaybackHandle {
    pub(crate) fn new(
        mut engine: Box<dyn EngineInstance>,
        gain: f32,
        looped: bool,
        label: String,
        subscription: Subscription,
        instance: u64,
    ) -> Self {
        engine.set_gain(gain);
        engine.set_loop(looped);
        Self {
            engine,
            target_gain: gain,
            gain,
            looped,
            label,
            subscription,
            instance,
        }
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn gain(&self) -> f32 {
        self.gain
    }

    /// Reset the handle in place for a re-initialize: fresh gain and loop
    /// flag, callbacks replaced wholesale. Clears any fade decay.
    pub(crate) fn reconfigure(&mut self, gain: f32, looped: bool, subscription: Subscription) {
        debug!(label = %self.label, gain, looped, "reconfiguring playback handle");
        self.target_gain = gain;
        self.looped = looped;
        self.subscription = subscription;
        self.gain = gain;
        self.engine.set_gain(gain);
        self.engine.set_loop(looped);
    }

    /// Apply a new configured volume while keeping the handle's state.
    pub(crate) fn set_volume_percent(&mut self, percent: u8) {
        let gain = gain_from_percent(percent);
        self.target_gain = gain;
        self.gain = gain;
        self.engine.set_gain(gain);
    }

    pub(crate) fn set_loop(&mut self, looped: bool) {
        self.looped = looped;
        self.engine.set_loop(looped);
    }

    /// One fade step: lower only the current gain, leaving the target
    /// untouched so a cancelled fade can restore it.
    pub(crate) fn apply_fade_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.engine.set_gain(gain);
    }

    /// Undo fade decay after a cancelled fade-out.
    pub(crate) fn restore_target_gain(&mut self) {
        self.gain = self.target_gain;
        self.engine.set_gain(self.target_gain);
    }

    pub(crate) fn start_engine(&mut self) -> crate::error::PoolResult<()> {
        self.engine.start()
    }

    pub(crate) fn is_producing(&self) -> bool {
        self.engine.is_producing()
    }

    /// Invoke `on_started`, at most once for this subscription.
    pub(crate) fn fire_started(&mut self) {
        if let Some(callback) = self.subscription.on_started.take() {
            callback();
        }
    }

    /// Dispose of the engine instance and fire `on_stopped`.
    ///
    /// Consumes the handle: release happens exactly once per instance, and
    /// a release failure is logged, never propagated; the broken native
    /// handle is dropped rather than retried.
    pub(crate) fn release(mut self) {
        debug!(label = %self.label, "releasing playback handle");
        if let Err(err) = self.engine.release() {
            warn!(label = %self.label, error = %err, "engine release failed, dropping handle anyway");
        }
        if let Some(callback) = self.subscription.on_stopped.take() {
            callback();
        }
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("label", &self.label)
            .field("target_gain", &self.target_gain)
            .field("gain", &self.gain)
            .field("looped", &self.looped)
            .field("instance", &self.instance)
            .finish()
    }
}
