/// Fade-out engine: one logical timer shared by every fading slot.
///
/// The fader is an explicit two-state machine. It arms when the first slot
/// enters the fading set, then each tick re-posts itself while fading work
/// remains and transitions back to idle otherwise. A pending tick is never
/// cancelled: a tick that fires over an empty fading set disarms and does
/// nothing.
///
/// Each tick divides every fading slot's gain by the decay divisor and
/// releases slots that land below the inaudibility floor, so handles that
/// entered the fade at different times or gains all decay at the same rate
/// and finish in a bounded number of ticks.
use std::time::Duration;

use tracing::debug;

use crate::config::FadeSettings;
use crate::scheduler::SchedulerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaderState {
    /// No tick scheduled
    Idle,
    /// A tick is pending on the scheduler
    Armed,
}

#[derive(Debug)]
pub(crate) struct Fader {
    state: FaderState,
    first_tick_delay: Duration,
    tick_interval: Duration,
}

impl Fader {
    pub(crate) fn new(settings: &FadeSettings) -> Self {
        Self {
            state: FaderState::Idle,
            first_tick_delay: settings.first_tick_delay(),
            tick_interval: settings.tick_interval(),
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.state == FaderState::Armed
    }

    /// Schedule the first tick unless one is already pending. Idempotent: a
    /// burst of fade requests arms exactly one tick chain.
    pub(crate) fn arm(&mut self, scheduler: &SchedulerHandle) {
        if self.state == FaderState::Armed {
            return;
        }
        self.state = FaderState::Armed;
        debug!(delay_ms = self.first_tick_delay.as_millis() as u64, "fader armed");
        scheduler.post_delayed(self.first_tick_delay, |pool| pool.fade_tick());
    }

    /// Re-post the tick; called at the end of a tick that still has fading
    /// slots to drive.
    pub(crate) fn reschedule(&self, scheduler: &SchedulerHandle) {
        scheduler.post_delayed(self.tick_interval, |pool| pool.fade_tick());
    }

    /// Transition back to idle; called by a tick that found no fading slots.
    pub(crate) fn disarm(&mut self) {
        if self.state == FaderState::Armed {
            debug!("fader idle");
        }
        self.state = FaderState::Idle;
    }
}

/// One decay step of the fade curve.
pub(crate) fn decay_step(gain: f32, divisor: f32) -> f32 {
    gain / divisor
}

/// Number of ticks until a fade starting at `gain` crosses `floor`.
#[cfg(test)]
pub(crate) fn ticks_to_floor(mut gain: f32, divisor: f32, floor: f32) -> u32 {
    let mut ticks = 0;
    while gain >= floor {
        gain = decay_step(gain, divisor);
        ticks += 1;
    }
    ticks
}
