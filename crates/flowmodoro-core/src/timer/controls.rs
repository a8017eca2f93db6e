//! Entry points for the presentation layer's buttons.
//!
//! Each maps one user intent onto an engine command; none of them reach
//! into presentation state.

use super::engine::TimerEngine;
use crate::error::RatioError;
use crate::events::Event;
use crate::ratio::Ratio;

impl TimerEngine {
    /// The single start/pause button.
    pub fn on_start_pause_click(&mut self) -> Vec<Event> {
        if self.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn on_break_click(&mut self) -> Vec<Event> {
        self.switch_to_break()
    }

    pub fn on_reset_click(&mut self) -> Vec<Event> {
        self.reset()
    }

    /// Returns `true` when sound is now off.
    pub fn on_mute_toggle_click(&mut self) -> bool {
        self.toggle_mute()
    }

    /// A preset `n:1` button.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`] if `n` is zero or above the configured cap.
    pub fn on_ratio_button_click(&mut self, n: u32) -> Result<Ratio, RatioError> {
        self.set_ratio_preset(n)
    }

    /// Text typed into the custom ratio field.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`]; the previous ratio stays active.
    pub fn on_custom_ratio_submit(&mut self, text: &str) -> Result<Ratio, RatioError> {
        self.set_ratio(text)
    }
}
