//! Translates semantic gesture events into wire-ready input reports.

use crate::domain::models::{ActionKind, GestureEvent};
use crate::hid::keyboard::{KeyboardReport, KEY_3, MOD_LEFT_META, MOD_LEFT_SHIFT};
use crate::hid::mouse::{MouseReport, DELTA_MAX, DELTA_MIN};
use crate::hid::InputReport;
use thiserror::Error;
use tracing::{debug, warn};

/// Contract violation between the interpreter and the encoder. Fatal: a
/// button id the descriptor never declared cannot be encoded or ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("gesture event referenced undeclared button id {0}")]
    UnknownButton(u8),
}

/// Stateful report encoder.
///
/// Pointer and wheel deltas accumulate between flushes; the button bitmask
/// persists across calls until the matching release event. Each `encode`
/// call emits at most one mouse report plus a press/release keyboard pair
/// per action trigger, in event order.
#[derive(Debug, Default)]
pub struct ReportEncoder {
    buttons: u8,
    dx: i32,
    dy: i32,
    wheel: i32,
}

impl ReportEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the bitmask and accumulators. Called on session (re)entry so a
    /// report never carries state from before a reconnect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    pub fn encode(&mut self, events: &[GestureEvent]) -> Result<Vec<InputReport>, EncodeError> {
        let mut reports = Vec::new();
        // One mouse report per invocation; set once any pointer-affecting
        // event arrives, even a zero-motion button transition.
        let mut mouse_pending = false;

        for event in events {
            match *event {
                GestureEvent::PointerDelta { dx, dy } => {
                    self.dx += dx;
                    self.dy += dy;
                    mouse_pending = true;
                }
                GestureEvent::Scroll { delta } => {
                    self.wheel += delta;
                    mouse_pending = true;
                }
                GestureEvent::Button { button, pressed } => {
                    if button > 2 {
                        return Err(EncodeError::UnknownButton(button));
                    }
                    let bit = 1u8 << button;
                    let next = if pressed {
                        self.buttons | bit
                    } else {
                        self.buttons & !bit
                    };
                    // Idempotent: a repeated edge in the same direction is
                    // not a transition and produces no report.
                    if next != self.buttons {
                        self.buttons = next;
                        mouse_pending = true;
                    }
                }
                GestureEvent::ActionTrigger { action } => {
                    // Keyboard reports never interleave inside a mouse
                    // report: flush any pending pointer state first.
                    if mouse_pending {
                        reports.push(self.flush_mouse());
                        mouse_pending = false;
                    }
                    let (modifier, keycode) = action_chord(action);
                    debug!("encoding action chord for {:?}", action);
                    reports.push(InputReport::Keyboard(KeyboardReport::shortcut(
                        modifier, keycode,
                    )));
                    reports.push(InputReport::Keyboard(KeyboardReport::empty()));
                }
            }
        }

        if mouse_pending {
            reports.push(self.flush_mouse());
        }
        Ok(reports)
    }

    fn flush_mouse(&mut self) -> InputReport {
        let report = MouseReport {
            buttons: self.buttons,
            x: self.clamp_delta(self.dx, "dx"),
            y: self.clamp_delta(self.dy, "dy"),
            wheel: self.clamp_delta(self.wheel, "wheel"),
        };
        self.dx = 0;
        self.dy = 0;
        self.wheel = 0;
        InputReport::Mouse(report)
    }

    /// Clamp to the descriptor's signed range. Clamping is recorded, never
    /// silent; wrapping would teleport the cursor.
    fn clamp_delta(&self, value: i32, field: &str) -> i8 {
        if value > DELTA_MAX || value < DELTA_MIN {
            warn!("{} delta {} exceeds report range, clamping", field, value);
        }
        value.clamp(DELTA_MIN, DELTA_MAX) as i8
    }
}

fn action_chord(action: ActionKind) -> (u8, u8) {
    match action {
        // The host-side screenshot shortcut: Meta+Shift+3.
        ActionKind::Screenshot => (MOD_LEFT_META | MOD_LEFT_SHIFT, KEY_3),
    }
}
