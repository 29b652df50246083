//! Keyboard state tracking on top of crossterm events.
//!
//! Movement keys are level-triggered (held), jump is edge-triggered and
//! latched until the next simulation tick consumes it. Terminals that never
//! report key releases fall back to a hold timeout.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use skyrun_core::FrameInput;

/// A key with no Press/Repeat event for this long counts as released.
/// Honoured Release events end a hold earlier.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const LEFT_KEYS: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT_KEYS: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const JUMP_KEYS: [KeyCode; 4] = [
    KeyCode::Char(' '),
    KeyCode::Up,
    KeyCode::Char('w'),
    KeyCode::Char('W'),
];
const QUIT_KEYS: [KeyCode; 3] = [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

pub struct InputState {
    /// Timestamp of the last Press/Repeat event per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Honour explicit Release events. Only set when keyboard enhancement
    /// was successfully enabled.
    pub honor_release: bool,
    jump_latched: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            jump_latched: false,
        }
    }

    /// Read every pending terminal event without blocking.
    pub fn drain_events(&mut self) -> io::Result<()> {
        self.fresh_presses.clear();
        self.raw_events.clear();

        let now = Instant::now();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.apply_key(key, now);
            }
        }
        self.expire(now);
        Ok(())
    }

    fn apply_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            },
            // Unreliable without enhancement; the timeout handles it.
            KeyEventKind::Release => {},
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                    if JUMP_KEYS.contains(&key.code) {
                        self.jump_latched = true;
                    }
                }
            },
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active
            .retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.is_held_at(*c, now))
    }

    pub fn quit_requested(&self) -> bool {
        let ctrl_c = self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        });
        ctrl_c || self.fresh_presses.iter().any(|c| QUIT_KEYS.contains(c))
    }

    /// Sample held directions and consume the latched jump.
    pub fn frame_input(&mut self) -> FrameInput {
        FrameInput {
            left: self.any_held(&LEFT_KEYS),
            right: self.any_held(&RIGHT_KEYS),
            jump: std::mem::take(&mut self.jump_latched),
        }
    }
}
