//! Global keyboard and mouse observation.
//!
//! The OS hook runs on its own thread and only bumps in-memory counters; it
//! never touches the database. The capture cycle drains the counters with
//! [`InputCounters::take`] at its own, much lower, frequency.

use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_warning};
use parking_lot::Mutex;
use rdev::{listen, Button, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key codes kept per capture window. Presses past this are still counted.
const MAX_SEQUENCE: usize = 2048;

const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSignal {
    KeyDown(u32),
    LeftClick,
    RightClick,
    MouseMove,
    Wheel,
}

/// Counters accumulated since the last [`InputCounters::take`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub key_presses: i64,
    pub key_sequence: Vec<u32>,
    pub left_clicks: i64,
    pub right_clicks: i64,
    pub mouse_movements: i64,
    pub wheel: i64,
}

impl InputSnapshot {
    pub fn mouse_events(&self) -> i64 {
        self.left_clicks + self.right_clicks + self.mouse_movements + self.wheel
    }

    pub fn is_empty(&self) -> bool {
        self.key_presses == 0 && self.mouse_events() == 0
    }

    /// Adds `other` into `self`.
    pub fn absorb(&mut self, other: InputSnapshot) {
        self.key_presses += other.key_presses;
        let room = MAX_SEQUENCE.saturating_sub(self.key_sequence.len());
        self.key_sequence.extend(other.key_sequence.into_iter().take(room));
        self.left_clicks += other.left_clicks;
        self.right_clicks += other.right_clicks;
        self.mouse_movements += other.mouse_movements;
        self.wheel += other.wheel;
    }
}

#[derive(Debug)]
struct CounterState {
    snapshot: InputSnapshot,
    last_input: Instant,
}

#[derive(Debug)]
pub struct InputCounters {
    state: Mutex<CounterState>,
}

impl Default for InputCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCounters {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CounterState {
                snapshot: InputSnapshot::default(),
                last_input: Instant::now(),
            }),
        }
    }

    /// Counts one input signal and resets the idle clock.
    pub fn record(&self, signal: InputSignal) {
        let mut state = self.state.lock();
        state.last_input = Instant::now();
        let snapshot = &mut state.snapshot;
        match signal {
            InputSignal::KeyDown(code) => {
                snapshot.key_presses += 1;
                if snapshot.key_sequence.len() < MAX_SEQUENCE {
                    snapshot.key_sequence.push(code);
                }
            }
            InputSignal::LeftClick => snapshot.left_clicks += 1,
            InputSignal::RightClick => snapshot.right_clicks += 1,
            InputSignal::MouseMove => snapshot.mouse_movements += 1,
            InputSignal::Wheel => snapshot.wheel += 1,
        }
    }

    /// Returns the counters and resets them in one step.
    pub fn take(&self) -> InputSnapshot {
        std::mem::take(&mut self.state.lock().snapshot)
    }

    /// Time since the last observed signal.
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_input.elapsed()
    }
}

pub type SignalSink = Arc<dyn Fn(InputSignal) + Send + Sync>;

/// Source of raw input signals.
pub trait HookBackend: Send + Sync + 'static {
    /// Installs the OS hook and feeds every signal to `sink`. Called at most
    /// once per [`InputHook`]; the hook stays installed for the process lifetime.
    fn install(&self, sink: SignalSink) -> anyhow::Result<()>;
}

/// `rdev::listen` on a dedicated thread, restarted if it errors out.
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevBackend;

impl HookBackend for RdevBackend {
    fn install(&self, sink: SignalSink) -> anyhow::Result<()> {
        std::thread::Builder::new().name("trackvault-input".into()).spawn(move || loop {
            let sink = Arc::clone(&sink);
            match listen(move |event: Event| {
                if let Some(signal) = translate(&event.event_type) {
                    sink(signal);
                }
            }) {
                Ok(()) => break,
                Err(e) => {
                    msg_error!(Message::ErrorInRdevListener(format!("{:?}", e)));
                    std::thread::sleep(LISTEN_RETRY_DELAY);
                }
            }
        })?;
        Ok(())
    }
}

pub fn translate(event_type: &EventType) -> Option<InputSignal> {
    match event_type {
        EventType::KeyPress(key) => Some(InputSignal::KeyDown(key_code(key))),
        EventType::ButtonPress(Button::Left) => Some(InputSignal::LeftClick),
        EventType::ButtonPress(Button::Right) => Some(InputSignal::RightClick),
        EventType::MouseMove { .. } => Some(InputSignal::MouseMove),
        EventType::Wheel { .. } => Some(InputSignal::Wheel),
        _ => None,
    }
}

// FNV-1a over the key name; raw codes only for keys rdev does not name.
fn key_code(key: &Key) -> u32 {
    match key {
        Key::Unknown(code) => *code,
        named => format!("{named:?}")
            .bytes()
            .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ byte as u32).wrapping_mul(0x0100_0193)),
    }
}

/// Observation-only adapter over a [`HookBackend`].
pub struct InputHook<B: HookBackend = RdevBackend> {
    backend: B,
    counters: Arc<InputCounters>,
    listening: Arc<AtomicBool>,
    installed: AtomicBool,
}

impl InputHook<RdevBackend> {
    pub fn system() -> Self {
        Self::new(RdevBackend)
    }
}

impl<B: HookBackend> InputHook<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            counters: Arc::new(InputCounters::new()),
            listening: Arc::new(AtomicBool::new(false)),
            installed: AtomicBool::new(false),
        }
    }

    pub fn counters(&self) -> Arc<InputCounters> {
        Arc::clone(&self.counters)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Starts counting signals. Returns `Ok(false)` when already listening.
    pub fn start_listener(&self) -> anyhow::Result<bool> {
        if self.listening.swap(true, Ordering::SeqCst) {
            msg_warning!(Message::InputListenerAlreadyRunning);
            return Ok(false);
        }

        if !self.installed.swap(true, Ordering::SeqCst) {
            let counters = Arc::clone(&self.counters);
            let listening = Arc::clone(&self.listening);
            let sink: SignalSink = Arc::new(move |signal| {
                if listening.load(Ordering::Relaxed) {
                    counters.record(signal);
                }
            });
            if let Err(e) = self.backend.install(sink) {
                self.installed.store(false, Ordering::SeqCst);
                self.listening.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        msg_info!(Message::InputListenerStarted);
        Ok(true)
    }

    /// Stops counting. The OS hook stays installed but its signals are dropped.
    pub fn stop_listener(&self) -> bool {
        if !self.listening.swap(false, Ordering::SeqCst) {
            msg_debug!(Message::InputListenerNotRunning);
            return false;
        }
        msg_info!(Message::InputListenerStopped);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resets_counters() {
        let counters = InputCounters::new();
        counters.record(InputSignal::KeyDown(30));
        counters.record(InputSignal::KeyDown(31));
        counters.record(InputSignal::LeftClick);
        counters.record(InputSignal::Wheel);

        let snapshot = counters.take();
        assert_eq!(snapshot.key_presses, 2);
        assert_eq!(snapshot.key_sequence, vec![30, 31]);
        assert_eq!(snapshot.mouse_events(), 2);
        assert!(counters.take().is_empty());
    }

    #[test]
    fn sequence_is_capped_but_presses_are_counted() {
        let counters = InputCounters::new();
        for _ in 0..MAX_SEQUENCE + 10 {
            counters.record(InputSignal::KeyDown(1));
        }
        let snapshot = counters.take();
        assert_eq!(snapshot.key_presses as usize, MAX_SEQUENCE + 10);
        assert_eq!(snapshot.key_sequence.len(), MAX_SEQUENCE);
    }

    #[test]
    fn translates_rdev_events() {
        assert_eq!(translate(&EventType::ButtonPress(Button::Right)), Some(InputSignal::RightClick));
        assert_eq!(translate(&EventType::MouseMove { x: 1.0, y: 2.0 }), Some(InputSignal::MouseMove));
        assert_eq!(translate(&EventType::KeyPress(Key::Unknown(77))), Some(InputSignal::KeyDown(77)));
        assert_eq!(translate(&EventType::KeyRelease(Key::KeyA)), None);
        assert_eq!(key_code(&Key::KeyA), key_code(&Key::KeyA));
        assert_ne!(key_code(&Key::KeyA), key_code(&Key::KeyB));
    }
}
