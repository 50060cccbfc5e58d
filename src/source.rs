use crate::{InputEvent, MouseButton, Position, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tokio::sync::broadcast;

mod hook;

pub use self::hook::{HookInjector, HookSource};

/// A producer of captured input events.
///
/// Implementations publish every observed event into a broadcast channel so
/// that the recording phase and the replay-phase watcher can consume the same
/// stream independently.
pub trait InputSource: Send + Sync {
    /// Install the underlying hook. Idempotent; a failure is fatal to the run.
    fn install(&self) -> Result<()>;

    /// Subscribe to the event stream. Only events published after the call
    /// are delivered.
    fn subscribe(&self) -> broadcast::Receiver<InputEvent>;
}

/// Issues synthetic input events to the platform
pub trait InputInjector: Send + Sync {
    /// Press and release the given mouse button at the current cursor position
    fn click(&self, button: MouseButton) -> Result<()>;

    /// Move the cursor to the given position
    fn move_to(&self, position: Position) -> Result<()>;
}

/// Marks windows during which observed input is self-generated.
///
/// The replay engine raises the guard around each injection so the input
/// watcher does not treat the injected event as an external cancellation
/// signal. An external event arriving while the guard is raised is
/// misclassified and ignored; this race window is a known limitation.
#[derive(Debug, Clone, Default)]
pub struct InjectionGuard {
    ignoring: Arc<AtomicBool>,
}

impl InjectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.ignoring.store(true, Ordering::SeqCst);
    }

    pub fn lower(&self) {
        self.ignoring.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.ignoring.load(Ordering::SeqCst)
    }
}

/// An in-memory input source fed by the caller.
///
/// Used for deterministic tests and for embedding the pipeline behind a
/// non-global event producer: the caller pushes scripted [`InputEvent`]s with
/// explicit timestamps through [`ChannelSource::sender`].
#[derive(Debug, Clone)]
pub struct ChannelSource {
    event_tx: broadcast::Sender<InputEvent>,
}

impl ChannelSource {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self { event_tx }
    }

    /// The sender used to feed events into the source
    pub fn sender(&self) -> broadcast::Sender<InputEvent> {
        self.event_tx.clone()
    }
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for ChannelSource {
    fn install(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<InputEvent> {
        self.event_tx.subscribe()
    }
}

/// An action performed by an injector, as observed by [`RecordingInjector`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InjectedAction {
    Click(MouseButton),
    Move(Position),
}

/// An injector that records actions instead of performing them
#[derive(Debug, Clone, Default)]
pub struct RecordingInjector {
    log: Arc<Mutex<Vec<InjectedAction>>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actions injected so far, in order
    pub fn injected(&self) -> Vec<InjectedAction> {
        self.log.lock().expect("injector log poisoned").clone()
    }

    /// Number of clicks injected so far
    pub fn click_count(&self) -> usize {
        self.injected()
            .iter()
            .filter(|action| matches!(action, InjectedAction::Click(_)))
            .count()
    }
}

impl InputInjector for RecordingInjector {
    fn click(&self, button: MouseButton) -> Result<()> {
        self.log
            .lock()
            .expect("injector log poisoned")
            .push(InjectedAction::Click(button));
        Ok(())
    }

    fn move_to(&self, position: Position) -> Result<()> {
        self.log
            .lock()
            .expect("injector log poisoned")
            .push(InjectedAction::Move(position));
        Ok(())
    }
}
