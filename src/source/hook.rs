use crate::{
    ClickEvent, InputEvent, InputInjector, InputSource, KeyEvent, MimicError, MouseButton,
    MoveEvent, Position, Result,
};
use rdev::{Button, EventType, Key};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    time::{Duration, SystemTime},
};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// How long to wait for the listener thread to report an install failure
/// before assuming the hook is in place. `rdev::listen` never returns on
/// success, so success cannot be acknowledged directly.
const INSTALL_GRACE: Duration = Duration::from_millis(100);

/// Global input source backed by an `rdev` listener thread.
///
/// The hook is installed once per process; a stop indicator gates the
/// callback afterwards, since the underlying listener cannot be torn down.
pub struct HookSource {
    event_tx: broadcast::Sender<InputEvent>,
    stop_indicator: Arc<AtomicBool>,
    installed: AtomicBool,
}

impl HookSource {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            event_tx,
            stop_indicator: Arc::new(AtomicBool::new(false)),
            installed: AtomicBool::new(false),
        }
    }

    /// Stop publishing events. The listener thread itself remains alive
    /// until process termination.
    pub fn stop(&self) {
        debug!("Stopping hook source");
        self.stop_indicator.store(true, Ordering::SeqCst);
    }
}

impl Default for HookSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for HookSource {
    fn install(&self) -> Result<()> {
        if self.installed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("Installing global input hook");
        let event_tx = self.event_tx.clone();
        let stop_indicator = Arc::clone(&self.stop_indicator);
        let (err_tx, err_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut last_position = Position { x: 0.0, y: 0.0 };
            if let Err(listen_error) = rdev::listen(move |event| {
                if stop_indicator.load(Ordering::SeqCst) {
                    return;
                }

                let timestamp = epoch_seconds(event.time);
                match event.event_type {
                    EventType::ButtonPress(button) => {
                        if let Some(button) = convert_button(button) {
                            let _ = event_tx.send(InputEvent::Click(ClickEvent {
                                timestamp,
                                position: last_position,
                                button,
                                pressed: true,
                            }));
                        }
                    }
                    EventType::ButtonRelease(button) => {
                        if let Some(button) = convert_button(button) {
                            let _ = event_tx.send(InputEvent::Click(ClickEvent {
                                timestamp,
                                position: last_position,
                                button,
                                pressed: false,
                            }));
                        }
                    }
                    EventType::MouseMove { x, y } => {
                        last_position = Position { x, y };
                        let _ = event_tx.send(InputEvent::Move(MoveEvent {
                            timestamp,
                            position: last_position,
                        }));
                    }
                    EventType::KeyPress(key) => {
                        let (key_code, character) = key_info(&key);
                        let _ = event_tx.send(InputEvent::Key(KeyEvent {
                            timestamp,
                            key_code,
                            character,
                        }));
                    }
                    EventType::KeyRelease(_) | EventType::Wheel { .. } => {}
                }
            }) {
                error!("Failed to listen for input events: {:?}", listen_error);
                let _ = err_tx.send(listen_error);
            }
            info!("Input listener thread has finished");
        });

        match err_rx.recv_timeout(INSTALL_GRACE) {
            Ok(listen_error) => {
                self.installed.store(false, Ordering::SeqCst);
                Err(MimicError::Hook(format!("{listen_error:?}")))
            }
            Err(_) => Ok(()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<InputEvent> {
        self.event_tx.subscribe()
    }
}

/// Injector backed by `rdev::simulate`
pub struct HookInjector {
    /// Pause between the press and release halves of a click, so the target
    /// platform registers them as distinct events
    press_hold: Duration,
}

impl HookInjector {
    pub fn new() -> Self {
        Self {
            press_hold: Duration::from_millis(20),
        }
    }

    fn simulate(&self, event_type: &EventType) -> Result<()> {
        rdev::simulate(event_type).map_err(|e| MimicError::Injection(format!("{e:?}")))
    }
}

impl Default for HookInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for HookInjector {
    fn click(&self, button: MouseButton) -> Result<()> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.simulate(&EventType::ButtonPress(button))?;
        std::thread::sleep(self.press_hold);
        self.simulate(&EventType::ButtonRelease(button))
    }

    fn move_to(&self, position: Position) -> Result<()> {
        self.simulate(&EventType::MouseMove {
            x: position.x,
            y: position.y,
        })
    }
}

fn epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn convert_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Map a key to its virtual key code and printable character, if any.
/// Unmapped keys yield code 0 and no character.
fn key_info(key: &Key) -> (u32, Option<char>) {
    match key {
        Key::KeyA => (0x41, Some('a')),
        Key::KeyB => (0x42, Some('b')),
        Key::KeyC => (0x43, Some('c')),
        Key::KeyD => (0x44, Some('d')),
        Key::KeyE => (0x45, Some('e')),
        Key::KeyF => (0x46, Some('f')),
        Key::KeyG => (0x47, Some('g')),
        Key::KeyH => (0x48, Some('h')),
        Key::KeyI => (0x49, Some('i')),
        Key::KeyJ => (0x4A, Some('j')),
        Key::KeyK => (0x4B, Some('k')),
        Key::KeyL => (0x4C, Some('l')),
        Key::KeyM => (0x4D, Some('m')),
        Key::KeyN => (0x4E, Some('n')),
        Key::KeyO => (0x4F, Some('o')),
        Key::KeyP => (0x50, Some('p')),
        Key::KeyQ => (0x51, Some('q')),
        Key::KeyR => (0x52, Some('r')),
        Key::KeyS => (0x53, Some('s')),
        Key::KeyT => (0x54, Some('t')),
        Key::KeyU => (0x55, Some('u')),
        Key::KeyV => (0x56, Some('v')),
        Key::KeyW => (0x57, Some('w')),
        Key::KeyX => (0x58, Some('x')),
        Key::KeyY => (0x59, Some('y')),
        Key::KeyZ => (0x5A, Some('z')),
        Key::Num0 => (0x30, Some('0')),
        Key::Num1 => (0x31, Some('1')),
        Key::Num2 => (0x32, Some('2')),
        Key::Num3 => (0x33, Some('3')),
        Key::Num4 => (0x34, Some('4')),
        Key::Num5 => (0x35, Some('5')),
        Key::Num6 => (0x36, Some('6')),
        Key::Num7 => (0x37, Some('7')),
        Key::Num8 => (0x38, Some('8')),
        Key::Num9 => (0x39, Some('9')),
        Key::Space => (0x20, Some(' ')),
        Key::BackQuote => (0xC0, Some('`')),
        Key::Escape => (0x1B, None),
        Key::Backspace => (0x08, None),
        Key::Tab => (0x09, None),
        Key::Return => (0x0D, None),
        _ => (0, None),
    }
}
