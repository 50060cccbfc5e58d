use serde::{Deserialize, Serialize};

/// Represents a position on the screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Represents the type of mouse button
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Represents a mouse button press or release
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Capture time in seconds since the Unix epoch
    pub timestamp: f64,

    /// The position of the cursor when the button changed state
    pub position: Position,

    /// The mouse button
    pub button: MouseButton,

    /// Whether the button was pressed (true) or released (false)
    pub pressed: bool,
}

/// Represents a cursor movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveEvent {
    /// Capture time in seconds since the Unix epoch
    pub timestamp: f64,

    /// The new cursor position
    pub position: Position,
}

/// Represents a key press
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Capture time in seconds since the Unix epoch
    pub timestamp: f64,

    /// Platform virtual key code (0 when unknown)
    pub key_code: u32,

    /// Character representation of the key (if printable)
    pub character: Option<char>,
}

/// Represents a captured input event
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum InputEvent {
    /// A mouse button press or release
    Click(ClickEvent),

    /// A cursor movement
    Move(MoveEvent),

    /// A key press
    Key(KeyEvent),
}

impl InputEvent {
    /// The capture timestamp of the event, in seconds since the Unix epoch
    pub fn timestamp(&self) -> f64 {
        match self {
            InputEvent::Click(e) => e.timestamp,
            InputEvent::Move(e) => e.timestamp,
            InputEvent::Key(e) => e.timestamp,
        }
    }
}

/// The captured event sequence from one recording phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The key that ended the recording phase
    pub stop_key: char,

    /// The recorded events, in capture order
    events: Vec<InputEvent>,
}

impl Session {
    /// Create an empty session
    pub fn new(stop_key: char) -> Self {
        Self {
            stop_key,
            events: Vec::new(),
        }
    }

    /// Append an event to the session.
    ///
    /// Stored timestamps are kept monotonically non-decreasing: an event
    /// whose timestamp regresses behind the previous one is clamped up to it.
    /// A move to the same position as the immediately preceding move is
    /// dropped as redundant.
    pub fn push(&mut self, mut event: InputEvent) {
        if let (Some(InputEvent::Move(prev)), InputEvent::Move(next)) =
            (self.events.last(), &event)
        {
            if prev.position == next.position {
                return;
            }
        }

        if let Some(last) = self.events.last() {
            let floor = last.timestamp();
            if event.timestamp() < floor {
                match &mut event {
                    InputEvent::Click(e) => e.timestamp = floor,
                    InputEvent::Move(e) => e.timestamp = floor,
                    InputEvent::Key(e) => e.timestamp = floor,
                }
            }
        }

        self.events.push(event);
    }

    /// The recorded events, in capture order
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Timestamps of recorded button presses, in capture order
    pub fn click_timestamps(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                InputEvent::Click(click) if click.pressed => Some(click.timestamp),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the session holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
