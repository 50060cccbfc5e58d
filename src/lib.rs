//! Click-timing recorder and synthetic replayer
//!
//! This crate records mouse and keyboard input through a global hook, fits a
//! log-normal model to the observed inter-click intervals, and replays
//! synthetic clicks at intervals drawn from that model. A second mode
//! replays the recorded click and move stream verbatim at its original
//! relative timing. During replay, any external mouse move or key press
//! cancels the run.

pub mod error;
pub mod events;
pub mod model;
pub mod recorder;
pub mod replay;
pub mod source;

pub use error::*;
pub use events::*;
pub use model::*;
pub use recorder::*;
pub use replay::*;
pub use source::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_copy_trait() {
        let pos1 = Position { x: 100.0, y: 200.0 };
        let pos2 = pos1;
        assert_eq!(pos1.x, pos2.x);
        assert_eq!(pos1.y, pos2.y);
    }

    #[test]
    fn test_mouse_button_equality() {
        assert_eq!(MouseButton::Left, MouseButton::Left);
        assert_ne!(MouseButton::Left, MouseButton::Right);
        assert_ne!(MouseButton::Right, MouseButton::Middle);
    }

    #[test]
    fn test_session_clamps_regressing_timestamps() {
        let mut session = Session::new('s');
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 2.0,
            position: Position { x: 0.0, y: 0.0 },
            button: MouseButton::Left,
            pressed: true,
        }));
        // Arrives out of order relative to its timestamp
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 1.5,
            position: Position { x: 0.0, y: 0.0 },
            button: MouseButton::Left,
            pressed: true,
        }));

        let timestamps = session.click_timestamps();
        assert_eq!(timestamps, vec![2.0, 2.0]);
    }

    #[test]
    fn test_session_skips_redundant_moves() {
        let mut session = Session::new('s');
        let position = Position { x: 10.0, y: 10.0 };
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.0,
            position,
        }));
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.1,
            position,
        }));
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.2,
            position: Position { x: 11.0, y: 10.0 },
        }));

        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_click_timestamps_filters_releases_and_other_events() {
        let mut session = Session::new('s');
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.0,
            position: Position { x: 0.0, y: 0.0 },
        }));
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 0.5,
            position: Position { x: 0.0, y: 0.0 },
            button: MouseButton::Left,
            pressed: true,
        }));
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 0.6,
            position: Position { x: 0.0, y: 0.0 },
            button: MouseButton::Left,
            pressed: false,
        }));
        session.push(InputEvent::Key(KeyEvent {
            timestamp: 0.7,
            key_code: 0x53,
            character: Some('s'),
        }));

        assert_eq!(session.click_timestamps(), vec![0.5]);
    }

    #[test]
    fn test_input_event_serialization_roundtrip() {
        let event = InputEvent::Click(ClickEvent {
            timestamp: 12.5,
            position: Position { x: 100.0, y: 200.0 },
            button: MouseButton::Left,
            pressed: true,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Click"));

        let decoded: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.timestamp(), 12.5);
    }
}
