use crate::{InjectionGuard, InputEvent, InputInjector, InputSource, MouseButton, Position, Result, Session};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info};

/// Default slice length for the cancellation-polled sleep
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A synthetic action to perform during replay
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayAction {
    /// Press and release a mouse button at the current cursor position
    Click(MouseButton),

    /// Move the cursor to a recorded position
    MoveTo(Position),
}

/// One step of a replay plan: wait, then act
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayStep {
    pub delay: Duration,
    pub action: ReplayAction,
}

/// An ordered sequence of (delay, action) pairs driving the replay phase
#[derive(Debug, Clone, Default)]
pub struct ReplayPlan {
    steps: Vec<ReplayStep>,
}

impl ReplayPlan {
    /// A plan of synthetic clicks at the given sampled intervals.
    /// Negative delays (possible after jitter on near-zero samples) are
    /// treated as zero.
    pub fn sampled(delays: &[f64], button: MouseButton) -> Self {
        let steps = delays
            .iter()
            .map(|delay| ReplayStep {
                delay: Duration::from_secs_f64(delay.max(0.0)),
                action: ReplayAction::Click(button),
            })
            .collect();
        Self { steps }
    }

    /// A plan reproducing the session's events at their recorded relative
    /// timing. Button presses become clicks and moves become cursor moves;
    /// events that inject nothing (button releases, key presses) contribute
    /// their delay to the following step so relative timing is preserved.
    pub fn verbatim(session: &Session) -> Self {
        let mut steps = Vec::new();
        let mut pending = Duration::ZERO;
        let mut previous_timestamp = None;

        for event in session.events() {
            let timestamp = event.timestamp();
            if let Some(previous) = previous_timestamp {
                pending += Duration::from_secs_f64(f64::max(timestamp - previous, 0.0));
            }
            previous_timestamp = Some(timestamp);

            let action = match event {
                InputEvent::Click(click) if click.pressed => Some(ReplayAction::Click(click.button)),
                InputEvent::Move(m) => Some(ReplayAction::MoveTo(m.position)),
                _ => None,
            };

            if let Some(action) = action {
                steps.push(ReplayStep {
                    delay: pending,
                    action,
                });
                pending = Duration::ZERO;
            }
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[ReplayStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Shared signal causing early termination of a phase.
///
/// Level-triggered: set at most once per phase, read repeatedly, and reset
/// explicitly before the next phase begins.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Terminal outcome of a replay phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every planned action was performed
    Completed { injected: usize },

    /// External input was detected; no further actions were performed
    CancelledEarly { injected: usize },
}

/// Performs a replay plan against an injector, polling a cancellation token
pub struct ReplayEngine {
    injector: Arc<dyn InputInjector>,
    guard: InjectionGuard,
    poll_interval: Duration,
}

impl ReplayEngine {
    pub fn new(
        injector: Arc<dyn InputInjector>,
        guard: InjectionGuard,
        poll_interval: Duration,
    ) -> Self {
        Self {
            injector,
            guard,
            poll_interval,
        }
    }

    /// Run the plan to completion or until the token is set.
    ///
    /// Each delay is slept in `poll_interval` slices with the token rechecked
    /// per slice, so cancellation latency is bounded by the slice length
    /// rather than the full delay. A cancellation observed mid-sleep stops
    /// the run before the pending action executes.
    pub async fn replay(
        &self,
        plan: &ReplayPlan,
        cancel: &CancellationToken,
    ) -> Result<ReplayOutcome> {
        let mut injected = 0;

        for step in plan.steps() {
            if cancel.is_cancelled() {
                return Ok(ReplayOutcome::CancelledEarly { injected });
            }

            let mut remaining = step.delay;
            while !remaining.is_zero() {
                let slice = remaining.min(self.poll_interval);
                tokio::time::sleep(slice).await;
                remaining = remaining.saturating_sub(slice);
                if cancel.is_cancelled() {
                    return Ok(ReplayOutcome::CancelledEarly { injected });
                }
            }

            // The guard marks the injected event as self-generated so the
            // input watcher does not cancel the run over it.
            self.guard.raise();
            let result = match step.action {
                ReplayAction::Click(button) => self.injector.click(button),
                ReplayAction::MoveTo(position) => self.injector.move_to(position),
            };
            self.guard.lower();
            result?;

            injected += 1;
            debug!("Injected {:?}", step.action);
        }

        Ok(ReplayOutcome::Completed { injected })
    }
}

/// Watch the source for external input during replay and set the token.
///
/// Cursor moves and key presses cancel; click events are deliberately not
/// observed, since clicks are the injected channel. Events arriving while
/// the guard is raised are treated as self-generated and ignored.
pub fn spawn_input_watcher(
    source: &dyn InputSource,
    cancel: CancellationToken,
    guard: InjectionGuard,
) -> JoinHandle<()> {
    let mut rx = source.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(InputEvent::Move(_)) | Ok(InputEvent::Key(_)) => {
                    if !guard.is_raised() {
                        info!("External input detected, stopping generation");
                        cancel.cancel();
                        break;
                    }
                }
                Ok(InputEvent::Click(_)) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClickEvent, KeyEvent, MoveEvent, RecordingInjector};

    fn engine(injector: &RecordingInjector) -> ReplayEngine {
        ReplayEngine::new(
            Arc::new(injector.clone()),
            InjectionGuard::new(),
            DEFAULT_POLL_INTERVAL,
        )
    }

    #[tokio::test]
    async fn empty_plan_completes_without_injections() {
        let injector = RecordingInjector::new();
        let outcome = engine(&injector)
            .replay(&ReplayPlan::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ReplayOutcome::Completed { injected: 0 });
        assert!(injector.injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_plan_injects_every_action() {
        let injector = RecordingInjector::new();
        let plan = ReplayPlan::sampled(&[0.05, 0.05, 0.05], MouseButton::Left);

        let outcome = engine(&injector)
            .replay(&plan, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ReplayOutcome::Completed { injected: 3 });
        assert_eq!(injector.click_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_sleep_within_the_poll_interval() {
        let injector = RecordingInjector::new();
        let cancel = CancellationToken::new();
        let plan = ReplayPlan::sampled(&[5.0], MouseButton::Left);

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(45)).await;
                cancel.cancel();
            })
        };

        let started = tokio::time::Instant::now();
        let outcome = engine(&injector).replay(&plan, &cancel).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(outcome, ReplayOutcome::CancelledEarly { injected: 0 });
        assert!(injector.injected().is_empty());
        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_millis(45) + 2 * DEFAULT_POLL_INTERVAL,
            "cancellation took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_the_first_action() {
        let injector = RecordingInjector::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let plan = ReplayPlan::sampled(&[0.0, 0.0], MouseButton::Left);
        let outcome = engine(&injector).replay(&plan, &cancel).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::CancelledEarly { injected: 0 });
        assert!(injector.injected().is_empty());
    }

    #[test]
    fn verbatim_plan_preserves_relative_delays() {
        let mut session = Session::new('s');
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.0,
            position: Position { x: 1.0, y: 1.0 },
        }));
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 0.2,
            position: Position { x: 1.0, y: 1.0 },
            button: MouseButton::Left,
            pressed: true,
        }));
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 0.25,
            position: Position { x: 1.0, y: 1.0 },
            button: MouseButton::Left,
            pressed: false,
        }));
        session.push(InputEvent::Move(MoveEvent {
            timestamp: 0.4,
            position: Position { x: 5.0, y: 5.0 },
        }));

        let plan = ReplayPlan::verbatim(&session);
        assert_eq!(plan.len(), 3);

        let steps = plan.steps();
        assert_eq!(steps[0].delay, Duration::ZERO);
        assert_eq!(steps[0].action, ReplayAction::MoveTo(Position { x: 1.0, y: 1.0 }));
        assert_eq!(steps[1].delay, Duration::from_secs_f64(0.2));
        assert_eq!(steps[1].action, ReplayAction::Click(MouseButton::Left));
        // The click release injects nothing; its delay rolls into the move.
        assert_eq!(steps[2].delay, Duration::from_secs_f64(0.2));
        assert_eq!(steps[2].action, ReplayAction::MoveTo(Position { x: 5.0, y: 5.0 }));
    }

    #[test]
    fn verbatim_plan_skips_key_events_but_keeps_their_delay() {
        let mut session = Session::new('s');
        session.push(InputEvent::Key(KeyEvent {
            timestamp: 0.0,
            key_code: 0x41,
            character: Some('a'),
        }));
        session.push(InputEvent::Click(ClickEvent {
            timestamp: 0.3,
            position: Position { x: 0.0, y: 0.0 },
            button: MouseButton::Right,
            pressed: true,
        }));

        let plan = ReplayPlan::verbatim(&session);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].delay, Duration::from_secs_f64(0.3));
        assert_eq!(plan.steps()[0].action, ReplayAction::Click(MouseButton::Right));
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_ignores_events_while_the_guard_is_raised() {
        let source = crate::ChannelSource::new();
        let cancel = CancellationToken::new();
        let guard = InjectionGuard::new();
        let watcher = spawn_input_watcher(&source, cancel.clone(), guard.clone());

        guard.raise();
        source
            .sender()
            .send(InputEvent::Move(MoveEvent {
                timestamp: 1.0,
                position: Position { x: 2.0, y: 2.0 },
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!cancel.is_cancelled());

        guard.lower();
        source
            .sender()
            .send(InputEvent::Key(KeyEvent {
                timestamp: 2.0,
                key_code: 0,
                character: None,
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cancel.is_cancelled());

        watcher.await.unwrap();
    }
}
