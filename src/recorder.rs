use crate::{
    CancellationToken, InjectionGuard, InputEvent, InputInjector, InputSource, IntervalModel,
    JitterOrder, MimicError, MouseButton, ReplayEngine, ReplayOutcome, ReplayPlan, Result,
    Session, spawn_input_watcher, DEFAULT_POLL_INTERVAL,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{info, warn};

/// Which pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMode {
    /// Record left-click timestamps, fit the interval model, and replay
    /// synthetic clicks at sampled intervals
    Clicks,

    /// Record the full click and move stream and replay it verbatim at the
    /// recorded relative timing
    Mouse,
}

/// Configuration for the recorder
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Which pipeline to run
    pub mode: RecorderMode,

    /// Pressing this key ends the recording phase
    pub stop_key: char,

    /// Number of synthetic clicks to generate (ignored in mouse mode)
    pub target_clicks: usize,

    /// Slice length for the cancellation-polled replay sleep
    pub poll_interval: Duration,

    /// Order of jitter and clamping applied to sampled intervals
    pub jitter_order: JitterOrder,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mode: RecorderMode::Clicks,
            stop_key: 's',
            target_clicks: 10,
            poll_interval: DEFAULT_POLL_INTERVAL,
            jitter_order: JitterOrder::default(),
        }
    }
}

/// Terminal status of one recorder run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every planned action was performed
    Completed { injected: usize },

    /// External input interrupted the generation phase
    Cancelled { injected: usize },

    /// Too little was recorded to generate anything
    InsufficientData,
}

/// Orchestrates one record-then-replay cycle
pub struct Recorder {
    source: Arc<dyn InputSource>,
    injector: Arc<dyn InputInjector>,
    config: RecorderConfig,
}

impl Recorder {
    pub fn new(
        source: Arc<dyn InputSource>,
        injector: Arc<dyn InputInjector>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            source,
            injector,
            config,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Get a stream of captured events
    pub fn event_stream(&self) -> impl Stream<Item = InputEvent> {
        let mut rx = self.source.subscribe();
        Box::pin(async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                yield event;
            }
        })
    }

    /// Record a session: install the hook and append events until the stop
    /// key is pressed.
    pub async fn record(&self) -> Result<Session> {
        self.source.install()?;
        let mut rx = self.source.subscribe();
        let mut session = Session::new(self.config.stop_key);

        match self.config.mode {
            RecorderMode::Clicks => {
                info!("Recording clicks... Press '{}' to stop.", self.config.stop_key)
            }
            RecorderMode::Mouse => info!(
                "Recording mouse clicks and movements... Press '{}' to stop.",
                self.config.stop_key
            ),
        }

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Input stream lagged, {skipped} events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                InputEvent::Key(key) => {
                    if key.character == Some(self.config.stop_key) {
                        info!("Stop key pressed, stopping recording.");
                        break;
                    }
                }
                InputEvent::Click(click) => match self.config.mode {
                    RecorderMode::Clicks if click.pressed => {
                        let previous = session.click_timestamps().last().copied();
                        session.push(event);
                        if let Some(previous) = previous {
                            info!("Recorded interval: {:.3}", click.timestamp - previous);
                        }
                    }
                    RecorderMode::Mouse => session.push(event),
                    RecorderMode::Clicks => {}
                },
                InputEvent::Move(_) => {
                    if self.config.mode == RecorderMode::Mouse {
                        session.push(event);
                    }
                }
            }
        }

        match self.config.mode {
            RecorderMode::Clicks => {
                info!("Recorded {} clicks.", session.click_timestamps().len())
            }
            RecorderMode::Mouse => info!("Recorded {} mouse events.", session.len()),
        }

        Ok(session)
    }

    /// Run one full cycle: record, build a replay plan, and execute it while
    /// watching for external input.
    pub async fn run(&self) -> Result<RunStatus> {
        let session = self.record().await?;

        let plan = match self.config.mode {
            RecorderMode::Clicks => {
                let timestamps = session.click_timestamps();
                let model = match IntervalModel::fit(&timestamps) {
                    Ok(model) => model,
                    Err(MimicError::InsufficientData { needed, got }) => {
                        warn!(
                            "Not enough clicks recorded to generate intervals: need {needed}, got {got}."
                        );
                        return Ok(RunStatus::InsufficientData);
                    }
                    Err(e) => return Err(e),
                };

                let delays = model.sample_with(
                    self.config.target_clicks,
                    self.config.jitter_order,
                    &mut rand::thread_rng(),
                )?;
                info!(
                    "Generating and executing {} synthetic clicks. Any new user input will stop the run.",
                    delays.len()
                );
                ReplayPlan::sampled(&delays, MouseButton::Left)
            }
            RecorderMode::Mouse => {
                if session.is_empty() {
                    warn!("No mouse events recorded, nothing to replay.");
                    return Ok(RunStatus::InsufficientData);
                }
                info!(
                    "Replaying {} recorded mouse events. Any new user input will stop the run.",
                    session.len()
                );
                ReplayPlan::verbatim(&session)
            }
        };

        let cancel = CancellationToken::new();
        cancel.reset();
        let guard = InjectionGuard::new();
        let watcher = spawn_input_watcher(self.source.as_ref(), cancel.clone(), guard.clone());
        let engine = ReplayEngine::new(
            Arc::clone(&self.injector),
            guard,
            self.config.poll_interval,
        );

        let outcome = engine.replay(&plan, &cancel).await;
        watcher.abort();

        match outcome? {
            ReplayOutcome::Completed { injected } => {
                info!("Generation completed: {injected} actions executed.");
                Ok(RunStatus::Completed { injected })
            }
            ReplayOutcome::CancelledEarly { injected } => {
                info!("Stopped generation due to input after {injected} actions.");
                Ok(RunStatus::Cancelled { injected })
            }
        }
    }
}
