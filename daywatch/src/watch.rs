//! The outer polling loop: re-run the controller on an interval and raise the
//! notification once the target condition is reached.

use std::time::Duration;
use thiserror::Error;
use tokio::task;
use tracing::{error, info, warn};

use crate::controller::RunController;
use crate::notify::NotificationSink;
use crate::types::RunOutcome;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Run task failed: {0}")]
    Join(#[from] task::JoinError),

    #[error("Run failed fatally: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Pause between two runs that did not reach the target
    pub poll_interval: Duration,
    pub message: String,
    /// How many times the message is sent once the target is reached
    pub repeat: u32,
    pub repeat_interval: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            message: "Business day has rolled over".to_string(),
            repeat: 1,
            repeat_interval: Duration::from_secs(60),
        }
    }
}

pub struct Watcher<S> {
    controller: Option<RunController>,
    sink: S,
    settings: WatchSettings,
    polls: u32,
}

impl<S: NotificationSink> Watcher<S> {
    pub fn new(controller: RunController, sink: S, settings: WatchSettings) -> Self {
        Self {
            controller: Some(controller),
            sink,
            settings,
            polls: 0,
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the controller once on a blocking thread and notify if the target
    /// was reached.
    pub async fn poll_once(&mut self) -> Result<RunOutcome, WatchError> {
        let Some(mut controller) = self.controller.take() else {
            return Err(WatchError::Fatal("controller lost in a previous poll".to_string()));
        };
        let (controller, outcome) = task::spawn_blocking(move || {
            let outcome = controller.run();
            (controller, outcome)
        })
        .await?;
        self.controller = Some(controller);
        self.polls += 1;

        if outcome.target_reached() {
            self.notify().await;
        }
        Ok(outcome)
    }

    /// Poll until the target is reached or a run fails fatally.
    pub async fn run(&mut self) -> Result<RunOutcome, WatchError> {
        loop {
            match self.poll_once().await? {
                outcome @ RunOutcome::Success { matched: true } => {
                    info!(polls = self.polls, "target reached, stopping watch");
                    return Ok(outcome);
                }
                RunOutcome::Success { matched: false } => {
                    info!(next_in = ?self.settings.poll_interval, "target not reached yet");
                }
                RunOutcome::Retry(reason) => {
                    warn!(reason = %reason, next_in = ?self.settings.poll_interval, "run gave up, will try again");
                }
                RunOutcome::Fatal(reason) => {
                    error!(reason = %reason, "stopping watch");
                    return Err(WatchError::Fatal(reason));
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn notify(&self) {
        for n in 1..=self.settings.repeat {
            if let Err(e) = self.sink.send(&self.settings.message).await {
                error!(error = %e, "failed to deliver notification");
            }
            if n < self.settings.repeat {
                tokio::time::sleep(self.settings.repeat_interval).await;
            }
        }
    }
}
