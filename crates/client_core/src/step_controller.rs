//! Derives the active flow step from session-account and permission presence.

use shared::domain::Step;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

/// Picks the step to show. A stored permission only counts once a session
/// account is also present; on its own it leaves the flow at account creation.
pub fn evaluate_step(has_session_account: bool, has_stored_permission: bool) -> Step {
    if has_stored_permission && has_session_account {
        Step::PermissionRedemption
    } else if has_session_account {
        Step::PermissionGranting
    } else {
        Step::AccountCreation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("step inputs are no longer published")]
pub struct InputsClosed;

/// Observes two presence sources and republishes the derived [`Step`].
///
/// Any `Some` value counts as present. [`StepController::step`] always reads
/// the latest inputs, so a change is reflected as soon as it is published.
pub struct StepController<S, P> {
    session: watch::Receiver<Option<S>>,
    permission: watch::Receiver<Option<P>>,
    published: watch::Sender<Step>,
}

impl<S, P> StepController<S, P> {
    pub fn new(
        mut session: watch::Receiver<Option<S>>,
        mut permission: watch::Receiver<Option<P>>,
    ) -> Self {
        let step = evaluate_step(
            session.borrow_and_update().is_some(),
            permission.borrow_and_update().is_some(),
        );
        let (published, _) = watch::channel(step);
        Self {
            session,
            permission,
            published,
        }
    }

    pub fn step(&self) -> Step {
        evaluate_step(
            self.session.borrow().is_some(),
            self.permission.borrow().is_some(),
        )
    }

    /// Receiver for the published step; only notified when the step differs.
    pub fn subscribe(&self) -> watch::Receiver<Step> {
        self.published.subscribe()
    }

    /// Waits for either input to change, then recomputes and publishes.
    pub async fn changed(&mut self) -> Result<Step, InputsClosed> {
        tokio::select! {
            res = self.session.changed() => res,
            res = self.permission.changed() => res,
        }
        .map_err(|_| InputsClosed)?;

        let step = evaluate_step(
            self.session.borrow_and_update().is_some(),
            self.permission.borrow_and_update().is_some(),
        );
        self.publish(step);
        Ok(step)
    }

    fn publish(&self, step: Step) {
        let modified = self.published.send_if_modified(|current| {
            if *current == step {
                return false;
            }
            *current = step;
            true
        });
        if modified {
            debug!(step = ?step, "step changed");
        }
    }
}

impl<S, P> StepController<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Moves the controller onto a background task that keeps the published
    /// step current until either input source goes away.
    pub fn spawn(mut self) -> StepWatcher {
        let steps = self.subscribe();
        let task = tokio::spawn(async move {
            while self.changed().await.is_ok() {}
            debug!("step inputs closed; controller stopped");
        });
        StepWatcher { steps, task }
    }
}

pub struct StepWatcher {
    steps: watch::Receiver<Step>,
    task: JoinHandle<()>,
}

impl StepWatcher {
    pub fn current(&self) -> Step {
        *self.steps.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Step> {
        self.steps.clone()
    }

    pub fn stream(&self) -> WatchStream<Step> {
        WatchStream::new(self.steps.clone())
    }

    /// Resolves once the published step equals `target`.
    pub async fn wait_for(&mut self, target: Step) -> Result<Step, InputsClosed> {
        self.steps
            .wait_for(|step| *step == target)
            .await
            .map(|step| *step)
            .map_err(|_| InputsClosed)
    }
}

impl Drop for StepWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/step_controller_tests.rs"]
mod tests;
