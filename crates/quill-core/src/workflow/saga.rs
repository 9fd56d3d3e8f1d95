//! Step runner with compensating actions.
//!
//! A [`Saga`] walks through the steps of one workflow. Every step that
//! completes may register a compensation; if a later step fails, the
//! registered compensations run newest first before the error is returned
//! to the caller. Completing the saga discards them.

use std::fmt::{Debug, Display};
use std::future::Future;

use futures::future::BoxFuture;

pub struct Saga<'a, S> {
    workflow: &'static str,
    current: S,
    history: Vec<S>,
    compensations: Vec<(S, BoxFuture<'a, ()>)>,
}

impl<'a, S> Saga<'a, S>
where
    S: Copy + Debug + PartialEq,
{
    /// Start a workflow in its initial step.
    pub fn begin(workflow: &'static str, initial: S) -> Self {
        tracing::debug!(workflow, step = ?initial, "Workflow started");
        Self {
            workflow,
            current: initial,
            history: vec![initial],
            compensations: Vec::new(),
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    /// Steps entered so far, in order.
    pub fn history(&self) -> &[S] {
        &self.history
    }

    /// Move to the next step.
    pub fn advance(&mut self, step: S) {
        tracing::debug!(workflow = self.workflow, from = ?self.current, to = ?step, "Workflow step");
        self.current = step;
        self.history.push(step);
    }

    /// Register the action that undoes the current step.
    ///
    /// The future is not polled unless the saga is rolled back.
    pub fn compensate_with<F>(&mut self, compensation: F)
    where
        F: Future<Output = ()> + Send + 'a,
    {
        self.compensations.push((self.current, Box::pin(compensation)));
    }

    /// Enter `step`, await its work and roll back on failure.
    pub async fn run<T, E, F>(&mut self, step: S, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.advance(step);
        match work.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.rollback(&err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Undo every completed step, newest first.
    pub async fn rollback(&mut self, cause: &str) {
        tracing::warn!(
            workflow = self.workflow,
            step = ?self.current,
            error = cause,
            pending = self.compensations.len(),
            "Workflow aborted, compensating"
        );

        while let Some((step, compensation)) = self.compensations.pop() {
            tracing::debug!(workflow = self.workflow, step = ?step, "Compensating step");
            compensation.await;
        }
    }

    /// Finish the workflow; pending compensations are dropped unpolled.
    pub fn complete(mut self, done: S) -> Vec<S> {
        self.advance(done);
        self.compensations.clear();
        tracing::debug!(workflow = self.workflow, "Workflow completed");
        self.history
    }
}
