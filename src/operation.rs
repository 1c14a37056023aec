//! Classifies a stream of [`StackEvent`]s into a settled outcome.
//!
//! Polling CloudFormation is the cloud port's job: it streams events to an `EventSink` callback
//! (§6). This module is the pure, port-agnostic classifier fed one event at a time, so the same
//! sentiment-accumulation logic can be shared by the Deployer and the Deleter.

use std::fmt;

use crate::{model::StackEvent, status::Status, status_reason::StatusReason};

/// A failed stack operation: the terminal status plus any negative-sentiment resource events
/// that likely precipitated it.
#[derive(Debug)]
pub struct StackFailure {
    pub stack_name: String,
    pub stack_status_reason: String,
    pub resource_events: Vec<StackEvent>,
}

impl StackFailure {
    /// The stack-level status reason, with structured detail parsed out where recognised.
    #[must_use]
    pub fn stack_status_reason(&self) -> StatusReason<'_> {
        StatusReason::new(Some(&self.stack_status_reason))
    }
}

impl fmt::Display for StackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stack operation failed for {}: {}",
            self.stack_name, self.stack_status_reason
        )?;
        if !self.resource_events.is_empty() {
            writeln!(f, "\nThe following resources had errors:")?;
        }
        for event in &self.resource_events {
            write!(
                f,
                "\n- {} ({}): {} ({})",
                event.logical_resource_id,
                event.resource_type,
                event.resource_status,
                event.resource_status_reason.as_deref().unwrap_or("no reason reported"),
            )?;
        }
        Ok(())
    }
}

/// A successful stack operation that nonetheless saw resource-level errors along the way (for
/// example, a resource that failed to delete during post-update cleanup).
#[derive(Debug)]
pub struct StackWarning {
    pub stack_name: String,
    pub resource_events: Vec<StackEvent>,
}

impl fmt::Display for StackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Stack {} settled successfully but some resources had errors:",
            self.stack_name
        )?;
        for event in &self.resource_events {
            write!(
                f,
                "\n- {} ({}): {} ({})",
                event.logical_resource_id,
                event.resource_type,
                event.resource_status,
                event.resource_status_reason.as_deref().unwrap_or("no reason reported"),
            )?;
        }
        Ok(())
    }
}

pub enum OperationOutcome {
    Ok,
    Warning(StackWarning),
    Failure(StackFailure),
}

/// Accumulates a single stack operation's events, classifying each by sentiment, and settles on
/// success/warning/failure once the stack-level event reports a negative or positive terminal
/// status.
#[derive(Default)]
pub struct OperationTracker {
    stack_error_reason: Option<String>,
    resource_error_events: Vec<StackEvent>,
}

impl OperationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one streamed event into the tracker.
    pub fn observe(&mut self, event: &StackEvent) {
        let sentiment = event.resource_status.sentiment();

        if event.is_stack_level() {
            if sentiment.is_negative() && self.stack_error_reason.is_none() {
                self.stack_error_reason = event
                    .resource_status_reason
                    .clone()
                    .or_else(|| Some(event.resource_status.to_string()));
            }
        } else if sentiment.is_negative() {
            self.resource_error_events.push(event.clone());
        }
    }

    /// Settles the tracker into a final outcome once the operation's terminal event has been
    /// observed.
    #[must_use]
    pub fn finish(self, stack_name: &str) -> OperationOutcome {
        if let Some(reason) = self.stack_error_reason {
            return OperationOutcome::Failure(StackFailure {
                stack_name: stack_name.to_string(),
                stack_status_reason: reason,
                resource_events: self.resource_error_events,
            });
        }

        if self.resource_error_events.is_empty() {
            OperationOutcome::Ok
        } else {
            OperationOutcome::Warning(StackWarning {
                stack_name: stack_name.to_string(),
                resource_events: self.resource_error_events,
            })
        }
    }
}

/// `is_settled` purely forwards to the status domain; re-exported at this level since drivers
/// only ever need to ask it of the stack-level event in a stream.
#[must_use]
pub fn is_terminal(event: &StackEvent) -> bool {
    event.is_stack_level() && event.resource_status.is_settled()
}
