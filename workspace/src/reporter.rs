//! Throttled surface for workspace load and restore failures.
//!
//! One counter is shared by both kinds of failure. Below the cap a failure
//! is surfaced and counted; at the cap it is dropped. Blank messages are
//! never surfaced and never counted. The counter lives as long as the
//! reporter.

use std::sync::atomic::{AtomicUsize, Ordering};

use quay_types::NonEmptyString;

use crate::events::{EventSink, ReloadEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Load,
    Restore,
}

#[derive(Debug)]
pub struct ErrorReporter {
    reported: AtomicUsize,
    cap: usize,
    events: EventSink,
}

impl ErrorReporter {
    #[must_use]
    pub fn new(cap: usize, events: EventSink) -> Self {
        Self {
            reported: AtomicUsize::new(0),
            cap,
            events,
        }
    }

    /// Returns whether the message was surfaced.
    pub fn report_load_error(&self, message: &str) -> bool {
        self.report(FailureKind::Load, message)
    }

    /// Returns whether the message was surfaced.
    pub fn report_restore_error(&self, message: &str) -> bool {
        self.report(FailureKind::Restore, message)
    }

    /// Number of failures surfaced so far.
    #[must_use]
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Acquire)
    }

    fn report(&self, kind: FailureKind, message: &str) -> bool {
        let Ok(message) = NonEmptyString::new(message) else {
            return false;
        };

        // Check and increment in one step so concurrent reporters never
        // push the count past the cap.
        let cap = self.cap;
        if self
            .reported
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < cap).then_some(n + 1)
            })
            .is_err()
        {
            tracing::debug!(?kind, %message, "Workspace error suppressed, cap reached");
            return false;
        }

        tracing::warn!(?kind, %message, "Workspace error");
        let event = match kind {
            FailureKind::Load => ReloadEvent::LoadFailed { message },
            FailureKind::Restore => ReloadEvent::RestoreFailed { message },
        };
        self.events.send(event);
        true
    }
}
