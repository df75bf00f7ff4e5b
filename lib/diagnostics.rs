//! Error sink for a packaging run.
//!
//! Components that must keep going after a failure report into [`Diagnostics`]
//! instead of returning early. A run succeeded when nothing was reported.

use crate::error::{ErrorKind, PackError};
use std::error::Error as _;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Collects and logs the errors of one run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<PackError>,
}

/// Final result of a task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// True when no error was reported.
    pub success: bool,

    /// Every reported error, in report order.
    pub errors: Vec<PackError>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Diagnostics {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record an error.
    pub fn report(&mut self, error: PackError) {
        for line in log_lines(&error) {
            tracing::error!("{}", line);
        }
        self.errors.push(error);
    }

    /// Record the error of `result`, if any, and pass the value through.
    pub fn check<T>(&mut self, result: Result<T, PackError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// Whether anything was reported.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Reported errors.
    pub fn errors(&self) -> &[PackError] {
        &self.errors
    }

    /// Number of reported errors of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind() == kind).count()
    }

    /// Close the sink.
    pub fn into_outcome(self) -> TaskOutcome {
        TaskOutcome {
            success: self.errors.is_empty(),
            errors: self.errors,
        }
    }
}

impl TaskOutcome {
    /// Number of errors of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind() == kind).count()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Lines to log for an error.
///
/// Validation errors produce one line per message line. Anything else is an
/// unexpected failure and is logged on one line with its full source chain.
pub fn log_lines(error: &PackError) -> Vec<String> {
    if error.is_validation() {
        return error.to_string().lines().map(str::to_string).collect();
    }

    let mut line = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Most variants already format their direct source.
        if !line.contains(&text) {
            line.push_str(": ");
            line.push_str(&text);
        }
        source = cause.source();
    }
    vec![line]
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
