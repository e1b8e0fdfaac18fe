//! Failure classification
//!
//! The policy never inspects failures directly. It asks them to classify
//! themselves as either carrying a status code or not, and then decides
//! retryability against the configured status set.

use std::sync::Arc;

/// Shape of a failure as seen by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No response/status was associated with the failure.
    NoStatus,
    /// The failure carries an HTTP-like status code.
    Status(u16),
}

impl FailureClass {
    pub const fn status(self) -> Option<u16> {
        match self {
            Self::NoStatus => None,
            Self::Status(code) => Some(code),
        }
    }
}

impl From<Option<u16>> for FailureClass {
    fn from(status: Option<u16>) -> Self {
        status.map_or(Self::NoStatus, Self::Status)
    }
}

/// Classifies a failure for retry decisions.
pub trait Classify {
    fn classify(&self) -> FailureClass;
}

impl<T: Classify + ?Sized> Classify for &T {
    fn classify(&self) -> FailureClass {
        (**self).classify()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn classify(&self) -> FailureClass {
        (**self).classify()
    }
}

impl<T: Classify + ?Sized> Classify for Arc<T> {
    fn classify(&self) -> FailureClass {
        (**self).classify()
    }
}

impl Classify for FailureClass {
    fn classify(&self) -> FailureClass {
        *self
    }
}

impl Classify for reqwest::Error {
    fn classify(&self) -> FailureClass {
        FailureClass::from(self.status().map(|s| s.as_u16()))
    }
}

impl Classify for reqwest::StatusCode {
    fn classify(&self) -> FailureClass {
        FailureClass::Status(self.as_u16())
    }
}

impl Classify for std::io::Error {
    fn classify(&self) -> FailureClass {
        FailureClass::NoStatus
    }
}
