//! The identity of the caller of an MFD operation and the context in
//! which it makes the call.
//!
//! Every operation is performed on behalf of some run.  The MFD uses
//! the identity to decide whether a file is assigned to the caller,
//! to release everything a run holds when it terminates, and in log
//! messages.  The context also carries an optional deadline; an
//! operation which finds that its deadline has passed before it has
//! changed anything fails with [`MfdErrorKind::Aborted`].
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::error::{MfdError, MfdErrorKind, MfdResult};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientIdentifier {
    pub host_id: u64,
    pub run_id: String,
    pub user_id: String,
}

impl ClientIdentifier {
    pub fn new<R: Into<String>, U: Into<String>>(
        host_id: u64,
        run_id: R,
        user_id: U,
    ) -> ClientIdentifier {
        ClientIdentifier {
            host_id,
            run_id: run_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl Display for ClientIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}/{}@{}", self.run_id, self.user_id, self.host_id)
    }
}

#[derive(Debug, Clone)]
pub struct ClientContext {
    pub identifier: ClientIdentifier,
    pub deadline: Option<Instant>,
}

impl ClientContext {
    #[must_use]
    pub fn new(identifier: ClientIdentifier) -> ClientContext {
        ClientContext {
            identifier,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(self, deadline: Instant) -> ClientContext {
        ClientContext {
            deadline: Some(deadline),
            ..self
        }
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> ClientContext {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    pub(crate) fn check_deadline(&self, operation: &str) -> MfdResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MfdError::new(
                MfdErrorKind::Aborted,
                format!("{operation} for {} passed its deadline", self.identifier),
            )),
            _ => Ok(()),
        }
    }
}
