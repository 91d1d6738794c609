use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::countdown::CountdownState;
use crate::engine::command::RequestToken;
use crate::SessionId;

/// This enum contains all error messages this library can return. Most API functions will generally return a [`Result<(), ProoflineError>`].
///
/// [`Result<(), ProoflineError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum ProoflineError {
    /// A countdown operation was attempted from a state that does not permit it,
    /// e.g. pausing a countdown that was never started.
    InvalidTransition {
        /// The state the countdown was in when the operation was attempted.
        from: CountdownState,
        /// The operation that was attempted.
        action: &'static str,
    },
    /// The countdown has already expired. Expired countdowns are terminal and can
    /// never be started again; the game they belonged to is over.
    AlreadyOver,
    /// An index was outside the valid range of the timeline or the session registry.
    OutOfRange {
        /// The index that was requested.
        index: usize,
        /// The number of valid entries.
        len: usize,
    },
    /// A theorem was submitted while the range selection had fewer than two endpoints.
    IncompleteSelection,
    /// The proof engine id for a session may be recorded exactly once. A second
    /// assignment indicates a caller sequencing bug.
    AlreadyAssigned {
        /// The id the session already carries.
        existing: SessionId,
        /// The id the caller tried to assign on top of it.
        attempted: SessionId,
    },
    /// The proof engine answered with a non-success status.
    RemoteFailure {
        /// The operation that failed, e.g. `APPLYRULE`.
        operation: &'static str,
        /// The failure description reported by the engine.
        message: String,
    },
    /// The session already has a request outstanding. At most one engine request may
    /// be in flight per session; issue the next one after the reply has been polled.
    RequestInFlight {
        /// The token of the outstanding request.
        token: RequestToken,
    },
    /// The operation needs a current session, but the registry is empty.
    NoActiveSession,
    /// The operation needs a server-confirmed session, but the session has not yet
    /// received its id from the proof engine.
    SessionPending,
    /// No session with the given proof engine id exists in the registry.
    UnknownSession {
        /// The id that could not be found.
        id: SessionId,
    },
    /// You made an invalid request, usually by using wrong parameters for function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        info: String,
    },
}

impl Display for ProoflineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProoflineError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} a countdown in state {}", action, from)
            }
            ProoflineError::AlreadyOver => {
                write!(f, "The countdown has already expired and cannot be started.")
            }
            ProoflineError::OutOfRange { index, len } => {
                write!(f, "Index {} is out of range: valid range is 0..{}", index, len)
            }
            ProoflineError::IncompleteSelection => {
                write!(
                    f,
                    "The theorem selection is incomplete: both endpoints must be set."
                )
            }
            ProoflineError::AlreadyAssigned {
                existing,
                attempted,
            } => {
                write!(
                    f,
                    "Session already carries engine id {}, refusing to overwrite with {}",
                    existing, attempted
                )
            }
            ProoflineError::RemoteFailure { operation, message } => {
                write!(f, "The proof engine rejected {}: {}", operation, message)
            }
            ProoflineError::RequestInFlight { token } => {
                write!(
                    f,
                    "Request {} is still in flight for this session, poll for its reply first",
                    token
                )
            }
            ProoflineError::NoActiveSession => {
                write!(f, "No session is currently active.")
            }
            ProoflineError::SessionPending => {
                write!(
                    f,
                    "The session has not been confirmed by the proof engine yet."
                )
            }
            ProoflineError::UnknownSession { id } => {
                write!(f, "No session with engine id {} exists", id)
            }
            ProoflineError::InvalidRequest { info } => {
                write!(f, "Invalid Request: {}", info)
            }
        }
    }
}

impl Error for ProoflineError {}
