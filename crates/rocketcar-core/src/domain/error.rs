//! Error taxonomy shared by every domain error type.
//!
//! Each concrete error (`RegistryError`, `PairingError`, `RelayError`,
//! `ProtocolError`) reports one of these kinds through a `kind()` method.  The
//! relay server uses the kind to decide how loudly to log and whether the
//! sender gets told.  No kind is fatal to the server process.

use std::fmt;

/// Broad category of a per-connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced peer or session does not exist, typically because it has
    /// just disconnected.  Dropped silently.
    NotFound,
    /// Malformed frame, unknown event, or unknown control action.  Dropped and
    /// logged.
    InvalidInput,
    /// A pairing would break the one-to-one invariant.  Reported to the
    /// requester.
    AlreadyPaired,
    /// A session id was registered twice.  Should not happen with
    /// server-assigned connection ids.
    DuplicateRegistration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::InvalidInput => "invalid input",
            Self::AlreadyPaired => "already paired",
            Self::DuplicateRegistration => "duplicate registration",
        };
        f.write_str(s)
    }
}
