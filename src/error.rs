//! The error type shared by all protocol layers.

use crate::channel;

/// An error raised while running one of the protocols.
///
/// Every error is fatal to the current session: a cryptographic misalignment
/// invalidates all subsequent wires, so callers are expected to tear down
/// their channels instead of retrying.
#[derive(Debug)]
pub enum Error {
    /// A parameter or buffer was not a positive multiple of 8 bits, or its
    /// length disagreed with the configured message length.
    InvalidSize(usize),
    /// The two parties disagree about the protocol state, e.g. an unexpected
    /// selector value or a label that matches neither wire key.
    ProtocolMismatch(String),
    /// Two wire vectors that must have equal arity do not.
    WireMismatch(usize, usize),
    /// A multiplication triple was requested but none remain.
    ExhaustedPool,
    /// The operating system CSPRNG failed to produce the requested bytes.
    RandomnessFailure,
    /// A message could not be sent, received or (de-)serialized.
    Channel(channel::Error),
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Self::Channel(e)
    }
}
