use thiserror::Error;

/// Recoverable failure from an `nk` operation.
///
/// Protocol violations (blocking in a DPC, receiving on a DPC port,
/// destroying a non-empty port, unlocking an unlocked mutex) are not part of
/// this enum — they are programmer errors and abort via `panic!`/`assert!`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The object is in a state that forbids the requested operation (e.g.
    /// `port_set_dpc` on a fiber-mode port, or after the first send).
    #[error("invalid state for this operation")]
    InvalidState,
    /// A parameter was out of range or otherwise clearly invalid.
    #[error("invalid parameter")]
    InvalidParam,
    /// A bounded resource (freelist, stack mapping) could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
    /// The field or combination was accepted but is not yet actionable.
    #[error("not implemented")]
    NotImplemented,
    /// A message was sent to a DPC-mode port with no handler installed.
    #[error("no receiver for message")]
    NoReceiver,
}

pub type Result<T> = std::result::Result<T, Error>;
