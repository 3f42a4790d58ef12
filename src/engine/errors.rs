use thiserror::Error;

/// Local policy violations. Surfaced to the user, never sent.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("that action is not available in the current phase")]
    WrongPhase,
    #[error("eliminated participants cannot act")]
    NotAlive,
    #[error("your role cannot perform that action")]
    RoleNotPermitted,
    #[error("only the host can do that")]
    NotHost,
    #[error("you already have an action waiting for the server")]
    AlreadyPending,
    #[error("that target is not a living participant you can choose")]
    InvalidTarget,
    #[error("message is empty")]
    EmptyMessage,
}
