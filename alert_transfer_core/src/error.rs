use thiserror::Error;

/// Misuse of the supervisor API. Transfer decisions themselves never fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer supervisor is already bound")]
    AlreadyBound,

    #[error("transfer supervisor used before bind()")]
    NotBound,
}
