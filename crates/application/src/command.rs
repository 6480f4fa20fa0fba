//! Command handling contract.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use domain::Failure;

/// Outcome of a command: either the output, a cancellation, or a failure.
pub type CommandResult<T> = Result<T, CommandError>;

/// Why a command did not produce its output.
///
/// Cancellation is not a business failure and never masquerades as one:
/// a cancelled command produced no result at all, while a failed command
/// carries the reasons it was rejected.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The cancellation signal fired before the command completed. Nothing
    /// was committed after the signal was observed.
    #[error("the command was cancelled")]
    Cancelled,

    /// The business operation failed; see the carried reasons.
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl CommandError {
    /// Returns the failure, if this is a business failure.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CommandError::Cancelled => None,
            CommandError::Failed(failure) => Some(failure),
        }
    }
}

/// A command handler: the entry point of one business operation.
///
/// Options arrive immutable and structurally valid (required-field checks
/// are the caller's job); domain rules are still enforced inside. The
/// handler observes the cancellation token at each suspension point and
/// stops promptly when it fires, discarding staged-but-uncommitted work.
/// Handlers never retry; the transient-fault policy lives in the store.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The validated input for this command.
    type Options: Send + Sync;

    /// The output carried on success.
    type Output: Send;

    /// Executes the command.
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<Self::Output>;
}

/// Fails fast with [`CommandError::Cancelled`] once the token has fired.
/// Called at each suspension point of a handler.
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), CommandError> {
    if cancel.is_cancelled() {
        Err(CommandError::Cancelled)
    } else {
        Ok(())
    }
}
