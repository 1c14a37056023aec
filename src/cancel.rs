//! The ambient cancellation token threaded through every port call (§5).

pub use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Checks a token for cancellation, returning a `Resolution` error if it has fired.
///
/// Used at the checkpoints named in §5: before issuing a port call, and between items of a
/// batch operation.
pub(crate) fn check(token: &CancellationToken, stage: &str) -> Result<(), Error> {
    if token.is_cancelled() {
        Err(Error::Resolution(format!("{stage}: cancelled")))
    } else {
        Ok(())
    }
}
