//! Ctrl-C handling: the first signal drains, the second aborts.

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status used when a second interrupt aborts the run.
pub(crate) const ABORT_EXIT_CODE: i32 = 130;

/// Waits on `next_signal` until the run must be abandoned.
///
/// The first signal cancels `cancel` so workers stop between assets. Returns
/// `true` on the second signal, `false` if signals can no longer be received.
pub(crate) async fn watch_interrupts<F, Fut>(
    mut next_signal: F,
    cancel: CancellationToken,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    warn!("Interrupted; finishing in-flight downloads (press Ctrl-C again to abort)");
    cancel.cancel();

    if next_signal().await.is_err() {
        return false;
    }
    warn!("Second interrupt; aborting");
    true
}
