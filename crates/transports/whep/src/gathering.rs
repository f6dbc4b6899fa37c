//! ICE gathering coordinator
//!
//! Suspends until a connection's gathering state reaches `Complete`. Only
//! full (non-trickle) offers are sent, so the signaling request must wait
//! for this.
//!
//! There is no timeout. A network that never finishes gathering stalls the
//! attempt indefinitely; when a stall interval is given, a warning is logged
//! every time it elapses so the condition is visible in the logs.

use crate::peer::PeerConnection;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Wait until ICE gathering is complete
///
/// Resolves immediately if gathering already finished. Otherwise registers a
/// single observer and drops it on every exit path, including cancellation
/// of the returned future.
///
/// # Errors
///
/// Returns [`Error::Environment`] if the connection stops publishing gathering
/// state (it was dropped) before completion.
pub async fn await_gathering_complete(
    connection: &dyn PeerConnection,
    stall_warning: Option<Duration>,
) -> Result<()> {
    if connection.gathering_state().is_complete() {
        debug!("ICE gathering already complete");
        return Ok(());
    }

    let mut observer = connection.watch_gathering();
    let started = Instant::now();

    loop {
        if observer.borrow_and_update().is_complete() {
            debug!("ICE gathering complete after {:?}", started.elapsed());
            return Ok(());
        }

        let changed = match stall_warning {
            Some(period) => match tokio::time::timeout(period, observer.changed()).await {
                Ok(changed) => changed,
                Err(_) => {
                    warn!(
                        state = ?*observer.borrow(),
                        elapsed_secs = started.elapsed().as_secs(),
                        "ICE gathering still pending; negotiation is waiting without a timeout"
                    );
                    continue;
                }
            },
            None => observer.changed().await,
        };

        changed.map_err(|_| {
            Error::Environment("Peer connection dropped during ICE gathering".to_string())
        })?;
    }
}
