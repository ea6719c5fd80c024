//! Node wrapper: timing, error containment and telemetry for every step
//!
//! Every pipeline step runs through [`run_node`]. The wrapper records a
//! start timestamp, awaits the node, and merges the outcome into a
//! [`StateDelta`] the executor can always apply:
//!
//! - on success, the node's own delta comes back with its timing stamped;
//! - on failure, the exception is swallowed and the returned delta carries
//!   exactly one new [`NodeError`] entry plus the timing.
//!
//! The wrapper never rethrows. A failing node produces a partial state
//! update, and the executor proceeds to the next node as if the node had
//! produced empty output. Structured telemetry (success/failure, duration)
//! is emitted per invocation through `tracing`; emission is fire-and-forget
//! and can never fail the run.

use crate::error::Result;
use crate::state::{NodeError, StateDelta};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, warn};

/// Execute one pipeline node under the standard wrapping
///
/// `node` is the node's future, already bound to the state snapshot it
/// should observe. The returned delta always carries a
/// `node_timings[name]` entry, success or failure.
pub async fn run_node<Fut>(name: &str, node: Fut) -> StateDelta
where
    Fut: Future<Output = Result<StateDelta>>,
{
    let start = Instant::now();
    debug!(node = name, "node started");

    let mut delta = match node.await {
        Ok(delta) => {
            debug!(
                node = name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "node completed"
            );
            delta
        }
        Err(error) => {
            warn!(
                node = name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %error,
                "node failed, error contained"
            );
            StateDelta::new().push_error(NodeError::new(name, error.to_string()))
        }
    };

    delta.node_timing = Some((name.to_string(), start.elapsed().as_millis() as u64));
    delta
}
