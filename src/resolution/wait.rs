use crate::browser::Session;
use crate::errors::{PomError, Result};
use crate::model::{AsNode, ModelNode};
use crate::types::Visibility;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

impl Session {
    /// Poll until `node` is visible. Returns the visibility that satisfied
    /// the wait, or [`PomError::Timeout`] carrying the last one observed.
    pub fn wait_for_visible<N: AsNode + ?Sized>(&self, node: &N, timeout: Duration) -> Result<Visibility> {
        self.wait_for(node.node(), true, timeout)
    }

    pub fn wait_for_not_visible<N: AsNode + ?Sized>(
        &self,
        node: &N,
        timeout: Duration,
    ) -> Result<Visibility> {
        self.wait_for(node.node(), false, timeout)
    }

    fn wait_for(&self, node: &Arc<ModelNode>, visible: bool, timeout: Duration) -> Result<Visibility> {
        let state = if visible { "visible" } else { "not visible" };
        let poll_interval = self.config().poll_interval();
        let deadline = Instant::now() + timeout;
        let mut polls = 0u32;

        loop {
            // Every poll re-walks the whole chain.
            let visibility = self.visibility(node)?;
            polls += 1;
            if visibility.visible == visible {
                tracing::debug!(node = %node, state, polls, "Wait satisfied");
                return Ok(visibility);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(node = %node, state, polls, "Wait timed out");
                return Err(PomError::Timeout {
                    chain: node.label_chain(),
                    state,
                    timeout_ms: timeout.as_millis() as u64,
                    last: visibility,
                });
            }
            tracing::trace!(node = %node, reason = %visibility, "Waiting for {}", state);
            thread::sleep(poll_interval.min(deadline - now));
        }
    }
}
