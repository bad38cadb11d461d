//! Timers owned by tree nodes: periodic refresh and inbox polling
//!
//! Both loops hold only a weak reference to their node and stop as soon as
//! the node's cancellation token fires or the node is gone.

use crate::node::TreeNode;
use ldshape_core::oxrdf::NamedNode;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Every `interval`: clean the node, then re-resolve its last focus.
/// The next sleep starts only after the previous run completed.
pub(crate) fn spawn_refresh(
    node: Weak<TreeNode>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            let Some(node) = node.upgrade() else {
                break;
            };
            let Some(focus) = node.focus() else {
                debug!(node = %node.address(), "No focus, skipping refresh");
                continue;
            };
            info!(node = %node.address(), "Refreshing");
            node.clean();
            node.set_focus(Some(focus)).await;
        }
        debug!("Refresh loop stopped");
    })
}

/// Poll the inbox once after each delay, measured from spawn time.
pub(crate) fn spawn_inbox(
    node: Weak<TreeNode>,
    inbox: NamedNode,
    delays: [Duration; 2],
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let start = Instant::now();
    tokio::spawn(async move {
        for delay in delays {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(start + delay) => {}
            }
            let Some(node) = node.upgrade() else {
                break;
            };
            node.poll_inbox(&inbox).await;
        }
        debug!(inbox = %inbox, "Inbox polling finished");
    })
}
