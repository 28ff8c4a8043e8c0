//! Delivery acknowledgements
//!
//! An ack-aware target answers every message with a [`DeliveryReceipt`].
//! Targets that confirm synchronously return [`DeliveryReceipt::Immediate`];
//! the others hand out a pending [`AckHandle`] and fulfil it later through
//! the [`Acknowledger`] obtained from [`promise`].
//!
//! Receipts of a fan-out are combined with a counting barrier: the combined
//! handle resolves once every member has resolved and reports how many of
//! them failed. A member that never resolves keeps the combined handle
//! pending; owners that cannot wait forever use [`AckHandle::wait_timeout`].

use crate::error::{AckError, AckResult, Result};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// Future resolving when a delivery has been confirmed
pub struct AckHandle {
    inner: BoxFuture<'static, AckResult<()>>,
}

impl AckHandle {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = AckResult<()>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// Already confirmed
    pub fn ready() -> Self {
        Self::new(future::ready(Ok(())))
    }

    /// Already failed
    pub fn failed(err: AckError) -> Self {
        Self::new(future::ready(Err(err)))
    }

    /// Resolve once every handle has resolved
    ///
    /// Fails with [`AckError::Incomplete`] when at least one member failed.
    /// Members are awaited concurrently; none is cancelled early.
    pub fn all(handles: Vec<AckHandle>) -> Self {
        let total = handles.len();
        Self::barrier(handles, total)
    }

    fn barrier(handles: Vec<AckHandle>, total: usize) -> Self {
        Self::new(async move {
            let failed = future::join_all(handles)
                .await
                .into_iter()
                .filter(|result| result.is_err())
                .count();
            if failed == 0 {
                Ok(())
            } else {
                Err(AckError::Incomplete { failed, total })
            }
        })
    }

    /// Wait for the confirmation, giving up after `timeout`
    pub async fn wait_timeout(self, timeout: Duration) -> AckResult<()> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => Err(AckError::TimedOut {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

impl Future for AckHandle {
    type Output = AckResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle").finish_non_exhaustive()
    }
}

/// What a target returns after accepting a message
#[derive(Debug)]
pub enum DeliveryReceipt {
    /// Nothing left to confirm
    Immediate,
    /// Delivery is confirmed once the handle resolves
    Pending(AckHandle),
}

impl DeliveryReceipt {
    pub fn is_immediate(&self) -> bool {
        matches!(self, DeliveryReceipt::Immediate)
    }

    pub fn into_handle(self) -> AckHandle {
        match self {
            DeliveryReceipt::Immediate => AckHandle::ready(),
            DeliveryReceipt::Pending(handle) => handle,
        }
    }

    /// Wait until the delivery is confirmed
    pub async fn delivered(self) -> AckResult<()> {
        self.into_handle().await
    }

    /// Combine receipts into one
    ///
    /// Immediate members count as confirmed. The result stays immediate when
    /// no member is pending.
    pub fn all(receipts: Vec<DeliveryReceipt>) -> DeliveryReceipt {
        let total = receipts.len();
        let pending: Vec<AckHandle> = receipts
            .into_iter()
            .filter_map(|receipt| match receipt {
                DeliveryReceipt::Immediate => None,
                DeliveryReceipt::Pending(handle) => Some(handle),
            })
            .collect();

        if pending.is_empty() {
            DeliveryReceipt::Immediate
        } else {
            DeliveryReceipt::Pending(AckHandle::barrier(pending, total))
        }
    }
}

impl From<AckHandle> for DeliveryReceipt {
    fn from(handle: AckHandle) -> Self {
        DeliveryReceipt::Pending(handle)
    }
}

/// Fulfils the receipt handed out by [`promise`]
///
/// Dropping it unfulfilled fails the receipt with [`AckError::Dropped`].
#[derive(Debug)]
pub struct Acknowledger {
    tx: oneshot::Sender<AckResult<()>>,
}

impl Acknowledger {
    /// Confirm the delivery
    pub fn ack(self) {
        let _ = self.tx.send(Ok(()));
    }

    /// Report a failed delivery
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(AckError::Failed {
            reason: reason.into(),
        }));
    }
}

/// A pending receipt and the handle that fulfils it
pub fn promise() -> (Acknowledger, DeliveryReceipt) {
    let (tx, rx) = oneshot::channel();
    let handle = AckHandle::new(async move { rx.await.unwrap_or(Err(AckError::Dropped)) });
    (Acknowledger { tx }, DeliveryReceipt::Pending(handle))
}

/// Results that can be merged after a fan-out
pub trait Fanout: Send + Sized + 'static {
    fn join(parts: Vec<Self>) -> Self;
}

impl Fanout for () {
    fn join(_parts: Vec<()>) {}
}

impl Fanout for DeliveryReceipt {
    fn join(parts: Vec<Self>) -> Self {
        DeliveryReceipt::all(parts)
    }
}

/// Merge the results of concurrently invoked continuations
///
/// Every result is inspected before deciding: failures are logged and the
/// first one is returned, otherwise the produced values are joined. No result
/// at all stays `None`.
pub(crate) fn gather<R: Fanout>(stage: &str, results: Vec<Result<Option<R>>>) -> Result<Option<R>> {
    let mut first_error = None;
    let mut parts = Vec::with_capacity(results.len());

    for result in results {
        match result {
            Ok(Some(part)) => parts.push(part),
            Ok(None) => {}
            Err(e) => {
                warn!(stage = %stage, error = %e, "fan-out member failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(R::join(parts)))
    }
}
