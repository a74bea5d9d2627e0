//! Write-once cells for eventual work outcomes.
//!
//! A [`Promise`] is the single writer of an outcome, an [`Eventual`] any number
//! of readers. Readers may start waiting before or after the outcome is
//! written. Dropping a promise without completing it resolves every reader
//! with [`SearchIndexError::Abandoned`], so no reader ever waits forever.
//!
//! A [`CompletionHandle`] is the caller-facing end: it does not know yet which
//! step will produce its outcome. Its [`CompletionLink`] is later pointed at
//! that step's `Eventual` and the outcome is copied through verbatim.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use search_indexer_repository::SearchIndexError;

/// Result of a work, or the failure that prevented it.
pub type Outcome<T> = Result<T, SearchIndexError>;

/// Create a connected promise/eventual pair.
pub fn deferred<T>() -> (Promise<T>, Eventual<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (sender, receiver) = oneshot::channel();
    (Promise { sender }, Eventual::from_receiver(receiver))
}

/// The writing end of a deferred outcome. Completing consumes it.
pub struct Promise<T> {
    sender: oneshot::Sender<Outcome<T>>,
}

impl<T> Promise<T> {
    pub fn complete(self, outcome: Outcome<T>) {
        // Nobody listening is fine: the outcome is simply not observed.
        let _ = self.sender.send(outcome);
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, error: SearchIndexError) {
        self.complete(Err(error));
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("abandoned", &self.sender.is_closed())
            .finish()
    }
}

/// The reading end of a deferred outcome. Cheap to clone.
pub struct Eventual<T> {
    inner: Shared<BoxFuture<'static, Outcome<T>>>,
}

impl<T> Eventual<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_receiver(receiver: oneshot::Receiver<Outcome<T>>) -> Self {
        let future = async move {
            receiver.await.unwrap_or_else(|_| {
                Err(SearchIndexError::abandoned(
                    "deferred outcome dropped before completion",
                ))
            })
        };
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// An eventual that is already resolved.
    pub fn ready(outcome: Outcome<T>) -> Self {
        Self {
            inner: futures::future::ready(outcome).boxed().shared(),
        }
    }

    /// The outcome, if it has already been observed by some reader.
    pub fn peek(&self) -> Option<&Outcome<T>> {
        self.inner.peek()
    }
}

impl<T> Clone for Eventual<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Future for Eventual<T>
where
    T: Clone,
{
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> fmt::Debug for Eventual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eventual").finish_non_exhaustive()
    }
}

/// Create a caller-facing completion handle and the link that will feed it.
pub fn completion_pair<T>() -> (CompletionLink<T>, CompletionHandle<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (sender, receiver) = oneshot::channel::<Eventual<T>>();
    let inner = async move {
        match receiver.await {
            Ok(source) => source.await,
            Err(_) => Err(SearchIndexError::abandoned(
                "work discarded before it was added to a sequence",
            )),
        }
    };
    (
        CompletionLink { sender },
        CompletionHandle {
            inner: inner.boxed(),
        },
    )
}

/// Connects a completion handle to the step that produces its outcome.
pub struct CompletionLink<T> {
    sender: oneshot::Sender<Eventual<T>>,
}

impl<T> CompletionLink<T> {
    /// Resolve the handle with whatever `source` resolves to.
    pub fn follow(self, source: Eventual<T>) {
        let _ = self.sender.send(source);
    }
}

impl<T> fmt::Debug for CompletionLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionLink").finish_non_exhaustive()
    }
}

/// The eventual outcome of one submitted work, owned by its submitter.
#[must_use = "a completion handle does nothing unless awaited"]
pub struct CompletionHandle<T> {
    inner: BoxFuture<'static, Outcome<T>>,
}

impl<T> Future for CompletionHandle<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readers_registered_before_and_after_completion() {
        let (promise, eventual) = deferred::<u32>();
        let early = eventual.clone();

        let waiter = tokio::spawn(early);
        promise.succeed(7);

        assert_eq!(waiter.await.unwrap().unwrap(), 7);
        assert_eq!(eventual.clone().await.unwrap(), 7);
        assert!(matches!(eventual.peek(), Some(Ok(7))));
    }

    #[tokio::test]
    async fn test_dropped_promise_abandons_readers() {
        let (promise, eventual) = deferred::<u32>();
        drop(promise);

        assert!(matches!(
            eventual.await,
            Err(SearchIndexError::Abandoned(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_is_shared() {
        let (promise, eventual) = deferred::<u32>();
        let other = eventual.clone();
        promise.fail(SearchIndexError::bulk_operation("timeout"));

        assert!(matches!(eventual.await, Err(SearchIndexError::BulkOperationError(_))));
        assert!(matches!(other.await, Err(SearchIndexError::BulkOperationError(_))));
    }

    #[tokio::test]
    async fn test_completion_handle_follows_source() {
        let (link, handle) = completion_pair::<String>();
        let (promise, eventual) = deferred::<String>();

        link.follow(eventual);
        promise.succeed("done".to_string());

        assert_eq!(handle.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_completion_handle_copies_failure_verbatim() {
        let (link, handle) = completion_pair::<String>();
        link.follow(Eventual::ready(Err(SearchIndexError::bulk_item_failed(
            409,
            "version_conflict_engine_exception",
        ))));

        match handle.await {
            Err(SearchIndexError::BulkItemFailed { status, reason }) => {
                assert_eq!(status, 409);
                assert_eq!(reason, "version_conflict_engine_exception");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unlinked_handle_is_abandoned() {
        let (link, handle) = completion_pair::<String>();
        drop(link);

        assert!(matches!(handle.await, Err(SearchIndexError::Abandoned(_))));
    }
}
