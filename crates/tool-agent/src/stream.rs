//! Response Stream
//!
//! Hand-off channel between a run's background task and its consumer. Every
//! send is a rendezvous: the producer resumes only after the consumer has
//! taken the event, so a slow reader stalls the loop. Dropping the stream
//! cancels the run.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::response::Response;

struct Envelope {
    response: Response,
    taken: oneshot::Sender<()>,
}

/// Create a connected sender/stream pair for one run
pub(crate) fn channel(run_id: Uuid, cancel: CancellationToken) -> (EventSender, ResponseStream) {
    let (tx, rx) = mpsc::channel(1);
    let sender = EventSender { tx };
    let stream = ResponseStream {
        rx,
        run_id,
        _cancel_on_drop: cancel.drop_guard(),
    };
    (sender, stream)
}

/// Producer half, owned by the run task
pub(crate) struct EventSender {
    tx: mpsc::Sender<Envelope>,
}

impl EventSender {
    /// Deliver one event and wait until the consumer has taken it.
    ///
    /// Fails with [`AgentError::Cancelled`] once the consumer is gone.
    pub(crate) async fn send(&self, response: Response) -> Result<()> {
        let (taken, was_taken) = oneshot::channel();
        self.tx
            .send(Envelope { response, taken })
            .await
            .map_err(|_| AgentError::Cancelled)?;
        was_taken.await.map_err(|_| AgentError::Cancelled)
    }
}

/// Ordered stream of [`Response`] events for one run.
///
/// Ends after the run finishes, hits its iteration cap, or emits its single
/// `Error` event.
pub struct ResponseStream {
    rx: mpsc::Receiver<Envelope>,
    run_id: Uuid,
    _cancel_on_drop: DropGuard,
}

impl ResponseStream {
    /// Identifier of the run feeding this stream, as seen in logs
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Stream for ResponseStream {
    type Item = Response;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(envelope)) => {
                // producer may already have given up; nothing to do then
                let _ = envelope.taken.send(());
                Poll::Ready(Some(envelope.response))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
