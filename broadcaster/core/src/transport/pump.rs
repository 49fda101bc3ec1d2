//! Subscription Pump
//!
//! Drives one subscribe connection: waits for whichever comes first of
//!
//! - the next event in the subscriber's buffer,
//! - the keepalive timer (restarted after every block), or
//! - server shutdown,
//!
//! and turns the result into an SSE [`Frame`]. The pump owns the
//! [`Registration`], so the registry entry goes away on every exit path: a
//! clean end, shutdown, or the HTTP body being dropped when the client
//! disconnects.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::sse::Frame;
use crate::registry::{Registration, SubscriberId};
use crate::subscriber::EventStream;

/// Default idle time before a keepalive block is sent
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Per-connection event pump
pub struct SubscriptionPump {
    stream: EventStream,
    registration: Registration,
    keepalive: Duration,
    shutdown: CancellationToken,
    finished: bool,
}

impl SubscriptionPump {
    /// Create a pump for an already-registered subscriber
    #[must_use]
    pub fn new(
        stream: EventStream,
        registration: Registration,
        keepalive: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        tracing::debug!(
            subscriber_id = %registration.id(),
            keepalive_secs = keepalive.as_secs_f64(),
            "Subscription started"
        );
        Self {
            stream,
            registration,
            keepalive,
            shutdown,
            finished: false,
        }
    }

    /// ID of the underlying registration
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.registration.id()
    }

    /// Whether the pump has stopped producing frames
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next block to send
    ///
    /// Returns `None` once the subscription is over; the registration has been
    /// released by then.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }

        let frame = tokio::select! {
            () = self.shutdown.cancelled() => {
                tracing::debug!(subscriber_id = %self.registration.id(), "Subscription cancelled");
                None
            }
            event = self.stream.recv() => event.map(Frame::Event),
            () = tokio::time::sleep(self.keepalive) => Some(Frame::Keepalive),
        };

        if frame.is_none() {
            self.finish();
        }
        frame
    }

    /// Turn the pump into an HTTP body stream, one chunk per block
    pub fn into_body_stream(
        self,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures::stream::unfold(self, |mut pump| async move {
            let frame = pump.next_frame().await?;
            Some((Ok(frame.encode()), pump))
        })
    }

    fn finish(&mut self) {
        self.finished = true;
        self.stream.close();
        self.registration.release();
        tracing::debug!(subscriber_id = %self.registration.id(), "Subscription finished");
    }
}

impl Drop for SubscriptionPump {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                subscriber_id = %self.registration.id(),
                "Subscription dropped by transport"
            );
        }
    }
}
