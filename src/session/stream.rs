//! Stream session
//!
//! One session per client connection: validate the filename, register a
//! subscriber, relay lines until the client goes away or the server shuts
//! down, then deregister. Teardown runs from `Drop`, so every exit path
//! (cancellation, write failure, the response stream being dropped)
//! releases the subscription.

use std::borrow::Cow;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::context::SessionContext;
use super::state::{SessionPhase, SessionState};
use crate::error::SessionError;
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::tail::LogLine;
use crate::watch::LogFilter;

/// A client's subscription to one log file
pub struct StreamSession {
    context: SessionContext,
    state: SessionState,
    subscriber: Subscriber,
    registry: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// Validate `filename` and subscribe to it
    ///
    /// An invalid name is rejected before any registry state is created.
    /// `cancel` ends the session when the connection closes or the server
    /// shuts down.
    pub fn open(
        registry: Arc<SubscriberRegistry>,
        filter: &LogFilter,
        filename: &str,
        cancel: CancellationToken,
    ) -> Result<Self, SessionError> {
        let mut state = SessionState::new();
        filter.validate(filename)?;

        let subscriber = registry.subscribe(filename);
        state.on_subscribed();

        let context = SessionContext::new(subscriber.id(), filename);
        tracing::debug!(
            session_id = context.session_id,
            file = %context.filename,
            "Stream session opened"
        );

        Ok(Self {
            context,
            state,
            subscriber,
            registry,
            cancel,
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Record the remote peer address for logging
    pub fn set_peer(&mut self, peer_addr: SocketAddr) {
        self.context.peer_addr = Some(peer_addr);
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    /// Wait for the next line or for cancellation
    ///
    /// Returns `None` once the session is torn down.
    pub async fn next_line(&mut self) -> Option<LogLine> {
        if !self.state.start_streaming() {
            return None;
        }

        let received = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            line = self.subscriber.recv() => line,
        };

        match received {
            Some(line) => {
                self.state.on_relayed();
                Some(line)
            }
            None => {
                self.close();
                None
            }
        }
    }

    /// Relay lines to `writer` as SSE frames until the session ends
    ///
    /// Returns the number of lines written. A write error is treated as a
    /// disconnect: the session is torn down and the error returned.
    pub async fn run<W>(mut self, writer: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = self.next_line().await {
            let frame = format!("data: {}\n\n", event_text(&line));
            let written = async {
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await
            }
            .await;

            if let Err(e) = written {
                tracing::debug!(
                    session_id = self.context.session_id,
                    error = %e,
                    "Write failed, closing session"
                );
                self.close();
                return Err(e);
            }
        }
        Ok(self.state.lines_relayed)
    }

    /// Turn the session into a stream of lines
    ///
    /// Dropping the stream tears the session down.
    pub fn into_stream(self) -> impl Stream<Item = LogLine> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let line = session.next_line().await?;
            Some((line, session))
        })
    }

    /// Deregister and move to teardown
    ///
    /// Safe to call more than once; later calls find nothing to remove.
    pub fn close(&mut self) {
        self.registry
            .deregister(&self.context.filename, self.context.session_id);

        if self.state.teardown() {
            tracing::info!(
                session_id = self.context.session_id,
                file = %self.context.filename,
                peer = ?self.context.peer_addr,
                lines = self.state.lines_relayed,
                dropped = self.subscriber.stats().dropped(),
                duration_ms = self.state.duration().as_millis() as u64,
                "Stream session closed"
            );
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Line text safe to put in an SSE `data:` field
///
/// SSE treats `\r` as a line break, so stray carriage returns are removed.
pub fn event_text(line: &LogLine) -> Cow<'_, str> {
    let text = line.to_text();
    if text.contains('\r') {
        Cow::Owned(text.replace('\r', ""))
    } else {
        text
    }
}
