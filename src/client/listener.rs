//! The driving loop around a [`PullSession`].
//!
//! A [`Listener`] pairs a session with a [`Transport`] and runs the poll
//! cycle, either one step at a time ([`Listener::step`]) or in a background
//! task feeding a [`FrameStream`] ([`Listener::listen`]).
//!
//! # Lifecycle
//!
//! 1. Created with [`Listener::new`]
//! 2. Polls forever, sleeping whatever the session asks for between polls
//! 3. Ends on the first protocol violation, which is delivered as the last
//!    item of the stream, or when the stream is dropped
//!
//! # Examples
//!
//! ```ignore
//! use pull_channel_http::client::{ClientConfig, Listener, PullSession, ReqwestTransport};
//! use futures::StreamExt;
//!
//! let config = ClientConfig::default();
//! let transport = ReqwestTransport::new(&config)?.with_auth(auth);
//! let mut frames = Listener::new(PullSession::with_config(config), transport).listen();
//!
//! while let Some(frame) = frames.next().await {
//!     println!("{:?}", frame?);
//! }
//! ```

use crate::client::session::PullSession;
use crate::client::transport::Transport;
use crate::error::Result;
use crate::types::{Frame, PullOutcome};
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::wrappers::ReceiverStream;

/// Shared handle to a session driven by a [`Listener`].
///
/// Each state transition takes the lock once, so readers never observe a
/// half-applied response.
pub type SharedSession = Arc<Mutex<PullSession>>;

/// Runs the poll cycle of one session over one transport.
pub struct Listener<T> {
    session: SharedSession,
    transport: T,
}

impl<T: Transport + 'static> Listener<T> {
    /// Create a listener
    pub fn new(session: PullSession, transport: T) -> Self {
        Listener {
            session: Arc::new(Mutex::new(session)),
            transport,
        }
    }

    /// Handle to the session, for inspecting sequence and routing state.
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Run one poll cycle.
    ///
    /// Sleeps if a delay is due, sends one request and handles the result.
    pub async fn step(&mut self) -> Result<PullOutcome> {
        let delay = self.session.lock().delay_before_next_poll();
        if let Some(delay) = delay {
            if self.session.lock().config().enable_logging {
                tracing::warn!("Sleeping for {:?} before the next pull", delay);
            }
            sleep(delay).await;
        }

        let request = self.session.lock().next_request();
        let result = self.transport.send(&request).await;
        let outcome = self.session.lock().handle(result)?;
        tracing::trace!(
            frames = outcome.frames().len(),
            backoff = outcome.is_backoff(),
            "Pull cycle done"
        );
        Ok(outcome)
    }

    /// Poll in a background task, streaming frames as they arrive.
    pub fn listen(mut self) -> FrameStream {
        let capacity = self.session.lock().config().channel_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        tokio::spawn(async move {
            loop {
                match self.step().await {
                    Ok(outcome) => {
                        for frame in outcome.into_frames() {
                            if tx.send(Ok(frame)).await.is_err() {
                                return; // Receiver dropped
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Pull protocol violation, stopping");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
                if tx.is_closed() {
                    return;
                }
            }
        });

        FrameStream::new(rx)
    }
}

/// Frames produced by a background [`Listener`].
///
/// Yields `Err` at most once, as the final item.
pub struct FrameStream {
    receiver: ReceiverStream<Result<Frame>>,
}

impl FrameStream {
    /// Create a frame stream from a receiver channel.
    pub fn new(receiver: mpsc::Receiver<Result<Frame>>) -> Self {
        FrameStream {
            receiver: ReceiverStream::new(receiver),
        }
    }

    /// Stop the background listener after its current step.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Stream for FrameStream {
    type Item = Result<Frame>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::client::sequence::SequenceTracker;
    use crate::error::PullError;
    use crate::types::{HttpResponse, PullRequest, TransportFailure};
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::json;
    use std::collections::VecDeque;

    type Scripted = std::result::Result<HttpResponse, TransportFailure>;

    /// Replays canned results and records every request it saw.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        seen: Mutex<Vec<PullRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
            Arc::new(ScriptedTransport {
                script: Mutex::new(script.into_iter().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &PullRequest) -> Scripted {
            self.seen.lock().push(request.clone());
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, r#"for(;;);{"t":"bogus"}"#)))
        }
    }

    fn session() -> PullSession {
        PullSession::with_tracker(ClientConfig::default(), SequenceTracker::with_client_id("c"))
    }

    fn ok(body: &'static str) -> Scripted {
        Ok(HttpResponse::new(200, body))
    }

    #[tokio::test]
    async fn test_step_echoes_state() {
        let transport = ScriptedTransport::new([
            ok(r#"for(;;);{"t":"lb","seq":2,"lb_info":{"sticky":"s1","pool":"p1"}}"#),
            Err(TransportFailure::ReadTimeout),
            ok(r#"for(;;);{"t":"msg","s":3,"ms":["a"]}"#),
        ]);
        let mut listener = Listener::new(session(), Arc::clone(&transport));

        assert_eq!(listener.step().await.unwrap(), PullOutcome::Frames(vec![]));
        assert_eq!(listener.step().await.unwrap(), PullOutcome::Frames(vec![]));
        assert_eq!(
            listener.step().await.unwrap(),
            PullOutcome::Frames(vec![json!("a")])
        );

        let seen = transport.seen.lock();
        assert_eq!(seen[0].param("seq"), Some("0"));
        assert_eq!(seen[0].param("sticky_token"), Some(""));
        assert_eq!(seen[1].param("seq"), Some("2"));
        assert_eq!(seen[1].param("sticky_token"), Some("s1"));
        assert_eq!(seen[2].param("sticky_pool"), Some("p1"));
        assert_eq!(listener.session().lock().tracker().sequence(), 3);
    }

    #[tokio::test]
    async fn test_listen_streams_until_violation() {
        let transport = ScriptedTransport::new([
            ok(r#"for(;;);{"t":"msg","ms":[1,2]}"#),
            ok(r#"for(;;);{"t":"heartbeat"}"#),
            ok(r#"for(;;);{"t":"batched","batches":[{"t":"msg","ms":[3]},{"t":"fullReload","ms":[4]}]}"#),
        ]);
        let stream = Listener::new(session(), transport).listen();
        let items: Vec<Result<Frame>> = stream.collect().await;

        assert_eq!(items.len(), 5);
        let frames: Vec<Frame> = items[..4]
            .iter()
            .map(|item| item.as_ref().unwrap().clone())
            .collect();
        assert_eq!(frames, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert!(matches!(
            items[4],
            Err(PullError::UnknownMessage { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_listener() {
        let transport = ScriptedTransport::new(
            std::iter::repeat_with(|| ok(r#"for(;;);{"t":"msg","ms":[1]}"#)).take(1000),
        );
        let mut stream = Listener::new(session(), Arc::clone(&transport)).listen();
        assert_eq!(stream.next().await.unwrap().unwrap(), json!(1));
        stream.close();
        drop(stream);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let polled = transport.seen.lock().len();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(transport.seen.lock().len(), polled);
        assert!(polled < 1000);
    }
}
