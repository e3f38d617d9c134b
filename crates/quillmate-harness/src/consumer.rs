//! Pull-based consumption of a streamed provider response.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::errors::{AiError, ProviderError};
use crate::listener::{StopReason, StreamListener};
use crate::model::ProviderKind;
use crate::provider::ByteStream;
use crate::stream::{DeltaExtractor, Extracted, LineDecoder};

/// Handle used to cancel a running stream session.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// No read is issued and no delta is applied after the request is
    /// observed; the listener receives `on_stop(Cancelled)`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Result of a session that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSummary {
    pub run_id: uuid::Uuid,
    /// Deltas delivered to the listener.
    pub deltas: u64,
    /// `Completed` or `Truncated`.
    pub reason: StopReason,
}

enum Step {
    Continue,
    Terminal,
}

/// Drives one provider response through line decoding and delta extraction.
pub struct StreamConsumer {
    run_id: uuid::Uuid,
    provider: ProviderKind,
    extractor: DeltaExtractor,
    timeout: Option<Duration>,
    abort_tx: watch::Sender<bool>,
    abort_rx: watch::Receiver<bool>,
}

impl StreamConsumer {
    pub fn new(provider: ProviderKind, extractor: DeltaExtractor) -> Self {
        let (abort_tx, abort_rx) = watch::channel(false);
        Self {
            run_id: uuid::Uuid::new_v4(),
            provider,
            extractor,
            timeout: None,
            abort_tx,
            abort_rx,
        }
    }

    /// Bounds the whole session, request included.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    fn aborted(&self) -> bool {
        *self.abort_rx.borrow()
    }

    /// Runs a session: `on_start`, await `open`, then read the body one chunk
    /// at a time until the terminal token, end of body, failure, cancellation
    /// or timeout. `on_stop` fires exactly once on every path.
    pub async fn drive<F, L>(mut self, open: F, listener: &mut L) -> Result<StreamSummary, AiError>
    where
        F: Future<Output = Result<ByteStream, ProviderError>> + Send,
        L: StreamListener + ?Sized,
    {
        let run_id = self.run_id;
        let provider = self.provider;
        let deadline = self.timeout.map(|t| Instant::now() + t);
        listener.on_start();
        debug!(run_id = %run_id, provider = %provider, "stream session started");

        let timeout = self.timeout.unwrap_or_default();
        let opened = tokio::select! {
            biased;
            _ = wait_for_abort(&mut self.abort_rx) => Err(AiError::Cancelled),
            _ = wait_for_deadline(deadline) => Err(AiError::TimedOut(timeout)),
            opened = open => opened.map_err(AiError::from),
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(err) => return Err(self.fail(listener, err)),
        };

        let mut decoder = LineDecoder::new();
        let mut deltas = 0_u64;
        let mut saw_done = false;
        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_abort(&mut self.abort_rx) => Err(AiError::Cancelled),
                _ = wait_for_deadline(deadline) => Err(AiError::TimedOut(timeout)),
                next = body.next() => Ok(next),
            };
            let next = match next {
                Ok(next) => next,
                Err(err) => return Err(self.fail(listener, err)),
            };
            match next {
                Some(Ok(chunk)) => {
                    for line in decoder.push(&chunk) {
                        if self.aborted() {
                            return Err(self.fail(listener, AiError::Cancelled));
                        }
                        if let Step::Terminal =
                            self.handle_line(&line, listener, &mut deltas, &mut saw_done)
                        {
                            return Ok(self.complete(listener, deltas, StopReason::Completed));
                        }
                    }
                }
                Some(Err(err)) => return Err(self.fail(listener, AiError::Provider(err))),
                None => {
                    if let Some(line) = decoder.finish()
                        && !self.aborted()
                        && let Step::Terminal =
                            self.handle_line(&line, listener, &mut deltas, &mut saw_done)
                    {
                        return Ok(self.complete(listener, deltas, StopReason::Completed));
                    }
                    let reason = if saw_done {
                        StopReason::Completed
                    } else {
                        warn!(run_id = %run_id, provider = %provider, deltas, "stream ended without a finish marker");
                        StopReason::Truncated
                    };
                    return Ok(self.complete(listener, deltas, reason));
                }
            }
        }
    }

    fn handle_line<L: StreamListener + ?Sized>(
        &self,
        line: &str,
        listener: &mut L,
        deltas: &mut u64,
        saw_done: &mut bool,
    ) -> Step {
        match self.extractor.extract(line) {
            Ok(Some(Extracted::Delta(delta))) => {
                debug!(run_id = %self.run_id, provider = %self.provider, seq = *deltas, status = ?delta.status, "stream delta");
                *saw_done |= delta.is_done();
                *deltas = deltas.saturating_add(1);
                listener.on_message(delta);
                Step::Continue
            }
            Ok(Some(Extracted::Terminal)) => Step::Terminal,
            Ok(None) => Step::Continue,
            Err(err) => {
                warn!(run_id = %self.run_id, provider = %self.provider, error = %err, "skipping malformed stream line");
                Step::Continue
            }
        }
    }

    fn complete<L: StreamListener + ?Sized>(
        &self,
        listener: &mut L,
        deltas: u64,
        reason: StopReason,
    ) -> StreamSummary {
        debug!(run_id = %self.run_id, provider = %self.provider, deltas, ?reason, "stream session finished");
        listener.on_stop(reason);
        StreamSummary {
            run_id: self.run_id,
            deltas,
            reason,
        }
    }

    fn fail<L: StreamListener + ?Sized>(&self, listener: &mut L, err: AiError) -> AiError {
        let reason = match &err {
            AiError::Cancelled => StopReason::Cancelled,
            AiError::TimedOut(_) => StopReason::TimedOut,
            _ => StopReason::Failed,
        };
        error!(run_id = %self.run_id, provider = %self.provider, error = %err, "stream session failed");
        listener.on_stop(reason);
        err
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    let aborted = rx.wait_for(|aborted| *aborted).await.is_ok();
    if !aborted {
        // Sender gone: cancellation can no longer be requested.
        std::future::pending::<()>().await;
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
