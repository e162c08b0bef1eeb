use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::client::{Transport, TransportError};

enum Reply {
    Ready(Result<String, TransportError>),
    Gated(oneshot::Receiver<Result<String, TransportError>>),
}

/// In-memory transport that answers requests from a queue of scripted
/// replies and records every URL it was asked for.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<(String, Duration)>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, body: &str) -> &Self {
        self.push(Reply::Ready(Ok(body.to_string())));
        self
    }

    pub(crate) fn time_out(&self) -> &Self {
        self.push(Reply::Ready(Err(TransportError::Timeout(Duration::from_millis(5000)))));
        self
    }

    /// Queues a reply that only arrives once the returned sender fires.
    pub(crate) fn gate(&self) -> oneshot::Sender<Result<String, TransportError>> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Gated(rx));
        tx
    }

    pub(crate) fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|(url, _)| url).collect()
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &self,
        url: String,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        self.requests.lock().unwrap().push((url, timeout));
        let reply = self.replies.lock().unwrap().pop_front();
        async move {
            match reply {
                Some(Reply::Ready(result)) => result,
                Some(Reply::Gated(rx)) => rx.await.unwrap_or(Err(TransportError::Timeout(timeout))),
                None => Err(TransportError::Timeout(timeout)),
            }
        }
    }
}
