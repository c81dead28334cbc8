//! Single-resolution reply objects for asynchronous controller commands.
//!
//! [`reply_pair`] returns the two halves of a `tokio::sync::oneshot`
//! channel. The [`ReplyResolver`] is consumed by [`ReplyResolver::resolve`],
//! so a reply can be resolved at most once by construction. The
//! application awaits the [`CommandReply`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::GatewayError;

/// Outcome carried by a reply.
pub type ReplyResult = Result<(), GatewayError>;

/// Creates a connected resolver/reply pair.
#[must_use]
pub fn reply_pair() -> (ReplyResolver, CommandReply) {
    let (tx, rx) = oneshot::channel();
    (ReplyResolver { tx }, CommandReply { rx })
}

/// Creates a reply that is already resolved with `result`.
#[must_use]
pub fn resolved(result: ReplyResult) -> CommandReply {
    let (resolver, reply) = reply_pair();
    resolver.resolve(result);
    reply
}

/// Write half of a reply, exclusively owned by whoever will resolve it.
#[derive(Debug)]
pub struct ReplyResolver {
    tx: oneshot::Sender<ReplyResult>,
}

impl ReplyResolver {
    /// Resolves the reply. Consumes the resolver.
    pub fn resolve(self, result: ReplyResult) {
        if self.tx.send(result).is_err() {
            tracing::debug!("reply resolved after the caller dropped it");
        }
    }
}

/// Read half of a reply, handed to the application.
///
/// Awaiting it yields the command outcome. If the resolver is dropped
/// without resolving (the gateway shut down), the outcome is a
/// [`GatewayError::BackendError`].
#[derive(Debug)]
pub struct CommandReply {
    rx: oneshot::Receiver<ReplyResult>,
}

impl CommandReply {
    /// Returns the outcome without waiting, or `None` if still pending.
    pub fn try_result(&mut self) -> Option<ReplyResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(dropped())),
        }
    }
}

impl Future for CommandReply {
    type Output = ReplyResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(dropped())))
    }
}

fn dropped() -> GatewayError {
    GatewayError::BackendError("reply dropped before resolution".to_string())
}
