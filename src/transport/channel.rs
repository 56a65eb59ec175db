//! In-process channel transport.
//!
//! Forwards every request envelope into a tokio unbounded channel. The
//! owner of the receiver plays the remote end and answers through
//! [`Connection::dispatch`](super::Connection::dispatch).

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::Request;

use super::Transport;

// ============================================================================
// ChannelTransport
// ============================================================================

/// Transport backed by an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    outgoing: mpsc::UnboundedSender<Request>,
}

impl ChannelTransport {
    /// Creates a transport and the receiver of its envelopes.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (outgoing, receiver) = mpsc::unbounded_channel();
        (Self { outgoing }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send_message(&self, request: &Request) {
        if self.outgoing.send(request.clone()).is_err() {
            warn!(id = request.id, method = %request.method, "Receiver dropped, request discarded");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_envelopes() {
        let (transport, mut receiver) = ChannelTransport::new();
        transport.send_message(&Request::new(3, "Net.fetch", None));

        let request = receiver.try_recv().expect("forwarded");
        assert_eq!(request.id, 3);
        assert_eq!(request.method, "Net.fetch");
    }

    #[test]
    fn test_dropped_receiver_is_not_fatal() {
        let (transport, receiver) = ChannelTransport::new();
        drop(receiver);
        transport.send_message(&Request::new(1, "Net.fetch", None));
        transport.shutdown();
    }
}
