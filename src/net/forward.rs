//! Raw TCP forwarding.
//!
//! # Responsibilities
//! - Accept connections on a configured address
//! - Consult the rate limiter with the peer's IP before any upstream work
//! - Dial the destination with a connect timeout
//! - Stream bytes both ways until either side closes
//!
//! # Design Decisions
//! - A denied connection is closed immediately, before the upstream dial,
//!   so abusive peers cannot make the gateway open upstream connections
//! - Admission is keyed on the accepted socket's peer IP; there is no
//!   in-band protocol to inspect

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::schema::ForwardConfig;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::observability::metrics;
use crate::ratelimit::IpLimiter;

/// Error dialing the forward destination. Per-connection; logged, never
/// propagated to the accept loop.
#[derive(Debug, Error)]
enum DialError {
    #[error("dial {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("dial {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A raw TCP forwarder for one configured listen address.
pub struct Forwarder {
    config: ForwardConfig,
    limiter: Option<Arc<IpLimiter>>,
    connect_timeout: Duration,
}

impl Forwarder {
    pub fn new(
        config: ForwardConfig,
        limiter: Option<Arc<IpLimiter>>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            config,
            limiter,
            connect_timeout,
        }
    }

    /// Accept and forward connections until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let listener = Listener::bind(&self.config.bind_address, self.config.max_connections).await?;
        tracing::info!(
            address = %self.config.bind_address,
            to = %self.config.to,
            "Raw forwarder started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(address = %self.config.bind_address, "Raw forwarder stopping");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer, permit) = accepted?;
                    let to = self.config.to.clone();
                    let limiter = self.limiter.clone();
                    let connect_timeout = self.connect_timeout;
                    tokio::spawn(async move {
                        forward_connection(stream, peer, to, limiter, connect_timeout, permit).await;
                    });
                }
            }
        }
    }
}

async fn forward_connection(
    mut src: TcpStream,
    peer: SocketAddr,
    to: String,
    limiter: Option<Arc<IpLimiter>>,
    connect_timeout: Duration,
    _permit: ConnectionPermit,
) {
    let start = Instant::now();

    if let Some(limiter) = &limiter {
        if !limiter.allow(peer.ip()) {
            tracing::debug!(peer = %peer, "Rate limit exceeded, dropping connection");
            metrics::record_rate_limited("raw");
            return;
        }
    }

    let mut dst = match dial(&to, connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "Upstream dial failed");
            return;
        }
    };

    match tokio::io::copy_bidirectional(&mut src, &mut dst).await {
        Ok((sent, received)) => {
            tracing::info!(
                peer = %peer,
                to = %to,
                sent,
                received,
                elapsed = ?start.elapsed(),
                "Connection closed"
            );
            metrics::record_forward(&to, sent + received, start);
        }
        Err(e) => {
            // Common on abrupt client disconnects; not worth more than debug.
            tracing::debug!(peer = %peer, to = %to, error = %e, "Copy ended with error");
        }
    }
}

async fn dial(addr: &str, connect_timeout: Duration) -> Result<TcpStream, DialError> {
    match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(DialError::Io {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(DialError::Timeout {
            addr: addr.to_string(),
            timeout: connect_timeout,
        }),
    }
}
