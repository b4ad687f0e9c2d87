//! UDP session loop
//!
//! One socket, one reply per datagram. Each datagram is handled on its own
//! task, bounded by `max_in_flight`; requests for the same RFID are
//! serialized by the authorization service. Nothing that goes wrong while
//! handling a datagram stops the loop.

use futures::FutureExt;
use kiosk_core::{config::UdpConfig, AppError, AppResult};
use kiosk_services::RfidAuthorizationService;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{decode_payload, parse_request, Reply};

/// UDP server answering device taps
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    service: Arc<RfidAuthorizationService>,
    max_in_flight: usize,
    max_datagram_size: usize,
    drain_timeout: Duration,
}

impl UdpServer {
    /// Bind the listening socket
    pub async fn bind(config: &UdpConfig, service: Arc<RfidAuthorizationService>) -> AppResult<Self> {
        let bind_addr = config.bind_addr();
        let socket = UdpSocket::bind(&bind_addr).await.map_err(|e| {
            error!("Failed to bind UDP socket on {}: {}", bind_addr, e);
            AppError::Transport(format!("Failed to bind {}: {}", bind_addr, e))
        })?;

        Ok(Self {
            socket: Arc::new(socket),
            service,
            max_in_flight: config.max_in_flight.max(1),
            max_datagram_size: config.max_datagram_size,
            drain_timeout: Duration::from_secs(config.drain_timeout_secs),
        })
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and answer datagrams until `cancel` fires
    ///
    /// On cancellation no further datagrams are read; in-flight ones get up
    /// to the drain timeout to reply before they are aborted. The socket is
    /// closed when this returns.
    pub async fn run(self, cancel: CancellationToken) -> AppResult<()> {
        let local_addr = self.local_addr()?;
        info!("RFID UDP server listening on {}", local_addr);

        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut buf = vec![0u8; self.max_datagram_size];

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_exit(joined);
                }

                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, remote)) => {
                            let payload = buf[..len].to_vec();
                            let socket = self.socket.clone();
                            let service = self.service.clone();
                            tasks.spawn(async move {
                                handle_datagram(&socket, &service, &payload, remote).await;
                                drop(permit);
                            });
                        }
                        Err(e) => warn!("UDP receive error: {}", e),
                    }
                }
            }
        }

        info!(
            "RFID UDP server stopping, draining {} in-flight datagram(s)",
            tasks.len()
        );

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                log_task_exit(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Drain timeout reached, aborting {} datagram task(s)",
                tasks.len()
            );
            tasks.shutdown().await;
        }

        info!("RFID UDP server stopped");
        Ok(())
    }
}

fn log_task_exit(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_cancelled() {
            debug!("Datagram task cancelled");
        } else {
            error!("Datagram task failed: {}", e);
        }
    }
}

/// Answer one datagram; always sends exactly one reply
async fn handle_datagram(
    socket: &UdpSocket,
    service: &RfidAuthorizationService,
    payload: &[u8],
    remote: SocketAddr,
) {
    let text = decode_payload(payload);
    info!("Datagram from {}: {:?}", remote, text);

    let reply = match AssertUnwindSafe(authorize(service, &text, remote))
        .catch_unwind()
        .await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            if e.is_lookup_miss() || matches!(e, AppError::MalformedMessage(_)) {
                warn!(error_code = e.error_code(), "Rejected datagram from {}: {}", remote, e);
            } else {
                error!(error_code = e.error_code(), "Failed datagram from {}: {}", remote, e);
            }
            Reply::Error
        }
        Err(_) => {
            error!("Panic while handling datagram from {}", remote);
            Reply::Error
        }
    };

    let encoded = reply.encode();
    match socket.send_to(encoded.as_bytes(), remote).await {
        Ok(_) => info!("Replied {} to {}", encoded, remote),
        Err(e) => error!("Failed to send reply to {}: {}", remote, e),
    }
}

async fn authorize(
    service: &RfidAuthorizationService,
    text: &str,
    remote: SocketAddr,
) -> AppResult<Reply> {
    let request = parse_request(text)?;
    let outcome = service
        .authorize(&request.rfid, &request.mac, remote.ip())
        .await?;
    Ok(Reply::from(&outcome))
}
