//! Admission Server: accepts one connection per arriving patient.
//!
//! Connections are handled one at a time on the accept task. Per connection
//! the only work is one bounded read, the log insert and the enqueue, so the
//! next accept is never delayed by service simulation. The insert and enqueue
//! block on locks and file writes, so they run on the blocking pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::core::{Scheduler, TriageError};
use crate::runtime::protocol::{ArrivalMessage, ACKNOWLEDGMENT, MAX_MESSAGE_BYTES};

/// Pause after a failed accept before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// TCP ingress feeding the scheduler.
pub struct AdmissionServer {
    listener: TcpListener,
    scheduler: Arc<Scheduler>,
    read_timeout: Duration,
}

impl AdmissionServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::Bind` if the address cannot be bound.
    pub async fn bind(
        addr: &str,
        scheduler: Arc<Scheduler>,
        read_timeout: Duration,
    ) -> Result<Self, TriageError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TriageError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            scheduler,
            read_timeout,
        })
    }

    /// Address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Propagates the socket error.
    pub fn local_addr(&self) -> Result<SocketAddr, TriageError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process is terminated.
    pub async fn serve(self) {
        self.serve_until(std::future::pending::<()>()).await;
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, rooms = self.scheduler.rooms().len(), "admission server listening");
        }
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.handle(stream, peer).await,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
        info!("admission server stopped");
    }

    async fn handle(&self, mut stream: TcpStream, peer: SocketAddr) {
        debug!(%peer, "connection accepted");
        let mut buf = vec![0_u8; MAX_MESSAGE_BYTES];
        let read = match tokio::time::timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!(%peer, error = %e, "read failed, dropping connection");
                return;
            }
            Err(_) => {
                warn!(%peer, "no payload before read timeout, dropping connection");
                return;
            }
        };

        let message = match ArrivalMessage::decode(&buf[..read]) {
            Ok(message) => message,
            Err(e) => {
                warn!(%peer, error = %e, "dropping malformed arrival");
                return;
            }
        };

        let patient_id = message.patient_id;
        let arrival = message.into_arrival();
        let scheduler = Arc::clone(&self.scheduler);
        // Admission takes room locks and exports the log file.
        let room = match tokio::task::spawn_blocking(move || scheduler.admit(arrival)).await {
            Ok(room) => room,
            Err(e) => {
                warn!(%peer, patient_id, error = %e, "admission task failed");
                return;
            }
        };

        if let Err(e) = stream.write_all(ACKNOWLEDGMENT).await {
            warn!(%peer, patient_id, room, error = %e, "acknowledgment not delivered");
        }
        let _ = stream.shutdown().await;
    }
}

impl std::fmt::Debug for AdmissionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionServer")
            .field("addr", &self.listener.local_addr().ok())
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
