//! Request server
//!
//! Serves the command line protocol over a Unix datagram socket. Each request
//! datagram holds one command; the reply is the 4-byte little-endian answer
//! sent back to the requesting socket's path.
//!
//! A panic while applying a command means the tree broke an invariant. It is
//! never turned into an answer: the worker re-raises it, and `serve` re-raises
//! it in turn.

use crate::command::Command;
use crate::dispatch::{Dispatcher, BAD_REQUEST};
use crate::error::ApiError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixDatagram;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Largest request datagram accepted, in bytes.
pub const MAX_REQUEST_LEN: usize = 256;

pub struct Server {
    socket: Arc<UnixDatagram>,
    path: PathBuf,
    dispatcher: Arc<Dispatcher>,
    workers: usize,
}

impl Server {
    /// Bind the socket at `path`, replacing a stale socket file left by an
    /// earlier run. Must be called from within a tokio runtime.
    pub fn bind(
        path: impl AsRef<Path>,
        dispatcher: Arc<Dispatcher>,
        workers: usize,
    ) -> Result<Self, ApiError> {
        let path = path.as_ref().to_path_buf();
        remove_socket_file(&path)?;
        let socket = UnixDatagram::bind(&path)?;
        info!(workers, "Listening on {}", path.display());
        Ok(Self {
            socket: Arc::new(socket),
            path,
            dispatcher,
            workers: workers.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve until `shutdown` resolves or a worker hits a socket error.
    /// The socket file is removed on the way out.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        for worker_id in 0..self.workers {
            tasks.spawn(worker(
                worker_id,
                Arc::clone(&self.socket),
                Arc::clone(&self.dispatcher),
            ));
        }

        let result = tokio::select! {
            _ = shutdown => {
                info!("Shutting down server");
                Ok(())
            }
            Some(joined) = tasks.join_next() => match joined {
                Ok(result) => result,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => Err(ApiError::Protocol(format!("server worker failed: {}", err))),
            },
        };

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        remove_socket_file(&self.path)?;
        result
    }
}

async fn worker(
    worker_id: usize,
    socket: Arc<UnixDatagram>,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), ApiError> {
    debug!(worker_id, "Worker started");
    // One spare byte tells an oversized datagram apart from one that fits.
    let mut buf = [0u8; MAX_REQUEST_LEN + 1];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let decoded = if len > MAX_REQUEST_LEN {
            Err(format!("request longer than {} bytes", MAX_REQUEST_LEN))
        } else {
            decode(&buf[..len])
        };
        let answer = match decoded {
            Ok(command) => {
                debug!(worker_id, "Request: {}", command);
                let dispatcher = Arc::clone(&dispatcher);
                run_blocking(worker_id, move || dispatcher.apply(&command)).await
            }
            Err(reason) => {
                warn!(worker_id, "Rejected request: {}", reason);
                BAD_REQUEST
            }
        };

        let Some(reply_to) = peer.as_pathname() else {
            warn!(worker_id, "Request from unnamed socket, dropping answer");
            continue;
        };
        if let Err(err) = socket.send_to(&answer.to_le_bytes(), reply_to).await {
            warn!(worker_id, "Reply to {} failed: {}", reply_to.display(), err);
        }
    }
}

/// Run `apply` on the blocking pool. A panic inside it is re-raised here.
async fn run_blocking<F>(worker_id: usize, apply: F) -> i32
where
    F: FnOnce() -> i32 + Send + 'static,
{
    match tokio::task::spawn_blocking(apply).await {
        Ok(answer) => answer,
        Err(err) if err.is_panic() => {
            error!(worker_id, "Dispatch panicked, stopping server");
            std::panic::resume_unwind(err.into_panic())
        }
        Err(err) => {
            error!(worker_id, "Dispatch cancelled: {}", err);
            BAD_REQUEST
        }
    }
}

/// Requests may carry a trailing NUL.
fn decode(datagram: &[u8]) -> Result<Command, String> {
    let text = std::str::from_utf8(datagram).map_err(|e| e.to_string())?;
    text.trim_end_matches('\0').trim().parse()
}

pub(crate) fn remove_socket_file(path: &Path) -> Result<(), ApiError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
