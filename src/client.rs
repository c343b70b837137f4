//! Client for the request server
//!
//! A [`Client`] binds its own datagram socket so the server has an address to
//! answer. One request is in flight at a time. Answers carry no request id, so
//! once a request times out its late answer could be taken for the next one;
//! a timed-out client refuses further requests and must be mounted again.

use crate::command::Command;
use crate::error::{ApiError, FsError};
use crate::server::{remove_socket_file, MAX_REQUEST_LEN};
use crate::types::{NodeId, NodeKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixDatagram;
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Client {
    socket: UnixDatagram,
    local: PathBuf,
    timeout: Duration,
    timed_out: bool,
}

impl Client {
    /// Bind `local` and connect to the server at `server`. Must be called
    /// from within a tokio runtime.
    pub fn mount(server: impl AsRef<Path>, local: impl AsRef<Path>) -> Result<Self, ApiError> {
        let local = local.as_ref().to_path_buf();
        remove_socket_file(&local)?;
        let socket = UnixDatagram::bind(&local)?;
        socket.connect(server.as_ref())?;
        debug!("Mounted {} via {}", server.as_ref().display(), local.display());
        Ok(Self {
            socket,
            local,
            timeout: DEFAULT_TIMEOUT,
            timed_out: false,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one command and wait for its raw answer.
    pub async fn request(&mut self, command: &Command) -> Result<i32, ApiError> {
        if self.timed_out {
            return Err(ApiError::Protocol(
                "an earlier request timed out; mount a new client".to_string(),
            ));
        }
        let line = command.to_string();
        if line.len() > MAX_REQUEST_LEN {
            return Err(ApiError::Protocol(format!(
                "request of {} bytes exceeds {}",
                line.len(),
                MAX_REQUEST_LEN
            )));
        }
        self.socket.send(line.as_bytes()).await?;

        let mut buf = [0u8; 4];
        let len = match timeout(self.timeout, self.socket.recv(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => {
                self.timed_out = true;
                return Err(ApiError::Protocol(format!("no answer to '{}'", line)));
            }
        };
        if len != buf.len() {
            return Err(ApiError::Protocol(format!("answer of {} bytes", len)));
        }
        Ok(i32::from_le_bytes(buf))
    }

    pub async fn create(&mut self, path: &str, kind: NodeKind) -> Result<(), ApiError> {
        let command = Command::Create {
            path: path.to_string(),
            kind,
        };
        self.expect_success(&command).await
    }

    pub async fn delete(&mut self, path: &str) -> Result<(), ApiError> {
        let command = Command::Delete {
            path: path.to_string(),
        };
        self.expect_success(&command).await
    }

    pub async fn lookup(&mut self, path: &str) -> Result<NodeId, ApiError> {
        let command = Command::Lookup {
            path: path.to_string(),
        };
        let answer = self.request(&command).await?;
        if answer >= 0 {
            Ok(NodeId(answer as u32))
        } else {
            Err(failure(answer))
        }
    }

    pub async fn move_node(&mut self, src: &str, dst: &str) -> Result<(), ApiError> {
        let command = Command::Move {
            src: src.to_string(),
            dst: dst.to_string(),
        };
        self.expect_success(&command).await
    }

    /// Ask the server to write its tree dump to `output` on the server's side.
    pub async fn print(&mut self, output: impl AsRef<Path>) -> Result<(), ApiError> {
        let command = Command::Print {
            output: output.as_ref().to_path_buf(),
        };
        self.expect_success(&command).await
    }

    /// Close the socket and remove its file.
    pub fn unmount(self) -> Result<(), ApiError> {
        let Client { socket, local, .. } = self;
        drop(socket);
        remove_socket_file(&local)
    }

    async fn expect_success(&mut self, command: &Command) -> Result<(), ApiError> {
        match self.request(command).await? {
            0 => Ok(()),
            answer => Err(failure(answer)),
        }
    }
}

fn failure(answer: i32) -> ApiError {
    match FsError::from_code(answer) {
        Some(err) => ApiError::Fs(err),
        None => ApiError::Protocol(format!("server answered {}", answer)),
    }
}
