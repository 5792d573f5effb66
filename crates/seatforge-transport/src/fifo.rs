//! Named-pipe transport.
//!
//! The server owns one well-known registration FIFO. A client creates its
//! own request and response FIFOs, then writes a fixed-size registration
//! message naming them:
//!
//! ```text
//! +-----+----------------------------+----------------------------+
//! | '1' | request path (40B, NUL pad) | response path (40B, NUL pad) |
//! +-----+----------------------------+----------------------------+
//! ```
//!
//! Opening a FIFO blocks until the other side opens it too, so client
//! pipes are opened on the blocking pool by the worker that serves them.
//! If the worker gives up while an open is still blocked (it was aborted,
//! or the runtime is shutting down), the open is released by briefly
//! standing in for the missing peer.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;

use crate::{ClientChannels, Transport, TransportError};

/// Width of each pipe path field in a registration message.
pub const PIPE_NAME_SIZE: usize = 40;

/// Tag byte that opens every registration message.
pub const REGISTRATION_TAG: u8 = b'1';

/// Total size of a registration message.
pub const REGISTRATION_LEN: usize = 1 + 2 * PIPE_NAME_SIZE;

/// A client's announcement of its request and response pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMessage {
    /// Pipe the client writes requests into.
    pub request_path: PathBuf,
    /// Pipe the client reads responses from.
    pub response_path: PathBuf,
}

impl RegistrationMessage {
    /// Serializes the message into its fixed wire layout.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidRegistration`] if either path does
    /// not fit in [`PIPE_NAME_SIZE`] bytes or contains a NUL byte.
    pub fn encode(&self) -> Result<[u8; REGISTRATION_LEN], TransportError> {
        let mut buf = [0u8; REGISTRATION_LEN];
        buf[0] = REGISTRATION_TAG;
        write_path_field(&mut buf[1..=PIPE_NAME_SIZE], &self.request_path)?;
        write_path_field(&mut buf[1 + PIPE_NAME_SIZE..], &self.response_path)?;
        Ok(buf)
    }

    /// Parses a message from exactly [`REGISTRATION_LEN`] bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, TransportError> {
        if buf.len() != REGISTRATION_LEN {
            return Err(TransportError::InvalidRegistration(format!(
                "expected {REGISTRATION_LEN} bytes, got {}",
                buf.len()
            )));
        }
        if buf[0] != REGISTRATION_TAG {
            return Err(TransportError::InvalidRegistration(format!(
                "unexpected tag byte {:#04x}",
                buf[0]
            )));
        }

        let request_path = read_path_field(&buf[1..=PIPE_NAME_SIZE])?;
        let response_path = read_path_field(&buf[1 + PIPE_NAME_SIZE..])?;
        Ok(Self {
            request_path,
            response_path,
        })
    }
}

fn write_path_field(field: &mut [u8], path: &Path) -> Result<(), TransportError> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.len() > field.len() || bytes.contains(&0) {
        return Err(TransportError::InvalidRegistration(format!(
            "pipe path {} does not fit in {} bytes",
            path.display(),
            field.len()
        )));
    }
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_path_field(field: &[u8]) -> Result<PathBuf, TransportError> {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    if end == 0 {
        return Err(TransportError::InvalidRegistration(
            "empty pipe path".into(),
        ));
    }
    Ok(PathBuf::from(OsStr::from_bytes(&field[..end])))
}

/// Creates a FIFO at `path`, readable and writable by owner and group.
///
/// A stale file already at `path` is removed first.
pub fn make_fifo(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP;
    nix::unistd::mkfifo(path, mode)
        .map_err(io::Error::from)
}

// ---------------------------------------------------------------------------
// FifoTransport
// ---------------------------------------------------------------------------

/// A [`Transport`] that reads registrations from a named pipe.
pub struct FifoTransport {
    path: PathBuf,
    receiver: pipe::Receiver,
    /// Held open so the registration pipe never reports EOF between clients.
    _keepalive: pipe::Sender,
    /// Bytes of a partially received registration.
    pending: Vec<u8>,
}

impl FifoTransport {
    /// Creates the registration FIFO at `path` and starts listening on it.
    pub async fn bind(path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let path = path.into();
        let bind_err = |source| TransportError::BindFailed {
            path: path.clone(),
            source,
        };

        make_fifo(&path).map_err(bind_err)?;
        let receiver = pipe::OpenOptions::new()
            .open_receiver(&path)
            .map_err(bind_err)?;
        let keepalive = pipe::OpenOptions::new()
            .open_sender(&path)
            .map_err(bind_err)?;

        tracing::info!(path = %path.display(), "registration pipe listening");
        Ok(Self {
            path,
            receiver,
            _keepalive: keepalive,
            pending: Vec::with_capacity(REGISTRATION_LEN),
        })
    }

    /// Returns the path of the registration FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for FifoTransport {
    type Client = FifoChannels;

    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<FifoChannels, TransportError>> + Send {
        async move {
            // `read_buf` is cancel-safe and partial registrations stay in
            // `pending` across cancelled calls.
            while self.pending.len() < REGISTRATION_LEN {
                let n = self
                    .receiver
                    .read_buf(&mut self.pending)
                    .await
                    .map_err(TransportError::AcceptFailed)?;
                if n == 0 {
                    return Err(TransportError::Shutdown);
                }
            }

            let message: Vec<u8> = self.pending.drain(..REGISTRATION_LEN).collect();
            let registration = RegistrationMessage::decode(&message)?;
            tracing::debug!(
                request = %registration.request_path.display(),
                response = %registration.response_path.display(),
                "registration received"
            );
            Ok(FifoChannels {
                request_path: registration.request_path,
                response_path: registration.response_path,
            })
        }
    }
}

impl Drop for FifoTransport {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(
                path = %self.path.display(),
                error = %e,
                "failed to remove registration pipe"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// FifoChannels
// ---------------------------------------------------------------------------

/// A registered client's pipe paths, not yet opened.
#[derive(Debug, Clone)]
pub struct FifoChannels {
    request_path: PathBuf,
    response_path: PathBuf,
}

impl FifoChannels {
    /// Path of the pipe the client writes requests into.
    pub fn request_path(&self) -> &Path {
        &self.request_path
    }

    /// Path of the pipe the client reads responses from.
    pub fn response_path(&self) -> &Path {
        &self.response_path
    }
}

impl ClientChannels for FifoChannels {
    type Reader = pipe::Receiver;
    type Writer = pipe::Sender;

    fn open(
        self,
    ) -> impl Future<Output = Result<(pipe::Receiver, pipe::Sender), TransportError>>
           + Send {
        async move {
            let file = open_blocking(self.response_path.clone(), true).await?;
            let writer = pipe::Sender::from_file(file).map_err(|source| {
                TransportError::OpenFailed {
                    path: self.response_path.clone(),
                    source,
                }
            })?;

            let file = open_blocking(self.request_path.clone(), false).await?;
            let reader = pipe::Receiver::from_file(file).map_err(|source| {
                TransportError::OpenFailed {
                    path: self.request_path.clone(),
                    source,
                }
            })?;

            Ok((reader, writer))
        }
    }
}

/// A FIFO open running on the blocking pool.
#[derive(Debug)]
struct PendingOpen {
    path: PathBuf,
    abandoned: AtomicBool,
    /// Peer handle opened on abandonment, held until the open returns.
    stand_in: Mutex<Option<std::fs::File>>,
}

impl PendingOpen {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            abandoned: AtomicBool::new(false),
            stand_in: Mutex::new(None),
        }
    }

    /// Runs on the blocking pool.
    fn open(&self, write: bool) -> io::Result<std::fs::File> {
        let opened = if self.abandoned.load(Ordering::SeqCst) {
            Err(io::Error::from(io::ErrorKind::Interrupted))
        } else {
            std::fs::OpenOptions::new()
                .read(!write)
                .write(write)
                .open(&self.path)
        };
        if let Ok(mut stand_in) = self.stand_in.lock() {
            stand_in.take();
        }
        opened
    }

    /// Wakes a blocked `open`. A nonblocking read-write open of a FIFO
    /// never blocks on Linux and counts as a peer for either end.
    fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
        let stand_in = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&self.path);
        match stand_in {
            Ok(file) => {
                if let Ok(mut slot) = self.stand_in.lock() {
                    *slot = Some(file);
                }
            }
            Err(e) => tracing::debug!(
                path = %self.path.display(),
                error = %e,
                "could not release abandoned pipe open"
            ),
        }
    }
}

/// Abandons the open if dropped while still armed.
struct AbandonOnDrop(Option<Arc<PendingOpen>>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(pending) = self.0.take() {
            pending.abandon();
        }
    }
}

/// Opens a FIFO end on the blocking pool, waiting for the peer to open the
/// other end.
///
/// Dropping the returned future releases the blocking thread.
async fn open_blocking(
    path: PathBuf,
    write: bool,
) -> Result<std::fs::File, TransportError> {
    let pending = Arc::new(PendingOpen::new(path.clone()));
    let mut guard = AbandonOnDrop(Some(Arc::clone(&pending)));

    let opened = tokio::task::spawn_blocking(move || pending.open(write)).await;
    guard.0 = None;

    opened
        .map_err(|e| TransportError::AcceptFailed(io::Error::other(e)))?
        .map_err(|source| TransportError::OpenFailed { path, source })
}
