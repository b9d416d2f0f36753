// Implementation of the Stellarium telescope server protocol, backed by a
// goto mount.
//
// Stellarium sends a binary goto request whenever the user slews; otherwise it
// sends nothing and expects the server to report the telescope's current
// position periodically. Each session cycle waits a bounded time for a
// request, forwards it to the mount, then reports where the mount points.
//
// Frame layouts are in nexstar_elements::stellarium_frame.
//
// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::{
    future::Future,
    io::{Error, ErrorKind},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    time::{sleep, timeout},
};

use nexstar_elements::bridge_error::{BridgeError, BridgeResult};
use nexstar_elements::mount_trait::{EquatorialPosition, MountTrait};
use nexstar_elements::stellarium_frame::{
    GotoRequest, PositionReport, GOTO_REQUEST_SIZE, STATUS_GOTO_REJECTED,
    STATUS_MOUNT_ERROR, STATUS_OK,
};

pub const DEFAULT_PORT: u16 = 10001;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(4);

/// Shared handle on the mount. Only one exchange with the mount may be in
/// flight at a time; the lock enforces that.
pub type SharedMount = Arc<Mutex<dyn MountTrait + Send>>;

/// What one bounded read of the client connection produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    // A complete goto request, degrees.
    Command { ra: f64, dec: f64 },
    // Nothing arrived before the read timeout.
    NoCommand,
    // Part of a request arrived, then the timeout expired or the client
    // closed.
    FramingError { received: usize },
}

// Pause after a failed accept (e.g. out of file descriptors) before trying
// again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

// Calls `accept` until it yields a connection, sleeping ACCEPT_RETRY_DELAY
// after each failure.
async fn accept_retrying<T, F, Fut>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

pub struct StellariumServer {
    mount: SharedMount,
    port: u16,
    read_timeout: Duration,
}

impl StellariumServer {
    pub fn new(mount: SharedMount, port: u16, read_timeout: Duration) -> Self {
        StellariumServer { mount, port, read_timeout }
    }

    /// Listens on all interfaces and serves one client at a time, forever.
    pub async fn serve_requests(&self) -> BridgeResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    pub async fn bind(&self) -> BridgeResult<TcpListener> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            BridgeError::PortUnavailable(format!("Failed to bind {}: {}", addr, e))
        })?;
        info!("Running Stellarium telescope server on: {}",
              listener.local_addr().map_err(BridgeError::from)?);
        Ok(listener)
    }

    // Accepts a connection, runs its session to completion, then waits for the
    // next client.
    pub async fn serve(&self, listener: TcpListener) -> BridgeResult<()> {
        loop {
            let (stream, addr) = accept_retrying(|| listener.accept()).await;
            info!("Connection from {}", addr);
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not set TCP_NODELAY: {}", e);
            }
            let mut session = StellariumSession::new(
                stream, self.mount.clone(), self.read_timeout);
            match session.run().await {
                Err(BridgeError::ConnectionClosed(msg)) => {
                    info!("Client {} closed connection: {}", addr, msg);
                }
                Err(e) => {
                    warn!("Session with {} ended: {}", addr, e);
                }
                Ok(()) => {}
            }
        }
    }
}

/// One client connection.
pub struct StellariumSession<S> {
    stream: S,
    mount: SharedMount,
    read_timeout: Duration,

    // Most recent position read from the mount. Re-sent, flagged as an error,
    // when the mount cannot be read.
    last_position: Option<EquatorialPosition>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> StellariumSession<S> {
    pub fn new(stream: S, mount: SharedMount, read_timeout: Duration) -> Self {
        StellariumSession { stream, mount, read_timeout, last_position: None }
    }

    /// Runs request/report cycles until the connection fails. Always returns
    /// an error; ConnectionClosed is the normal end of a session.
    pub async fn run(&mut self) -> BridgeResult<()> {
        loop {
            self.serve_once().await?;
        }
    }

    /// One cycle: wait for a request (bounded), forward it to the mount, then
    /// report the mount's position.
    pub async fn serve_once(&mut self) -> BridgeResult<()> {
        let status = match self.read_request().await? {
            RequestOutcome::Command { ra, dec } => {
                info!("Got command from Stellarium: slew to \
                       (ra={}deg, dec={}deg)", ra, dec);
                self.issue_goto(ra, dec).await
            }
            RequestOutcome::NoCommand => STATUS_OK,
            RequestOutcome::FramingError { received } => {
                return Err(BridgeError::MalformedFrame {
                    received,
                    expected: GOTO_REQUEST_SIZE,
                });
            }
        };
        self.send_position(status).await
    }

    pub async fn read_request(&mut self) -> BridgeResult<RequestOutcome> {
        let mut buf = [0u8; GOTO_REQUEST_SIZE];
        let mut received = 0;
        // The timeout covers the whole frame, not each individual read.
        let result = timeout(self.read_timeout,
                             read_frame(&mut self.stream, &mut buf, &mut received))
            .await;
        match result {
            Err(_elapsed) if received == 0 => Ok(RequestOutcome::NoCommand),
            Err(_elapsed) => Ok(RequestOutcome::FramingError { received }),
            Ok(Ok(())) => {
                let request = GotoRequest::parse(&buf);
                Ok(RequestOutcome::Command { ra: request.ra(), dec: request.dec() })
            }
            Ok(Err(e)) if received > 0 && e.kind() == ErrorKind::UnexpectedEof => {
                Ok(RequestOutcome::FramingError { received })
            }
            Ok(Err(e)) => Err(BridgeError::from_io("read request", e)),
        }
    }

    // Returns the status value to report for this cycle.
    async fn issue_goto(&self, ra: f64, dec: f64) -> i32 {
        match self.with_mount(move |mount| mount.goto_ra_dec(ra, dec)).await {
            Ok(true) => STATUS_OK,
            Ok(false) => {
                warn!("Mount rejected slew to ({}, {})", ra, dec);
                STATUS_GOTO_REJECTED
            }
            Err(e) => {
                warn!("Slew to ({}, {}) failed: {}", ra, dec, e);
                STATUS_MOUNT_ERROR
            }
        }
    }

    async fn send_position(&mut self, goto_status: i32) -> BridgeResult<()> {
        let (position, status) =
            match self.with_mount(|mount| mount.get_ra_dec()).await {
                Ok(position) => {
                    self.last_position = Some(position);
                    (position, goto_status)
                }
                Err(e) => {
                    warn!("Could not read mount position: {}", e);
                    // Before the first good read there is no position to
                    // repeat; the client still gets the error status.
                    (self.last_position.unwrap_or_default(), STATUS_MOUNT_ERROR)
                }
            };
        let frame = PositionReport::new(position.ra, position.dec, status);
        debug!("Reporting {:?}", frame);
        self.stream.write_all(&frame.to_bytes()).await
            .map_err(|e| BridgeError::from_io("send position", e))?;
        self.stream.flush().await
            .map_err(|e| BridgeError::from_io("send position", e))
    }

    // Runs a blocking mount exchange off the async reactor.
    async fn with_mount<T, F>(&self, f: F) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut (dyn MountTrait + Send + 'static)) -> BridgeResult<T>
            + Send + 'static,
    {
        let mount = self.mount.clone();
        tokio::task::spawn_blocking(move || {
            let mut locked_mount = mount.lock().map_err(|_| {
                BridgeError::Io(Error::other("Mount lock poisoned"))
            })?;
            f(&mut *locked_mount)
        })
        .await
        .map_err(|e| BridgeError::Io(Error::other(e)))?
    }
}

// Fills `buf`, counting bytes into `received` so the caller can tell a partial
// frame from no frame when the read is abandoned.
async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
    received: &mut usize,
) -> std::io::Result<()> {
    while *received < buf.len() {
        let n = reader.read(&mut buf[*received..]).await?;
        if n == 0 {
            return Err(Error::from(ErrorKind::UnexpectedEof));
        }
        *received += n;
    }
    Ok(())
}
