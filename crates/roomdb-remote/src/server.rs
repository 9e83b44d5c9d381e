// Remote server - exposes a RoomDatabase over TCP
//
// One thread accepts connections; each connection gets its own thread that
// reads request frames, dispatches them to the database and writes one
// response frame per request, until the client disconnects.

use crate::frame::{Frame, FrameKind};
use crate::protocol::{RemoteError, Request, Response};
use roomdb_core::{Error, Result, RoomDatabase};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection-level options
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    /// Drop a connection that sends nothing for this long
    pub read_timeout: Option<Duration>,
}

/// TCP front end for a database
pub struct RemoteServer<D> {
    listener: TcpListener,
    db: Arc<D>,
    config: RemoteConfig,
    shutdown: Arc<AtomicBool>,
    next_connection: Arc<AtomicU64>,
}

impl<D: RoomDatabase + 'static> RemoteServer<D> {
    /// Bind a listener for `db` at `addr`
    pub fn bind(addr: impl ToSocketAddrs, db: Arc<D>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;

        Ok(Self {
            listener,
            db,
            config: RemoteConfig::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
            next_connection: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Replace the connection options
    pub fn with_config(mut self, config: RemoteConfig) -> Self {
        self.config = config;
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections on the calling thread until shut down.
    pub fn serve(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "Serving database");

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    // Accept errors such as EMFILE are usually transient
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
            let db = Arc::clone(&self.db);
            let read_timeout = self.config.read_timeout;

            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, db.as_ref(), connection, read_timeout) {
                    warn!(connection, error = %e, "Connection closed with error");
                }
            });
        }

        info!(%addr, "Server stopped");
        Ok(())
    }

    /// Run [`RemoteServer::serve`] on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr()?;
        let shutdown = Arc::clone(&self.shutdown);
        let thread = thread::Builder::new()
            .name("roomdb-server".to_string())
            .spawn(move || self.serve())?;

        Ok(ServerHandle {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Handle to a server running on a background thread
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already accepted run until their clients disconnect.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };

        self.shutdown.store(true, Ordering::Release);
        // Wake the blocking accept
        let _ = TcpStream::connect(self.addr);

        thread
            .join()
            .map_err(|_| Error::Protocol("server thread panicked".to_string()))?
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // Best effort stop on drop
        let _ = self.stop();
    }
}

fn handle_connection<D: RoomDatabase + ?Sized>(
    mut stream: TcpStream,
    db: &D,
    connection: u64,
    read_timeout: Option<Duration>,
) -> Result<()> {
    stream.set_read_timeout(read_timeout)?;
    stream.set_nodelay(true)?;

    let peer = stream.peer_addr().ok();
    debug!(connection, ?peer, "Accepted connection");

    while let Some(frame) = Frame::read_from(&mut stream)? {
        let response = match frame.into_message::<Request>(FrameKind::Request) {
            Ok(request) => {
                let operation = request.operation();
                let response = request.dispatch(db);
                if let Response::Failed(err) = &response {
                    debug!(connection, operation, kind = ?err.kind, "Request failed");
                } else {
                    debug!(connection, operation, "Request served");
                }
                response
            }
            Err(e) => {
                warn!(connection, error = %e, "Rejected malformed request");
                Response::Failed(RemoteError::from(&e))
            }
        };

        Frame::from_message(FrameKind::Response, &response)?.write_to(&mut stream)?;
    }

    debug!(connection, "Connection closed");
    Ok(())
}
