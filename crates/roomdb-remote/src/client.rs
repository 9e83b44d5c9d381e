// Remote client - a RoomDatabase backed by a TCP connection
//
// Requests on one client are sent one at a time; share the client between
// threads or open one per thread for parallel calls. The client never
// retries: a repeated delete after a lost response fails with
// RecordNotFound, which callers should treat as success of the first call.
//
// A call that fails on the transport (timeout, I/O, bad frame) may leave a
// late response in the socket, so the connection is marked broken and every
// later call fails until the caller reconnects.

use crate::frame::{Frame, FrameKind};
use crate::protocol::{Request, Response};
use roomdb_core::{Error, Position, Record, Result, RoomDatabase};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Client side of the remote database service
#[derive(Debug)]
pub struct RemoteClient {
    connection: Mutex<Connection>,
    peer: SocketAddr,
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    broken: bool,
}

impl Connection {
    fn exchange(&mut self, request: &Request) -> Result<Response> {
        Frame::from_message(FrameKind::Request, request)?.write_to(&mut self.stream)?;

        let frame = Frame::read_from(&mut self.stream)?
            .ok_or_else(|| Error::Protocol("server closed the connection".to_string()))?;
        frame.into_message(FrameKind::Response)
    }
}

impl RemoteClient {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    /// Connect to a server, giving up after `timeout`
    pub fn connect_timeout(addr: &SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(addr, timeout)?;
        Self::from_stream(stream)
    }

    fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!(%peer, "Connected to database server");

        Ok(Self {
            connection: Mutex::new(Connection {
                stream,
                broken: false,
            }),
            peer,
        })
    }

    /// Fail calls whose response takes longer than `timeout`
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let connection = self.connection.lock().map_err(|_| Error::LockPoisoned)?;
        connection.stream.set_read_timeout(timeout)?;
        connection.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Address of the server
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether an earlier transport failure has made this client unusable
    pub fn is_broken(&self) -> bool {
        self.connection.lock().map_or(true, |c| c.broken)
    }

    fn call(&self, request: Request) -> Result<Response> {
        let mut connection = self.connection.lock().map_err(|_| Error::LockPoisoned)?;
        if connection.broken {
            return Err(Error::Protocol(format!(
                "connection to {} is broken by an earlier failure; reconnect",
                self.peer
            )));
        }

        match connection.exchange(&request) {
            Ok(response) => response.into_result(),
            Err(e) => {
                connection.broken = true;
                warn!(
                    peer = %self.peer,
                    operation = request.operation(),
                    error = %e,
                    "Connection broken"
                );
                Err(e)
            }
        }
    }
}

fn unexpected(operation: &str, response: Response) -> Error {
    Error::Protocol(format!(
        "unexpected response to {}: {:?}",
        operation, response
    ))
}

impl RoomDatabase for RemoteClient {
    fn create(&self, record: Record) -> Result<Position> {
        match self.call(Request::Create(record))? {
            Response::Created(position) => Ok(position),
            other => Err(unexpected("create", other)),
        }
    }

    fn delete(&self, position: Position) -> Result<()> {
        match self.call(Request::Delete(position))? {
            Response::Done => Ok(()),
            other => Err(unexpected("delete", other)),
        }
    }

    fn update(&self, position: Position, record: Record) -> Result<()> {
        match self.call(Request::Update(position, record))? {
            Response::Done => Ok(()),
            other => Err(unexpected("update", other)),
        }
    }

    fn read(&self, position: Position) -> Result<Record> {
        match self.call(Request::Read(position))? {
            Response::Record(record) => Ok(record),
            other => Err(unexpected("read", other)),
        }
    }

    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>> {
        let request = Request::Find {
            name: name.map(str::to_string),
            location: location.map(str::to_string),
        };
        match self.call(request)? {
            Response::Found(matches) => Ok(matches),
            other => Err(unexpected("find", other)),
        }
    }

    fn book(&self, position: Position, owner: &str) -> Result<()> {
        let request = Request::Book {
            position,
            owner: owner.to_string(),
        };
        match self.call(request)? {
            Response::Done => Ok(()),
            other => Err(unexpected("book", other)),
        }
    }
}
