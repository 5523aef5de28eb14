// SPDX-License-Identifier: MIT

//! TCP front end: one thread and one dispatcher per connection, all sharing
//! the same immutable volume.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, info, trace, warn};
use vfatfs::prelude::*;
use vfatfs::protocol::REQUEST_SIZE;

use crate::utils::pretty_bytes;

/// What one connection did before it closed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: u64,
    pub bytes_sent: u64,
    /// The client asked for more than [`MAX_READ_LENGTH`] bytes.
    pub rejected: bool,
}

pub struct Server {
    listener: TcpListener,
    volume: Arc<Volume>,
}

impl Server {
    pub fn bind(addr: SocketAddr, volume: Arc<Volume>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, volume })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener fails.
    pub fn run(self) -> io::Result<()> {
        info!("Listening on {}", self.local_addr()?);
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.spawn(stream),
                Err(e) => warn!("Accept failed: {e}"),
            }
        }
        Ok(())
    }

    fn spawn(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown peer".to_string(), |a| a.to_string());
        let volume = Arc::clone(&self.volume);
        let spawned = thread::Builder::new()
            .name(format!("vfatd-{peer}"))
            .spawn(move || serve_connection(stream, volume, &peer));
        if let Err(e) = spawned {
            warn!("Cannot start a connection thread: {e}");
        }
    }
}

fn serve_connection(mut stream: TcpStream, volume: Arc<Volume>, peer: &str) {
    info!("Client connected: {peer}");
    if let Err(e) = stream.set_nodelay(true) {
        debug!("{peer}: TCP_NODELAY not set: {e}");
    }
    let mut dispatcher = Dispatcher::new(volume);
    match handle_client(&mut stream, &mut dispatcher) {
        Ok(stats) => info!(
            "Client disconnected: {peer} ({} requests, {} sent)",
            stats.requests,
            pretty_bytes(stats.bytes_sent)
        ),
        Err(e) => warn!("Client {peer} dropped: {e}"),
    }
}

/// Serves requests from `stream` until the client disconnects.
///
/// A clean end of stream between requests is a normal disconnect; any other
/// transport failure is returned. Oversized reads end the session before any
/// buffer is allocated.
pub fn handle_client<S: Read + Write>(
    stream: &mut S,
    dispatcher: &mut Dispatcher,
) -> io::Result<SessionStats> {
    let mut stats = SessionStats::default();
    let mut header = [0u8; REQUEST_SIZE];

    loop {
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(stats),
            Err(e) => return Err(e),
        }
        stats.requests += 1;

        let request = Request::decode(&header);
        let reply = match request.kind() {
            Ok(RequestKind::Geometry) => {
                debug!("Geometry request");
                dispatcher.volume().init_answer()
            }
            Ok(RequestKind::Read { position, length }) => {
                trace!("Data request: {length} bytes at {position:#x}");
                let mut buf = vec![0u8; length as usize];
                // Past the end of the image the tail stays zero.
                dispatcher.read_into(position, &mut buf);
                buf
            }
            Err(e) => {
                warn!("Closing connection: {e}");
                stats.rejected = true;
                return Ok(stats);
            }
        };

        stream.write_all(&reply)?;
        stats.bytes_sent += reply.len() as u64;
    }
}
