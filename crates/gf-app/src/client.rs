//! Client side of the datagram protocol.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{MAX_DATAGRAM, Message, StateReply, decode_state, encode};

pub struct GridClient {
    socket: UdpSocket,
    server: SocketAddr,
    last_state: Option<StateReply>,
}

impl GridClient {
    /// Bind an ephemeral local port of the same address family as `server`.
    pub fn connect(server: SocketAddr) -> AppResult<Self> {
        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        Ok(Self {
            socket,
            server,
            last_state: None,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// The most recent state received from the server.
    pub fn last_state(&self) -> Option<&StateReply> {
        self.last_state.as_ref()
    }

    /// Request the current grid state.
    ///
    /// When no reply arrives within `timeout`, the last state received is
    /// returned instead; with no earlier state this is a timeout error.
    pub fn get_state(&mut self, timeout: Duration) -> AppResult<StateReply> {
        self.drain_stale()?;
        self.socket.send_to(&encode(&Message::Request)?, self.server)?;

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.fallback(timeout);
            }
            self.socket.set_read_timeout(Some(remaining))?;

            match self.socket.recv_from(&mut buf) {
                Ok((len, peer)) if peer == self.server => match decode_state(&buf[..len]) {
                    Ok(state) => {
                        self.last_state = Some(state.clone());
                        return Ok(state);
                    }
                    Err(e) => warn!(%peer, error = %e, "ignoring malformed state reply"),
                },
                Ok((_, peer)) => debug!(%peer, "ignoring datagram from unexpected peer"),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return self.fallback(timeout);
                }
                Err(e) if matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused) => {
                    return self.fallback(timeout);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send a setpoint. Fire-and-forget: the server never acknowledges.
    pub fn implement_setpoint(&self, bus_index: usize, p: f64, q: f64) -> AppResult<()> {
        let message = Message::ImplementSetpoint { bus_index, p, q };
        self.socket.send_to(&encode(&message)?, self.server)?;
        Ok(())
    }

    /// Discard replies that arrived after an earlier request gave up waiting.
    fn drain_stale(&self) -> AppResult<()> {
        self.socket.set_nonblocking(true)?;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let drained = loop {
            match self.socket.recv_from(&mut buf) {
                Ok((_, peer)) => debug!(%peer, "discarding stale datagram"),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused
                    ) =>
                {
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };
        self.socket.set_nonblocking(false)?;
        Ok(drained?)
    }

    fn fallback(&self, timeout: Duration) -> AppResult<StateReply> {
        match &self.last_state {
            Some(state) => {
                warn!(server = %self.server, "no state reply; using last known state");
                Ok(state.clone())
            }
            None => Err(AppError::Timeout {
                addr: self.server,
                timeout_ms: timeout.as_millis(),
            }),
        }
    }
}
