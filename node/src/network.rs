//! TCP transport adapter
//!
//! Gives every peer a reliable, ordered byte channel over plain TCP:
//! - The bound listener address is the local `PeerIdentity`
//! - Each stream starts with one frame carrying the connecting side's
//!   identity, so both ends key the channel by a stable name
//! - Frames are a big-endian `u32` length followed by the payload
//! - Each connection gets a reader task and a writer task; the writer drains
//!   the channel's unbounded queue so sends never block the session loop
//! - At most one channel per identity is live. An inbound handshake naming
//!   an identity that is already connected, or being dialed, is refused
//!
//! Everything that happens on a connection is reported as a
//! `TransportEvent` on one `mpsc` channel, consumed by the single loop that
//! owns the `Supervisor`.

use log::{debug, error, info, warn};
use shared::{ChannelHandle, PeerIdentity, SessionError, Transport, TransportEvent};
use std::io;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Identities with a live or pending channel.
///
/// An identity is claimed before dialing or when a handshake arrives, and
/// released only after the channel's final `Closed`/`Failed` event is queued,
/// so events for one identity never interleave across two channels.
#[derive(Debug, Clone, Default)]
struct LiveChannels {
    claimed: Arc<Mutex<HashSet<PeerIdentity>>>,
}

impl LiveChannels {
    fn claim(&self, identity: &PeerIdentity) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.clone())
    }

    fn release(&self, identity: &PeerIdentity) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity);
    }
}

pub struct TcpTransport {
    local_identity: Option<PeerIdentity>,
    events: mpsc::UnboundedSender<TransportEvent>,
    live: LiveChannels,
}

impl TcpTransport {
    /// Binds `addr` and starts accepting peers. Must be called inside a
    /// tokio runtime.
    pub async fn bind(
        addr: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_identity = PeerIdentity::from(listener.local_addr()?.to_string());
        info!("Listening on {}", local_identity);

        let live = LiveChannels::default();
        tokio::spawn(accept_loop(listener, events.clone(), live.clone()));

        Ok(Self {
            local_identity: Some(local_identity),
            events,
            live,
        })
    }
}

impl Transport for TcpTransport {
    fn local_identity(&self) -> Option<PeerIdentity> {
        self.local_identity.clone()
    }

    fn connect(&mut self, target: &PeerIdentity) -> Result<(), SessionError> {
        let local = self
            .local_identity
            .clone()
            .ok_or(SessionError::TransportUnavailable)?;
        let addr: SocketAddr = target
            .as_str()
            .parse()
            .map_err(|_| SessionError::PeerUnreachable(target.clone()))?;

        if !self.live.claim(target) {
            debug!("Channel to {} already live or pending, not dialing", target);
            return Ok(());
        }

        let events = self.events.clone();
        let live = self.live.clone();
        let target = target.clone();
        tokio::spawn(async move {
            match open_outbound(addr, &local).await {
                Ok(stream) => {
                    let (reader, writer) = stream.into_split();
                    run_channel(target, reader, writer, events, live).await;
                }
                Err(e) => {
                    warn!("Failed to connect to {}: {}", target, e);
                    let _ = events.send(TransportEvent::Failed {
                        peer: target.clone(),
                        reason: e.to_string(),
                    });
                    live.release(&target);
                }
            }
        });
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::UnboundedSender<TransportEvent>,
    live: LiveChannels,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("Inbound connection from {}", addr);
                let events = events.clone();
                let live = live.clone();
                tokio::spawn(async move {
                    let (mut reader, writer) = stream.into_split();
                    match read_handshake(&mut reader).await {
                        Ok(peer) if live.claim(&peer) => {
                            run_channel(peer, reader, writer, events, live).await
                        }
                        Ok(peer) => warn!(
                            "Rejected connection from {}: {} already has a channel",
                            addr, peer
                        ),
                        Err(e) => warn!("Rejected connection from {}: {}", addr, e),
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        if events.is_closed() {
            debug!("Session loop gone, stopping listener");
            break;
        }
    }
}

async fn open_outbound(addr: SocketAddr, local: &PeerIdentity) -> io::Result<TcpStream> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    write_frame(&mut stream, local.as_str().as_bytes()).await?;
    Ok(stream)
}

async fn read_handshake(reader: &mut OwnedReadHalf) -> io::Result<PeerIdentity> {
    let frame = read_frame(reader)
        .await?
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no handshake"))?;
    let identity = String::from_utf8(frame)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "identity is not utf-8"))?;
    if identity.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "empty identity"));
    }
    Ok(PeerIdentity::from(identity))
}

/// Reports the channel as open, then pumps frames until the stream ends.
/// `peer` must already be claimed in `live`; the claim is released on exit.
async fn run_channel(
    peer: PeerIdentity,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    events: mpsc::UnboundedSender<TransportEvent>,
    live: LiveChannels,
) {
    pump_channel(&peer, reader, writer, &events).await;
    live.release(&peer);
}

async fn pump_channel(
    peer: &PeerIdentity,
    mut reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    events: &mpsc::UnboundedSender<TransportEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    if events
        .send(TransportEvent::Opened {
            peer: peer.clone(),
            channel: ChannelHandle::new(tx),
        })
        .is_err()
    {
        return;
    }

    tokio::spawn(write_loop(writer, rx, peer.clone()));

    loop {
        let event = match read_frame(&mut reader).await {
            Ok(Some(bytes)) => TransportEvent::Data {
                from: peer.clone(),
                bytes,
            },
            Ok(None) => {
                let _ = events.send(TransportEvent::Closed { peer: peer.clone() });
                return;
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Failed {
                    peer: peer.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    peer: PeerIdentity,
) {
    while let Some(bytes) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &bytes).await {
            warn!("Failed to send to {}: {}", peer, e);
            break;
        }
    }
    debug!("Writer for {} finished", peer);
}

/// Reads one frame. `Ok(None)` means the stream ended cleanly between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds limit", bytes.len()),
        ));
    }
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(bytes).await?;
    writer.flush().await
}
