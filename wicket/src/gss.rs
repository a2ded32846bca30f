///! RFC 1961 GSS-API encapsulation.
///!
///! The host supplies a [`GssApi`] per connection; after subnegotiation the
///! engine talks to the client exclusively through a [`GssStream`] that
///! frames every transfer into Encapsulation messages.
use std::fmt;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use failure::Fail;

use model::{Error, GssMessageType};

use crate::byte_stream::{BoxedStream, ByteStream, SplitStream};
use crate::message::GssMessage;

/// Largest payload that still fits a GSS message after the 4-byte framing
/// and the token length field.
pub const MAX_WRAP_PAYLOAD: usize = (1 << 16) - 5;

/// Outcome of one `gss_accept_sec_context` round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedContext {
    /// context establishment finished
    pub complete: bool,
    /// token to hand back to the client; may be empty
    pub token: Vec<u8>,
}

/// Per-connection GSS-API security context supplied by the host.
///
/// Wraps `gss_accept_sec_context`, the protection-level agreement and
/// `gss_wrap`/`gss_unwrap`. Distinct connections get distinct contexts, so
/// implementations need no internal synchronisation.
pub trait GssApi: Send {
    fn accept_context(&mut self, token: &[u8]) -> Result<AcceptedContext, Error>;

    /// Negotiate one of: 0 none, 1 integrity, 2 integrity+confidentiality,
    /// 3 selective per-message.
    fn accept_protection_level(&mut self, level: u8) -> Result<u8, Error>;

    fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>, Error>;

    fn decode(&mut self, token: &[u8]) -> Result<Vec<u8>, Error>;
}

pub type BoxedGssApi = Box<dyn GssApi>;

type SharedGssApi = Arc<Mutex<BoxedGssApi>>;

/// Client stream after GSS subnegotiation.
///
/// Reads pull exactly one Encapsulation message at a time; whatever does not
/// fit the caller's buffer is spilled and drained before the next message is
/// consumed. Writes are chunked so no token exceeds the frame limit. The
/// wrapper owns the raw stream exclusively.
pub struct GssStream {
    raw: BoxedStream,
    gssapi: SharedGssApi,
    spill: Vec<u8>,
}

impl GssStream {
    pub fn new(raw: BoxedStream, gssapi: BoxedGssApi) -> Self {
        Self {
            raw,
            gssapi: Arc::new(Mutex::new(gssapi)),
            spill: vec![],
        }
    }
}

impl fmt::Debug for GssStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GssStream({:?})", self.raw)
    }
}

fn broken_lock() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "gssapi context lock poisoned")
}

fn frame_error(err: Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.compat())
}

fn gss_read<R: io::Read>(
    gssapi: &SharedGssApi,
    spill: &mut Vec<u8>,
    raw: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    if !spill.is_empty() {
        let n = buf.len().min(spill.len());
        buf[..n].copy_from_slice(&spill[..n]);
        spill.drain(..n);
        return Ok(n);
    }

    let msg = GssMessage::read_from(raw).map_err(frame_error)?;
    msg.validate(GssMessageType::Encapsulation)
        .map_err(frame_error)?;

    let payload = gssapi
        .lock()
        .map_err(|_| broken_lock())?
        .decode(&msg.token)
        .map_err(frame_error)?;

    let n = buf.len().min(payload.len());
    buf[..n].copy_from_slice(&payload[..n]);
    if n < payload.len() {
        spill.extend_from_slice(&payload[n..]);
    }
    Ok(n)
}

fn gss_write<W: io::Write>(gssapi: &SharedGssApi, raw: &mut W, buf: &[u8]) -> io::Result<usize> {
    for chunk in buf.chunks(MAX_WRAP_PAYLOAD) {
        let token = gssapi
            .lock()
            .map_err(|_| broken_lock())?
            .encode(chunk)
            .map_err(frame_error)?;
        let msg = GssMessage::new(GssMessageType::Encapsulation, token);
        msg.write_to(raw).map_err(frame_error)?;
    }
    Ok(buf.len())
}

impl io::Read for GssStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        gss_read(&self.gssapi, &mut self.spill, &mut self.raw, buf)
    }
}

impl io::Write for GssStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        gss_write(&self.gssapi, &mut self.raw, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.raw.flush()
    }
}

impl ByteStream for GssStream {
    fn split(self: Box<Self>) -> io::Result<SplitStream> {
        let strm = *self;
        let raw = strm.raw.split()?;
        Ok(SplitStream {
            reader: Box::new(GssReadHalf {
                raw: raw.reader,
                gssapi: strm.gssapi.clone(),
                spill: strm.spill,
            }),
            writer: Box::new(GssWriteHalf {
                raw: raw.writer,
                gssapi: strm.gssapi,
            }),
            closer: raw.closer,
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.raw.local_addr()
    }

    fn with_idle_timeout(self: Box<Self>, _idle: Duration) -> BoxedStream {
        // the deadline belongs on the raw socket; the host installs it
        // before the wrapper is built
        self
    }
}

struct GssReadHalf {
    raw: Box<dyn io::Read + Send>,
    gssapi: SharedGssApi,
    spill: Vec<u8>,
}

impl io::Read for GssReadHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        gss_read(&self.gssapi, &mut self.spill, &mut self.raw, buf)
    }
}

struct GssWriteHalf {
    raw: Box<dyn io::Write + Send>,
    gssapi: SharedGssApi,
}

impl io::Write for GssWriteHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        gss_write(&self.gssapi, &mut self.raw, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.raw.flush()
    }
}
