use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::byte_stream::{BoxedStream, ByteStream, SplitStream, TcpCloser};

/// TCP stream with an idle deadline: every read and write pushes the
/// socket's read/write deadline out to `now + idle`, so a connection dies
/// only when neither side has transferred anything for the whole window.
#[derive(Debug)]
pub struct IdleStream {
    strm: TcpStream,
    idle: Duration,
}

impl IdleStream {
    pub fn new(strm: TcpStream, idle: Duration) -> Self {
        Self { strm, idle }
    }

    pub fn into_inner(self) -> TcpStream {
        self.strm
    }

    fn refresh_deadline(&self) {
        // failure to arm the deadline must not kill the transfer
        self.strm.set_read_timeout(Some(self.idle)).ok();
        self.strm.set_write_timeout(Some(self.idle)).ok();
    }
}

impl io::Read for IdleStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.refresh_deadline();
        self.strm.read(buf)
    }
}

impl io::Write for IdleStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.refresh_deadline();
        self.strm.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.strm.flush()
    }
}

impl ByteStream for IdleStream {
    fn split(self: Box<Self>) -> io::Result<SplitStream> {
        let rd = self.strm.try_clone()?;
        let wr = self.strm.try_clone()?;
        Ok(SplitStream {
            reader: Box::new(IdleStream::new(rd, self.idle)),
            writer: Box::new(IdleStream::new(wr, self.idle)),
            closer: Box::new(TcpCloser::new(self.strm)),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.strm.local_addr()
    }

    fn with_idle_timeout(self: Box<Self>, idle: Duration) -> BoxedStream {
        Box::new(IdleStream::new(self.strm, idle))
    }
}
