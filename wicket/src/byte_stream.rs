use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use crate::timeout_stream::IdleStream;

/// read/write operations on a byte stream
///
/// The engine owns exactly one of these per connection; an auth handler may
/// replace it with a wrapper that owns the original.
pub trait ByteStream: fmt::Debug + io::Read + io::Write + Send {
    /// Split into independently owned halves for the relay, plus a closer
    /// that unblocks the peer half.
    fn split(self: Box<Self>) -> io::Result<SplitStream>;

    /// Local address of the underlying socket, used for bound-address
    /// reporting in command replies.
    fn local_addr(&self) -> io::Result<SocketAddr> {
        Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "stream is not bound to a socket address",
        ))
    }

    /// Wrap with an idle deadline when the stream supports one.
    /// Non-socket streams return themselves unchanged.
    fn with_idle_timeout(self: Box<Self>, idle: Duration) -> BoxedStream;
}

pub type BoxedStream = Box<dyn ByteStream>;

/// Closes the underlying transport. `close` must be safe to call from a
/// thread other than the one blocked on the stream.
pub trait StreamCloser: Send {
    fn close(&self) -> io::Result<()>;
}

/// Owned halves of a split stream.
pub struct SplitStream {
    pub reader: Box<dyn io::Read + Send>,
    pub writer: Box<dyn io::Write + Send>,
    pub closer: Box<dyn StreamCloser>,
}

/// Listening socket supplied by the host for the BIND command.
/// Closing is dropping.
pub trait Listener: Send {
    fn local_addr(&self) -> io::Result<SocketAddr>;
    fn accept(&self) -> io::Result<(BoxedStream, SocketAddr)>;
}

impl Listener for TcpListener {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    fn accept(&self) -> io::Result<(BoxedStream, SocketAddr)> {
        let (strm, peer) = TcpListener::accept(self)?;
        Ok((Box::new(strm), peer))
    }
}

/// byte stream on tcp connection
impl ByteStream for TcpStream {
    fn split(self: Box<Self>) -> io::Result<SplitStream> {
        let rd = self.try_clone()?;
        let wr = self.try_clone()?;
        Ok(SplitStream {
            reader: Box::new(rd),
            writer: Box::new(wr),
            closer: Box::new(TcpCloser(*self)),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn with_idle_timeout(self: Box<Self>, idle: Duration) -> BoxedStream {
        Box::new(IdleStream::new(*self, idle))
    }
}

pub(crate) struct TcpCloser(TcpStream);

impl TcpCloser {
    pub(crate) fn new(strm: TcpStream) -> Self {
        TcpCloser(strm)
    }
}

impl StreamCloser for TcpCloser {
    fn close(&self) -> io::Result<()> {
        self.0.shutdown(Shutdown::Both)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::io::{Read, Write};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};

    /// In-memory stream: reads drain `rd_buff`, writes append to `wr_buff`.
    /// Clones share both buffers so a test can inspect what the engine wrote.
    #[derive(Debug, Clone)]
    pub struct BufferStream {
        rd_buff: Arc<Mutex<io::Cursor<Vec<u8>>>>,
        wr_buff: Arc<Mutex<io::Cursor<Vec<u8>>>>,
        closed: Arc<AtomicBool>,
        close_count: Arc<AtomicUsize>,
        local_addr: Option<SocketAddr>,
    }

    impl BufferStream {
        pub fn new() -> Self {
            Self::with_buffer(vec![])
        }

        pub fn with_buffer(input: Vec<u8>) -> Self {
            Self {
                rd_buff: Arc::new(Mutex::new(io::Cursor::new(input))),
                wr_buff: Arc::new(Mutex::new(io::Cursor::new(vec![]))),
                closed: Arc::new(AtomicBool::new(false)),
                close_count: Arc::new(AtomicUsize::new(0)),
                local_addr: None,
            }
        }

        pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
            self.local_addr = Some(addr);
            self
        }

        pub fn rd_buff(&self) -> MutexGuard<io::Cursor<Vec<u8>>> {
            self.rd_buff.lock().unwrap()
        }

        pub fn wr_buff(&self) -> MutexGuard<io::Cursor<Vec<u8>>> {
            self.wr_buff.lock().unwrap()
        }

        /// everything written to this stream so far
        pub fn output(&self) -> Vec<u8> {
            self.wr_buff().get_ref().clone()
        }

        pub fn close_count(&self) -> usize {
            self.close_count.load(Ordering::SeqCst)
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl io::Read for BufferStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.rd_buff.lock().unwrap().read(buf)
        }
    }

    impl io::Write for BufferStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.wr_buff.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BufferCloser {
        closed: Arc<AtomicBool>,
        close_count: Arc<AtomicUsize>,
    }

    impl StreamCloser for BufferCloser {
        fn close(&self) -> io::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            self.close_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ByteStream for BufferStream {
        fn split(self: Box<Self>) -> io::Result<SplitStream> {
            let closer = BufferCloser {
                closed: self.closed.clone(),
                close_count: self.close_count.clone(),
            };
            Ok(SplitStream {
                reader: Box::new(self.clone()),
                writer: Box::new(*self),
                closer: Box::new(closer),
            })
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            self.local_addr.ok_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "buffer stream")
            })
        }

        fn with_idle_timeout(self: Box<Self>, _idle: Duration) -> BoxedStream {
            self
        }
    }
}
