use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use log::*;

use model::Error;

use crate::byte_stream::{BoxedStream, StreamCloser};

/// Copy bytes between `client` and `target` until either side stops.
///
/// The outbound direction runs on its own thread while the incoming one runs
/// inline; whichever finishes first closes both streams through a one-shot
/// latch, which unblocks the other direction. Copy errors are terminal and
/// expected, so they are logged and swallowed. Returns once both directions
/// have stopped.
pub fn relay(client: BoxedStream, target: BoxedStream) -> Result<(), Error> {
    debug!("relay start");
    let client = client.split()?;
    let target = target.split()?;
    let latch = CloseLatch::new(client.closer, target.closer);

    let outbound = {
        let latch = latch.clone();
        let mut src = client.reader;
        let mut dst = target.writer;
        thread::Builder::new()
            .name("relay: outbound".into())
            .spawn(move || {
                copy_half("outbound", &mut *src, &mut *dst);
                latch.close();
            })?
    };

    let mut src = target.reader;
    let mut dst = client.writer;
    copy_half("incoming", &mut *src, &mut *dst);
    latch.close();

    outbound.join().ok();
    debug!("relay done");
    Ok(())
}

fn copy_half(name: &str, src: &mut (dyn io::Read + Send), dst: &mut (dyn io::Write + Send)) {
    match io::copy(src, dst) {
        Ok(size) => trace!("relay ({}): {} bytes", name, size),
        Err(err) => match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                debug!("relay ({}): idle deadline", name)
            }
            _ => debug!("relay ({}): {}", name, err),
        },
    }
}

/// Closes both streams exactly once, no matter how many directions report.
#[derive(Clone)]
struct CloseLatch {
    closers: Arc<Mutex<Option<(Box<dyn StreamCloser>, Box<dyn StreamCloser>)>>>,
}

impl CloseLatch {
    fn new(a: Box<dyn StreamCloser>, b: Box<dyn StreamCloser>) -> Self {
        Self {
            closers: Arc::new(Mutex::new(Some((a, b)))),
        }
    }

    fn close(&self) {
        let taken = match self.closers.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some((a, b)) = taken {
            a.close().ok();
            b.close().ok();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::byte_stream::test::BufferStream;
    use crate::byte_stream::{ByteStream, SplitStream};
    use std::net::SocketAddr;
    use std::time::Duration;

    #[test]
    fn copies_both_directions() {
        let client = BufferStream::with_buffer(b"from client".to_vec());
        let target = BufferStream::with_buffer(b"from target".to_vec());
        let (client_probe, target_probe) = (client.clone(), target.clone());

        relay(Box::new(client), Box::new(target)).unwrap();

        assert_eq!(target_probe.output(), b"from client");
        assert_eq!(client_probe.output(), b"from target");
    }

    #[test]
    fn closes_each_stream_exactly_once() {
        let client = BufferStream::new();
        let target = BufferStream::new();
        let (client_probe, target_probe) = (client.clone(), target.clone());

        relay(Box::new(client), Box::new(target)).unwrap();

        assert_eq!(client_probe.close_count(), 1);
        assert_eq!(target_probe.close_count(), 1);
        assert!(client_probe.is_closed());
        assert!(target_probe.is_closed());
    }

    /// Stream whose reads fail immediately; its peer still gets closed once.
    #[derive(Debug)]
    struct FailingStream {
        inner: BufferStream,
    }

    impl io::Read for FailingStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    impl io::Write for FailingStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteStream for FailingStream {
        fn split(self: Box<Self>) -> io::Result<SplitStream> {
            let halves = Box::new(self.inner.clone()).split()?;
            Ok(SplitStream {
                reader: Box::new(FailingStream {
                    inner: self.inner.clone(),
                }),
                writer: halves.writer,
                closer: halves.closer,
            })
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            self.inner.local_addr()
        }

        fn with_idle_timeout(self: Box<Self>, _idle: Duration) -> BoxedStream {
            self
        }
    }

    #[test]
    fn one_erroring_direction_still_closes_both_once() {
        let client = BufferStream::with_buffer(b"payload".to_vec());
        let failing_inner = BufferStream::new();
        let target = FailingStream {
            inner: failing_inner.clone(),
        };
        let client_probe = client.clone();

        relay(Box::new(client), Box::new(target)).unwrap();

        assert_eq!(client_probe.close_count(), 1);
        assert_eq!(failing_inner.close_count(), 1);
    }
}
