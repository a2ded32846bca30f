use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use failure::Fail;
use log::*;

use crate::byte_stream::ByteStream;
use crate::error::{Error, ErrorKind};
use crate::timeout_stream::IdleStream;

#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    idle: Duration,
}

impl Iterator for TcpAcceptor {
    type Item = (IdleStream, SocketAddr);
    fn next(&mut self) -> Option<Self::Item> {
        match self.listener.accept() {
            Ok((strm, addr)) => Some((IdleStream::new(strm, self.idle), addr)),
            Err(err) => {
                error!("accept error: {}", err);
                None
            }
        }
    }
}

pub trait Binder {
    type Stream: ByteStream + 'static;
    type Iter: Iterator<Item = (Self::Stream, SocketAddr)> + Send + 'static;
    fn bind(&self, addr: SocketAddr) -> Result<Self::Iter, Error>;
}

/// Binds the daemon's listening socket; accepted client streams come back
/// already wrapped with the idle deadline.
pub struct TcpBinder {
    idle: Duration,
}

impl TcpBinder {
    pub fn new(idle: Duration) -> Self {
        Self { idle }
    }
}

impl Binder for TcpBinder {
    type Stream = IdleStream;
    type Iter = TcpAcceptor;
    fn bind(&self, addr: SocketAddr) -> Result<Self::Iter, Error> {
        let tcp = match addr {
            SocketAddr::V4(_) => net2::TcpBuilder::new_v4()?,
            SocketAddr::V6(_) => net2::TcpBuilder::new_v6()?,
        };
        let tcp = tcp
            .reuse_address(true)?
            .bind(&addr)
            .map_err(|err| addr_error(err, addr))?;
        Ok(TcpAcceptor {
            listener: tcp.listen(0)?,
            idle: self.idle,
        })
    }
}

fn addr_error(io_err: io::Error, addr: SocketAddr) -> Error {
    match io_err.kind() {
        io::ErrorKind::AddrInUse => ErrorKind::AddressAlreadyInUse { addr }.into(),
        _ => io_err.context(ErrorKind::Io).into(),
    }
}
