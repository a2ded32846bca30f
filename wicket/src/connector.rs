///! Default CONNECT backend: dial TCP and translate platform errors into
///! the categorised taxonomy so reply codes are correct by construction.
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str;
use std::time::Duration;

use lazy_static::lazy_static;
use log::*;
use net2::TcpStreamExt;

use model::{Address, ConnectError, IpAddr};

use crate::byte_stream::BoxedStream;
use crate::lru::SyncLru;

const MAX_DNS_CACHE_SIZE: usize = 3000;

lazy_static! {
    /// Resolver memo shared by every connection; the only process-wide state
    /// in the crate.
    static ref DNS_CACHE: SyncLru<String, Vec<IpAddr>> = SyncLru::new(MAX_DNS_CACHE_SIZE);
}

pub fn default_connect(addr: &Address, timeout: Duration) -> Result<BoxedStream, ConnectError> {
    let sock_addr = resolve(addr).map_err(|err| {
        debug!("resolve {}: {}", addr, err);
        ConnectError::HostUnreachable
    })?;

    let strm = TcpStream::connect_timeout(&sock_addr, timeout).map_err(categorise)?;

    // relayed links should die fast, not linger
    strm.set_keepalive(None).ok();
    strm.set_linger(Some(Duration::from_secs(0))).ok();

    Ok(Box::new(strm))
}

fn categorise(err: io::Error) -> ConnectError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ConnectError::ConnectionRefused,
        io::ErrorKind::HostUnreachable => ConnectError::HostUnreachable,
        io::ErrorKind::NetworkUnreachable => ConnectError::NetworkUnreachable,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectError::TtlExpired,
        _ => ConnectError::Other,
    }
}

fn resolve(addr: &Address) -> io::Result<SocketAddr> {
    match addr {
        Address::Ip(ip, port) => Ok(SocketAddr::new(*ip, *port)),
        Address::Domain(domain, port) => {
            let host = str::from_utf8(domain).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "domain name is not utf-8")
            })?;
            let ips = lookup(host, *port)?;
            // prefer IPv4, like most dual-stack dialers
            let ip = ips
                .iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| ips.first())
                .copied()
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("failed to resolve {:?}", host),
                    )
                })?;
            Ok(SocketAddr::new(ip, *port))
        }
    }
}

fn lookup(host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
    if let Some(ips) = DNS_CACHE.get(&host.to_owned()) {
        trace!("resolver cache hit: {}", host);
        return Ok(ips);
    }

    let ips: Vec<IpAddr> = (host, port).to_socket_addrs()?.map(|sa| sa.ip()).collect();
    if ips.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("failed to resolve {:?}", host),
        ));
    }

    DNS_CACHE.add(host.to_owned(), ips.clone());
    Ok(ips)
}
