///! SOCKS5 message vocabulary shared between the wire codec and the engine.
///!
///! client            proxy            service
///!   |                 |                 |
///!   |---------------->|                 |
///!   |MethodRequest    |                 |
///!   |<----------------|                 |
///!   |      MethodReply|                 |
///!   |- - subnegotiation (RFC1929/1961)- |
///!   |---------------->|                 |
///!   |CommandRequest   |                 |
///!   |                 |---------------->|
///!   |<----------------|                 |
///!   |     CommandReply|                 |
///!   | - - - - - - - ->| - - - - - - - ->|
///!   |            [[ Relay ]]            |
///!   |<- - - - - - - - |< - - - - - - - -|
///!
use std::fmt;
pub use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use derive_more::{Display, From, Into};

/// Version octet carried by every top-level frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Into, From, Display)]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    pub const SOCKS5: ProtocolVersion = ProtocolVersion(5);
}

/// Version octet of every subnegotiation frame (RFC 1929 / RFC 1961).
pub const SUBNEGOTIATION_VERSION: u8 = 0x01;

/// Authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Method {
    /// No authentication
    NoAuth,
    /// GSSAPI
    GssApi,
    /// Authenticate with a username / password
    UserPass,
    /// IANA assigned method
    IanaAssigned(u8),
    /// Reserved for private methods
    Private(u8),
    /// No acceptable method (reply sentinel, never a request code)
    NoAcceptable,
}

impl Method {
    pub fn code(&self) -> u8 {
        use Method::*;
        match self {
            NoAuth => 0x00,
            GssApi => 0x01,
            UserPass => 0x02,
            IanaAssigned(c) => *c,
            Private(c) => *c,
            NoAcceptable => 0xff,
        }
    }
}

impl From<u8> for Method {
    fn from(code: u8) -> Self {
        use Method::*;
        match code {
            0x00 => NoAuth,
            0x01 => GssApi,
            0x02 => UserPass,
            0x03..=0x7f => IanaAssigned(code),
            0x80..=0xfe => Private(code),
            0xff => NoAcceptable,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Method::*;
        match self {
            NoAuth => write!(f, "No Authentication Required"),
            GssApi => write!(f, "GSSAPI"),
            UserPass => write!(f, "Username/Password"),
            IanaAssigned(c) => write!(f, "IANA Assigned: {:#x}", c),
            Private(c) => write!(f, "Private Method: {:#x}", c),
            NoAcceptable => write!(f, "No Acceptable Methods"),
        }
    }
}

/// Protocol commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
    /// Not defined by RFC 1928; kept so the engine can reply CommandNotSupported.
    Other(u8),
}

impl Command {
    pub fn code(&self) -> u8 {
        use Command::*;
        match self {
            Connect => 0x01,
            Bind => 0x02,
            UdpAssociate => 0x03,
            Other(c) => *c,
        }
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        use Command::*;
        match code {
            0x01 => Connect,
            0x02 => Bind,
            0x03 => UdpAssociate,
            c => Other(c),
        }
    }
}

/// ATYP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddrType {
    V4 = 0x01,
    Domain = 0x03,
    V6 = 0x04,
}

impl AddrType {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(AddrType::V4),
            0x03 => Some(AddrType::Domain),
            0x04 => Some(AddrType::V6),
            _ => None,
        }
    }
}

/// Destination or bound address together with its port.
///
/// Domain names are kept as the raw octets the client sent; they are only
/// interpreted as UTF-8 at the resolver boundary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Address {
    Ip(IpAddr, u16),
    Domain(Vec<u8>, u16),
}

impl Address {
    pub fn addr_type(&self) -> AddrType {
        match self {
            Address::Ip(IpAddr::V4(_), _) => AddrType::V4,
            Address::Ip(IpAddr::V6(_), _) => AddrType::V6,
            Address::Domain(..) => AddrType::Domain,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::Ip(_, port) => *port,
            Address::Domain(_, port) => *port,
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Ip(addr.ip(), addr.port())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Ip(ip, port) => write!(f, "{}:{}", ip, port),
            Address::Domain(domain, port) => {
                write!(f, "{}:{}", String::from_utf8_lossy(domain), port)
            }
        }
    }
}

/// Section 6. Replies > REP field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReplyStatus {
    Succeeded = 0x00,
    GeneralFailure = 0x01,
    NotAllowed = 0x02,
    NetworkUnreachable = 0x03,
    HostUnreachable = 0x04,
    ConnectionRefused = 0x05,
    TtlExpired = 0x06,
    CommandNotSupported = 0x07,
    AddrTypeNotSupported = 0x08,
}

impl ReplyStatus {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        use ReplyStatus::*;
        match code {
            0 => Some(Succeeded),
            1 => Some(GeneralFailure),
            2 => Some(NotAllowed),
            3 => Some(NetworkUnreachable),
            4 => Some(HostUnreachable),
            5 => Some(ConnectionRefused),
            6 => Some(TtlExpired),
            7 => Some(CommandNotSupported),
            8 => Some(AddrTypeNotSupported),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ReplyStatus::*;
        match self {
            Succeeded => write!(f, "succeeded"),
            GeneralFailure => write!(f, "general SOCKS server failure"),
            NotAllowed => write!(f, "connection not allowed by ruleset"),
            NetworkUnreachable => write!(f, "network unreachable"),
            HostUnreachable => write!(f, "host unreachable"),
            ConnectionRefused => write!(f, "connection refused"),
            TtlExpired => write!(f, "TTL expired"),
            CommandNotSupported => write!(f, "command not supported"),
            AddrTypeNotSupported => write!(f, "address type not supported"),
        }
    }
}

/// RFC 1929 STATUS octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoginStatus {
    Success = 0x00,
    Failure = 0xff,
}

impl LoginStatus {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// RFC 1961 message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GssMessageType {
    Authentication = 0x01,
    ProtectionNegotiation = 0x02,
    Encapsulation = 0x03,
}

impl GssMessageType {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Categorised failure of the host CONNECT callback.
///
/// Translating platform errors into these variants makes the reply code
/// correct by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectError {
    NotAllowed,
    HostUnreachable,
    NetworkUnreachable,
    ConnectionRefused,
    TtlExpired,
    Other,
}

impl From<&ConnectError> for ReplyStatus {
    fn from(err: &ConnectError) -> Self {
        use ConnectError::*;
        match err {
            NotAllowed => ReplyStatus::NotAllowed,
            HostUnreachable => ReplyStatus::HostUnreachable,
            NetworkUnreachable => ReplyStatus::NetworkUnreachable,
            ConnectionRefused => ReplyStatus::ConnectionRefused,
            TtlExpired => ReplyStatus::TtlExpired,
            Other => ReplyStatus::GeneralFailure,
        }
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConnectError::*;
        match self {
            NotAllowed => write!(f, "not allowed by ruleset"),
            HostUnreachable => write!(f, "host unreachable"),
            NetworkUnreachable => write!(f, "network unreachable"),
            ConnectionRefused => write!(f, "connection refused"),
            TtlExpired => write!(f, "ttl expired"),
            Other => write!(f, "general failure"),
        }
    }
}
