///! RFC 1928/1929/1961 wire frames.
///!
///! Every frame decodes with `read_from`, encodes with `write_to` and is
///! checked by a separate `validate` step right after decoding. All
///! multi-byte integers are big-endian.
use std::io;
use std::slice;

use log::*;

use model::{
    AddrType, Address, Command, Error, ErrorKind, GssMessageType, IpAddr, Ipv4Addr, Ipv6Addr,
    LoginStatus, Method, ProtocolVersion, ReplyStatus, SUBNEGOTIATION_VERSION,
};

pub const RESERVED: u8 = 0x00;

/// Largest token that fits the 2-byte length field of a GSS message.
pub const GSS_MAX_TOKEN_SIZE: usize = (1 << 16) - 1;

trait ReadSocksExt {
    fn read_u8(&mut self) -> Result<u8, Error>;
    fn read_u16(&mut self) -> Result<u16, Error>;
    fn read_version(&mut self) -> Result<ProtocolVersion, Error>;
    fn read_methods(&mut self, nmethods: usize) -> Result<Vec<Method>, Error>;
    fn read_address(&mut self) -> Result<Address, Error>;
}

trait WriteSocksExt {
    fn write_u8(&mut self, v: u8) -> Result<(), Error>;
    fn write_u16(&mut self, v: u16) -> Result<(), Error>;
    fn write_version(&mut self, version: ProtocolVersion) -> Result<(), Error>;
    fn write_methods(&mut self, methods: &[Method]) -> Result<(), Error>;
    fn write_address(&mut self, addr: &Address) -> Result<(), Error>;
}

impl<T> ReadSocksExt for T
where
    T: io::Read,
{
    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }

    fn read_version(&mut self) -> Result<ProtocolVersion, Error> {
        Ok(self.read_u8()?.into())
    }

    fn read_methods(&mut self, nmethods: usize) -> Result<Vec<Method>, Error> {
        let mut methods = vec![0u8; nmethods];
        self.read_exact(&mut methods)?;
        Ok(methods.into_iter().map(Into::into).collect())
    }

    /// ATYP octet followed by the address bytes and the port.
    ///
    /// An unknown ATYP aborts the read before any address byte is consumed;
    /// the rest of the stream cannot be framed.
    fn read_address(&mut self) -> Result<Address, Error> {
        let atyp = self.read_u8()?;
        let atyp =
            AddrType::from_u8(atyp).ok_or_else(|| ErrorKind::invalid_address_type(atyp))?;
        match atyp {
            AddrType::V4 => {
                let mut buf = [0u8; 4];
                self.read_exact(&mut buf)?;
                let port = self.read_u16()?;
                Ok(Address::Ip(
                    Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]).into(),
                    port,
                ))
            }
            AddrType::Domain => {
                let len = self.read_u8()? as usize;
                let mut buf = vec![0u8; len];
                self.read_exact(&mut buf)?;
                let port = self.read_u16()?;
                Ok(Address::Domain(buf, port))
            }
            AddrType::V6 => {
                let mut buf = [0u8; 16];
                self.read_exact(&mut buf)?;
                let port = self.read_u16()?;
                Ok(Address::Ip(Ipv6Addr::from(buf).into(), port))
            }
        }
    }
}

impl<T> WriteSocksExt for T
where
    T: io::Write,
{
    fn write_u8(&mut self, v: u8) -> Result<(), Error> {
        self.write_all(slice::from_ref(&v))?;
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), Error> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_version(&mut self, version: ProtocolVersion) -> Result<(), Error> {
        self.write_u8(version.into())
    }

    fn write_methods(&mut self, methods: &[Method]) -> Result<(), Error> {
        if methods.len() > 255 {
            return Err(ErrorKind::message_fmt(format_args!(
                "too many methods: {}",
                methods.len()
            ))
            .into());
        }
        self.write_u8(methods.len() as u8)?;
        let codes: Vec<u8> = methods.iter().map(Method::code).collect();
        self.write_all(&codes)?;
        Ok(())
    }

    fn write_address(&mut self, addr: &Address) -> Result<(), Error> {
        self.write_u8(addr.addr_type().code())?;
        match addr {
            Address::Ip(IpAddr::V4(ip), _) => self.write_all(&ip.octets())?,
            Address::Ip(IpAddr::V6(ip), _) => self.write_all(&ip.octets())?,
            Address::Domain(domain, _) => {
                // a domain that cannot be length-prefixed has no valid ATYP
                if domain.is_empty() || domain.len() > 255 {
                    return Err(ErrorKind::invalid_address_type(AddrType::Domain.code()).into());
                }
                self.write_u8(domain.len() as u8)?;
                self.write_all(domain)?;
            }
        }
        self.write_u16(addr.port())
    }
}

fn validate_version(version: ProtocolVersion) -> Result<(), Error> {
    if version != ProtocolVersion::SOCKS5 {
        return Err(
            ErrorKind::message_fmt(format_args!("unsupported protocol version: {}", version))
                .into(),
        );
    }
    Ok(())
}

fn validate_subnegotiation_version(version: u8) -> Result<(), Error> {
    if version != SUBNEGOTIATION_VERSION {
        return Err(ErrorKind::message_fmt(format_args!(
            "unsupported subnegotiation version: {}",
            version
        ))
        .into());
    }
    Ok(())
}

/// Method negotiation request: `VER NMETHODS METHODS...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequest {
    pub version: ProtocolVersion,
    pub methods: Vec<Method>,
}

impl MethodRequest {
    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_version()?;
        let nmethods = r.read_u8()?;
        let methods = r.read_methods(nmethods as usize)?;
        trace!("method request: {:?}", methods);
        Ok(Self { version, methods })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        w.write_version(self.version)?;
        w.write_methods(&self.methods)
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_version(self.version)?;
        if self.methods.is_empty() {
            return Err(ErrorKind::message_fmt(format_args!("empty method list")).into());
        }
        Ok(())
    }
}

/// Method negotiation reply: `VER METHOD`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodReply {
    pub version: ProtocolVersion,
    pub method: Method,
}

impl MethodReply {
    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_version()?;
        let method = r.read_u8()?.into();
        Ok(Self { version, method })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        let buf = [self.version.into(), self.method.code()];
        w.write_all(&buf)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_version(self.version)
    }
}

/// Command request: `VER CMD RSV ATYP DST.ADDR DST.PORT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub version: ProtocolVersion,
    pub command: Command,
    pub rsv: u8,
    pub dst: Address,
}

impl CommandRequest {
    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_version()?;
        let command = r.read_u8()?.into();
        let rsv = r.read_u8()?;
        let dst = r.read_address()?;
        trace!("command request: {:?} {}", command, dst);
        Ok(Self {
            version,
            command,
            rsv,
            dst,
        })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        w.write_version(self.version)?;
        w.write_u8(self.command.code())?;
        w.write_u8(self.rsv)?;
        w.write_address(&self.dst)
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_version(self.version)?;
        if self.rsv != RESERVED {
            return Err(
                ErrorKind::message_fmt(format_args!("reserved octet is not 0: {}", self.rsv))
                    .into(),
            );
        }
        if let Address::Domain(domain, _) = &self.dst {
            if domain.is_empty() {
                return Err(ErrorKind::message_fmt(format_args!("empty domain name")).into());
            }
        }
        if self.dst.port() == 0 {
            return Err(ErrorKind::message_fmt(format_args!("destination port is 0")).into());
        }
        Ok(())
    }
}

/// Command reply: `VER REP RSV ATYP BND.ADDR BND.PORT`
///
/// On failure paths the engine echoes the client-supplied address, so the
/// reply is syntactically valid regardless of the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub version: ProtocolVersion,
    pub status: ReplyStatus,
    pub rsv: u8,
    pub bnd: Address,
}

impl CommandReply {
    pub fn new(status: ReplyStatus, bnd: Address) -> Self {
        Self {
            version: ProtocolVersion::SOCKS5,
            status,
            rsv: RESERVED,
            bnd,
        }
    }

    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_version()?;
        let status = r.read_u8()?;
        let status = ReplyStatus::from_u8(status)
            .ok_or_else(|| ErrorKind::message_fmt(format_args!("unknown reply: {}", status)))?;
        let rsv = r.read_u8()?;
        let bnd = r.read_address()?;
        Ok(Self {
            version,
            status,
            rsv,
            bnd,
        })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        trace!("command reply: {:?} {}", self.status, self.bnd);
        let mut buf = Vec::with_capacity(22);
        buf.write_version(self.version)?;
        buf.write_u8(self.status.code())?;
        buf.write_u8(self.rsv)?;
        buf.write_address(&self.bnd)?;
        w.write_all(&buf)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_version(self.version)?;
        if self.rsv != RESERVED {
            return Err(
                ErrorKind::message_fmt(format_args!("reserved octet is not 0: {}", self.rsv))
                    .into(),
            );
        }
        Ok(())
    }
}

/// RFC 1929 username/password request: `VER ULEN UNAME PLEN PASSWD`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub version: u8,
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl LoginRequest {
    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_u8()?;
        let ulen = r.read_u8()? as usize;
        let mut username = vec![0u8; ulen];
        r.read_exact(&mut username)?;
        let plen = r.read_u8()? as usize;
        let mut password = vec![0u8; plen];
        r.read_exact(&mut password)?;
        Ok(Self {
            version,
            username,
            password,
        })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        if self.username.len() > 255 || self.password.len() > 255 {
            return Err(ErrorKind::message_fmt(format_args!(
                "credential longer than 255 octets"
            ))
            .into());
        }
        w.write_u8(self.version)?;
        w.write_u8(self.username.len() as u8)?;
        w.write_all(&self.username)?;
        w.write_u8(self.password.len() as u8)?;
        w.write_all(&self.password)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_subnegotiation_version(self.version)?;
        if self.username.is_empty() {
            return Err(ErrorKind::message_fmt(format_args!("empty username")).into());
        }
        if self.password.is_empty() {
            return Err(ErrorKind::message_fmt(format_args!("empty password")).into());
        }
        Ok(())
    }
}

/// RFC 1929 reply: `VER STATUS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginReply {
    pub version: u8,
    pub status: LoginStatus,
}

impl LoginReply {
    pub fn new(status: LoginStatus) -> Self {
        Self {
            version: SUBNEGOTIATION_VERSION,
            status,
        }
    }

    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_u8()?;
        let status = match r.read_u8()? {
            0x00 => LoginStatus::Success,
            0xff => LoginStatus::Failure,
            other => {
                return Err(
                    ErrorKind::message_fmt(format_args!("unknown login status: {}", other)).into(),
                )
            }
        };
        Ok(Self { version, status })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        let buf = [self.version, self.status.code()];
        w.write_all(&buf)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_subnegotiation_version(self.version)
    }
}

/// RFC 1961 message: `VER MTYP LEN TOKEN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GssMessage {
    pub version: u8,
    pub mtype: u8,
    pub token: Vec<u8>,
}

impl GssMessage {
    pub fn new(mtype: GssMessageType, token: Vec<u8>) -> Self {
        Self {
            version: SUBNEGOTIATION_VERSION,
            mtype: mtype.code(),
            token,
        }
    }

    pub fn read_from<R: io::Read>(r: &mut R) -> Result<Self, Error> {
        let version = r.read_u8()?;
        let mtype = r.read_u8()?;
        let len = r.read_u16()? as usize;
        let mut token = vec![0u8; len];
        r.read_exact(&mut token)?;
        Ok(Self {
            version,
            mtype,
            token,
        })
    }

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        if self.token.len() > GSS_MAX_TOKEN_SIZE {
            return Err(ErrorKind::message_fmt(format_args!(
                "token too large: {}",
                self.token.len()
            ))
            .into());
        }
        w.write_u8(self.version)?;
        w.write_u8(self.mtype)?;
        w.write_u16(self.token.len() as u16)?;
        w.write_all(&self.token)?;
        Ok(())
    }

    pub fn validate(&self, expected: GssMessageType) -> Result<(), Error> {
        validate_subnegotiation_version(self.version)?;
        if self.mtype != expected.code() {
            return Err(ErrorKind::message_fmt(format_args!(
                "unexpected gssapi message type: {} (want {})",
                self.mtype,
                expected.code()
            ))
            .into());
        }
        if self.token.len() > GSS_MAX_TOKEN_SIZE {
            return Err(ErrorKind::message_fmt(format_args!(
                "token too large: {}",
                self.token.len()
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn decode<T, F>(bytes: &[u8], read: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Cursor<&[u8]>) -> Result<T, Error>,
    {
        let mut cursor = Cursor::new(bytes);
        read(&mut cursor)
    }

    fn encode<F>(write: F) -> Vec<u8>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), Error>,
    {
        let mut buf = vec![];
        write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn method_request_literal() {
        let req = decode(&[0x05, 0x01, 0x00], |c| MethodRequest::read_from(c)).unwrap();
        assert_eq!(req.version, 5.into());
        assert_eq!(req.methods, vec![Method::NoAuth]);
        req.validate().unwrap();
        assert_eq!(encode(|b| req.write_to(b)), vec![0x05, 0x01, 0x00]);
    }

    #[test]
    fn method_request_full_code_space() {
        let bytes = [0x05, 0x06, 0x00, 0x01, 0x02, 0x6a, 0xef, 0xff];
        let req = decode(&bytes, |c| MethodRequest::read_from(c)).unwrap();
        assert_eq!(
            req.methods,
            vec![
                Method::NoAuth,
                Method::GssApi,
                Method::UserPass,
                Method::IanaAssigned(0x6a),
                Method::Private(0xef),
                Method::NoAcceptable,
            ]
        );
        assert_eq!(encode(|b| req.write_to(b)), bytes.to_vec());
    }

    #[test]
    fn method_request_empty_method_list() {
        let req = decode(&[0x05, 0x00], |c| MethodRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn method_request_bad_version() {
        let req = decode(&[0x04, 0x01, 0x00], |c| MethodRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn method_reply_round_trip() {
        for method in &[Method::NoAuth, Method::UserPass, Method::NoAcceptable] {
            let reply = MethodReply {
                version: ProtocolVersion::SOCKS5,
                method: *method,
            };
            let bytes = encode(|b| reply.write_to(b));
            assert_eq!(bytes, vec![0x05, method.code()]);
            let back = decode(&bytes, |c| MethodReply::read_from(c)).unwrap();
            assert_eq!(back, reply);
        }
    }

    #[test]
    fn command_request_literal_ipv4() {
        let bytes = [0x05, 0x01, 0x00, 0x01, 0xc0, 0xa8, 0x00, 0x01, 0x00, 0x77];
        let req = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        req.validate().unwrap();
        assert_eq!(req.command, Command::Connect);
        assert_eq!(req.dst, Address::Ip("192.168.0.1".parse().unwrap(), 119));
        assert_eq!(encode(|b| req.write_to(b)), bytes.to_vec());
    }

    #[test]
    fn command_request_domain_and_ipv6() {
        let mut bytes = vec![0x05, 0x01, 0x00, 0x03, 0x0b];
        bytes.extend_from_slice(b"example.com");
        bytes.extend_from_slice(&[0x1f, 0x90]);
        let req = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        req.validate().unwrap();
        assert_eq!(req.dst, Address::Domain(b"example.com".to_vec(), 8080));
        assert_eq!(encode(|b| req.write_to(b)), bytes);

        let ip6: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut bytes = vec![0x05, 0x02, 0x00, 0x04];
        bytes.extend_from_slice(&ip6.octets());
        bytes.extend_from_slice(&[0xff, 0xff]);
        let req = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        req.validate().unwrap();
        assert_eq!(req.command, Command::Bind);
        assert_eq!(req.dst, Address::Ip(ip6.into(), 65535));
        assert_eq!(encode(|b| req.write_to(b)), bytes);
    }

    #[test]
    fn ipv4_mapped_ipv6_stays_sixteen_bytes() {
        // no normalisation: ATYP follows the wire length, not the content
        let mapped: Ipv6Addr = "::ffff:192.168.0.1".parse().unwrap();
        let reply = CommandReply::new(ReplyStatus::Succeeded, Address::Ip(mapped.into(), 119));
        let bytes = encode(|b| reply.write_to(b));
        assert_eq!(bytes[3], AddrType::V6.code());
        assert_eq!(bytes.len(), 4 + 16 + 2);
        let back = decode(&bytes, |c| CommandReply::read_from(c)).unwrap();
        assert_eq!(back.bnd, Address::Ip(IpAddr::V6(mapped), 119));
    }

    #[test]
    fn command_request_max_domain() {
        let domain = vec![b'a'; 255];
        let req = CommandRequest {
            version: ProtocolVersion::SOCKS5,
            command: Command::Connect,
            rsv: RESERVED,
            dst: Address::Domain(domain.clone(), 443),
        };
        req.validate().unwrap();
        let bytes = encode(|b| req.write_to(b));
        assert_eq!(bytes.len(), 4 + 1 + 255 + 2);
        let back = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn command_request_unknown_address_type() {
        let bytes = [0x05, 0x01, 0x00, 0x22, 0xc0, 0xa8, 0x00, 0x01, 0x00, 0x77];
        let err = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::invalid_address_type(0x22));
    }

    #[test]
    fn command_request_rejects_zero_port() {
        let bytes = [0x05, 0x01, 0x00, 0x01, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x00];
        let req = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn command_request_rejects_nonzero_rsv() {
        let bytes = [0x05, 0x01, 0x01, 0x01, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x50];
        let req = decode(&bytes, |c| CommandRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn command_request_truncated_at_every_boundary() {
        let bytes = [0x05, 0x01, 0x00, 0x01, 0xc0, 0xa8, 0x00, 0x01, 0x00, 0x77];
        for len in 0..bytes.len() {
            assert!(
                decode(&bytes[..len], |c| CommandRequest::read_from(c)).is_err(),
                "decode must fail with {} bytes",
                len
            );
        }
    }

    #[test]
    fn command_reply_success_literal() {
        let reply = CommandReply::new(
            ReplyStatus::Succeeded,
            Address::Ip("10.0.0.1".parse().unwrap(), 1080),
        );
        assert_eq!(
            encode(|b| reply.write_to(b)),
            vec![0x05, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x01, 0x04, 0x38]
        );
    }

    #[test]
    fn command_reply_round_trip() {
        let replies = vec![
            CommandReply::new(
                ReplyStatus::HostUnreachable,
                Address::Ip("2001:db8::2".parse().unwrap(), 65535),
            ),
            CommandReply::new(
                ReplyStatus::NotAllowed,
                Address::Domain(b"example.com".to_vec(), 8335),
            ),
        ];
        for reply in replies {
            let bytes = encode(|b| reply.write_to(b));
            let back = decode(&bytes, |c| CommandReply::read_from(c)).unwrap();
            back.validate().unwrap();
            assert_eq!(back, reply);
        }
    }

    #[test]
    fn command_reply_refuses_unframeable_domain() {
        let reply = CommandReply::new(ReplyStatus::Succeeded, Address::Domain(vec![], 80));
        let err = reply.write_to(&mut vec![]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::invalid_address_type(AddrType::Domain.code())
        );

        let reply =
            CommandReply::new(ReplyStatus::Succeeded, Address::Domain(vec![b'x'; 256], 80));
        let err = reply.write_to(&mut vec![]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::invalid_address_type(AddrType::Domain.code())
        );
    }

    #[test]
    fn login_request_literal() {
        let bytes = [0x01, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r'];
        let req = decode(&bytes, |c| LoginRequest::read_from(c)).unwrap();
        req.validate().unwrap();
        assert_eq!(req.username, b"foo");
        assert_eq!(req.password, b"bar");
        assert_eq!(encode(|b| req.write_to(b)), bytes.to_vec());
    }

    #[test]
    fn login_request_credential_bounds() {
        for (user, pass) in &[
            (vec![b'u'], vec![b'p']),
            (vec![b'u'; 255], vec![b'p'; 255]),
        ] {
            let req = LoginRequest {
                version: SUBNEGOTIATION_VERSION,
                username: user.clone(),
                password: pass.clone(),
            };
            req.validate().unwrap();
            let bytes = encode(|b| req.write_to(b));
            let back = decode(&bytes, |c| LoginRequest::read_from(c)).unwrap();
            assert_eq!(back, req);
        }
    }

    #[test]
    fn login_request_rejects_empty_credentials() {
        let req = decode(&[0x01, 0x00, 0x01, b'p'], |c| LoginRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());

        let req = decode(&[0x01, 0x01, b'u', 0x00], |c| LoginRequest::read_from(c)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_request_rejects_bad_subversion() {
        let req = decode(&[0x05, 0x01, b'u', 0x01, b'p'], |c| {
            LoginRequest::read_from(c)
        })
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_reply_literals() {
        assert_eq!(
            encode(|b| LoginReply::new(LoginStatus::Success).write_to(b)),
            vec![0x01, 0x00]
        );
        assert_eq!(
            encode(|b| LoginReply::new(LoginStatus::Failure).write_to(b)),
            vec![0x01, 0xff]
        );
        let back = decode(&[0x01, 0xff], |c| LoginReply::read_from(c)).unwrap();
        assert_eq!(back.status, LoginStatus::Failure);
    }

    #[test]
    fn gss_message_token_bounds() {
        for len in &[0usize, 1, GSS_MAX_TOKEN_SIZE] {
            let msg = GssMessage::new(GssMessageType::Authentication, vec![0xab; *len]);
            msg.validate(GssMessageType::Authentication).unwrap();
            let bytes = encode(|b| msg.write_to(b));
            assert_eq!(bytes.len(), 4 + len);
            let back = decode(&bytes, |c| GssMessage::read_from(c)).unwrap();
            assert_eq!(back, msg);
        }

        let msg = GssMessage::new(GssMessageType::Encapsulation, vec![0; GSS_MAX_TOKEN_SIZE + 1]);
        assert!(msg.write_to(&mut vec![]).is_err());
    }

    #[test]
    fn gss_message_validate_checks_type_and_version() {
        let msg = GssMessage::new(GssMessageType::Authentication, vec![1, 2, 3]);
        assert!(msg.validate(GssMessageType::ProtectionNegotiation).is_err());

        let msg = GssMessage {
            version: 0x05,
            mtype: GssMessageType::Authentication.code(),
            token: vec![],
        };
        assert!(msg.validate(GssMessageType::Authentication).is_err());
    }
}
