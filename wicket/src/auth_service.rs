use std::fmt;
use std::io::Write;

use log::*;

use model::{Error, ErrorKind, GssMessageType, LoginStatus, Method};

use crate::byte_stream::BoxedStream;
use crate::gss::{BoxedGssApi, GssStream};
use crate::message::{GssMessage, LoginReply, LoginRequest};

/// Host-supplied username/password predicate (RFC 1929).
pub type Authenticator = Box<dyn Fn(&[u8], &[u8]) -> Result<(), Error> + Send + Sync>;

/// Host-supplied factory producing one GSS-API context per connection.
pub type GssApiFactory = Box<dyn Fn() -> Result<BoxedGssApi, Error> + Send + Sync>;

/// Negotiated authentication strategy.
///
/// `authenticate` runs the method's subnegotiation on `conn` and returns the
/// stream the rest of the session must use; a handler may hand back the same
/// stream or a wrapper that owns it. On failure the connection terminates;
/// the handler has already written whatever refusal frame its RFC requires.
pub trait AuthHandler: fmt::Debug + Send + Sync {
    fn method(&self) -> Method;
    fn authenticate(&self, conn: BoxedStream) -> Result<BoxedStream, Error>;
}

#[derive(Debug)]
pub struct NoAuthHandler;

impl AuthHandler for NoAuthHandler {
    fn method(&self) -> Method {
        Method::NoAuth
    }

    fn authenticate(&self, conn: BoxedStream) -> Result<BoxedStream, Error> {
        // pass through without any authentication
        Ok(conn)
    }
}

pub struct UserPassHandler {
    verify: Authenticator,
}

impl UserPassHandler {
    pub fn new(verify: Authenticator) -> Self {
        Self { verify }
    }
}

impl fmt::Debug for UserPassHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UserPassHandler")
    }
}

impl AuthHandler for UserPassHandler {
    fn method(&self) -> Method {
        Method::UserPass
    }

    fn authenticate(&self, mut conn: BoxedStream) -> Result<BoxedStream, Error> {
        let req = LoginRequest::read_from(&mut conn)?;
        req.validate()?;

        let verdict = (self.verify)(&req.username, &req.password);
        let status = match verdict {
            Ok(()) => LoginStatus::Success,
            Err(_) => LoginStatus::Failure,
        };
        // the reply goes out regardless of the verdict
        LoginReply::new(status).write_to(&mut conn)?;

        // a failure status MUST close the connection
        match verdict {
            Ok(()) => Ok(conn),
            Err(err) => {
                debug!("login denied: {}", err);
                Err(ErrorKind::UnrecognizedUsernamePassword.into())
            }
        }
    }
}

/// Refusal marker sent when the context establishment fails: subnegotiation
/// version 1, message type 0xff.
const GSS_REFUSE: [u8; 2] = [0x01, 0xff];

pub struct GssApiHandler {
    factory: GssApiFactory,
}

impl GssApiHandler {
    pub fn new(factory: GssApiFactory) -> Self {
        Self { factory }
    }
}

impl fmt::Debug for GssApiHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GssApiHandler")
    }
}

impl AuthHandler for GssApiHandler {
    fn method(&self) -> Method {
        Method::GssApi
    }

    fn authenticate(&self, mut conn: BoxedStream) -> Result<BoxedStream, Error> {
        let mut gssapi = (self.factory)()?;

        // context establishment: feed client tokens to accept_context until
        // the context completes or the server has nothing more to send
        loop {
            let msg = GssMessage::read_from(&mut conn)?;
            msg.validate(GssMessageType::Authentication)?;

            let accepted = match gssapi.accept_context(&msg.token) {
                Ok(accepted) => accepted,
                Err(err) => {
                    conn.write_all(&GSS_REFUSE)?;
                    return Err(err);
                }
            };

            let reply = GssMessage::new(GssMessageType::Authentication, accepted.token.clone());
            reply.write_to(&mut conn)?;

            if accepted.complete || accepted.token.is_empty() {
                break;
            }
        }

        // protection level agreement
        let msg = GssMessage::read_from(&mut conn)?;
        msg.validate(GssMessageType::ProtectionNegotiation)?;

        let data = gssapi.decode(&msg.token)?;
        if data.len() != 1 {
            return Err(
                ErrorKind::message_fmt(format_args!("invalid protection level token")).into(),
            );
        }

        let agreed = gssapi.accept_protection_level(data[0])?;
        debug!("gssapi protection level: {}", agreed);

        let token = gssapi.encode(&[agreed])?;
        GssMessage::new(GssMessageType::ProtectionNegotiation, token).write_to(&mut conn)?;

        // all subsequent traffic goes through the encapsulation
        Ok(Box::new(GssStream::new(conn, gssapi)))
    }
}
