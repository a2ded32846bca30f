use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

use crate::model::ConnectError;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Fail, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[fail(display = "io error")]
    Io,
    #[fail(display = "message format error: {}", message)]
    MessageFormat { message: String },
    #[fail(display = "invalid address type: {:#04x}", atyp)]
    InvalidAddressType { atyp: u8 },
    #[fail(display = "authentication error: general")]
    Authentication,
    #[fail(display = "authentication error: no acceptable method")]
    NoAcceptableMethod,
    #[fail(display = "authentication error: unrecognized username/password")]
    UnrecognizedUsernamePassword,
    #[fail(display = "command not supported: {:#04x}", cmd)]
    CommandNotSupported { cmd: u8 },
    #[fail(display = "bind not allowed: no bind callback configured")]
    BindNotAllowed,
    #[fail(display = "connect error: {}", error)]
    Connect { error: ConnectError },
    #[fail(display = "bound address not expressible: {}", message)]
    BoundAddress { message: String },
}

impl ErrorKind {
    pub fn message_fmt(message: fmt::Arguments) -> Self {
        ErrorKind::MessageFormat {
            message: message.to_string(),
        }
    }

    pub fn invalid_address_type(atyp: u8) -> Self {
        ErrorKind::InvalidAddressType { atyp }
    }

    pub fn command_not_supported(cmd: u8) -> Self {
        ErrorKind::CommandNotSupported { cmd }
    }

    pub fn connect(error: ConnectError) -> Self {
        ErrorKind::Connect { error }
    }

    pub fn bound_address(message: fmt::Arguments) -> Self {
        ErrorKind::BoundAddress {
            message: message.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl Error {
    pub fn new(inner: Context<ErrorKind>) -> Error {
        Error { inner }
    }

    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error { inner }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error {
            inner: error.context(ErrorKind::Io),
        }
    }
}
