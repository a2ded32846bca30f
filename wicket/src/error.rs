use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

use model::SocketAddr;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Fail, Debug, PartialEq)]
pub enum ErrorKind {
    #[fail(display = "io error")]
    Io,
    #[fail(display = "configuration error")]
    Config,
    #[fail(display = "no auth method is enabled")]
    NoAuthMethod,
    #[fail(display = "address already in use: {}", addr)]
    AddressAlreadyInUse { addr: SocketAddr },
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
