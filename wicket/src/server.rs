///! Public API: per-connection [`Handler`] and the accept-loop [`Server`].
use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::*;

use model::{Address, ConnectError, Method};

use crate::acceptor::{Binder, TcpBinder};
use crate::auth_service::{
    AuthHandler, Authenticator, GssApiFactory, GssApiHandler, NoAuthHandler, UserPassHandler,
};
use crate::byte_stream::{BoxedStream, ByteStream, Listener};
use crate::config::ServerConfig;
use crate::connector;
use crate::error::{Error, ErrorKind};
use crate::server_command::ServerCommand;
use crate::session;

pub const DEFAULT_MAX_CONN_IDLE: Duration = Duration::from_secs(3 * 60);

/// Host CONNECT callback: dial the destination, or say precisely why not.
pub type ConnectFn = Box<dyn Fn(&Address) -> Result<BoxedStream, ConnectError> + Send + Sync>;

/// Host BIND callback: open a listener for one inbound connection.
pub type BindFn = Box<dyn Fn() -> Result<Box<dyn Listener>, model::Error> + Send + Sync>;

pub struct Options {
    /// accept clients that only offer the no-auth method
    pub allow_no_auth: bool,
    /// enables username/password authentication when set
    pub authenticate: Option<Authenticator>,
    /// enables GSS-API authentication when set
    pub gssapi: Option<GssApiFactory>,
    /// CONNECT backend; defaults to a TCP dialer with errno translation
    pub connect: Option<ConnectFn>,
    /// BIND backend; the command is refused when absent
    pub bind: Option<BindFn>,
    pub max_conn_idle: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            allow_no_auth: false,
            authenticate: None,
            gssapi: None,
            connect: None,
            bind: None,
            max_conn_idle: DEFAULT_MAX_CONN_IDLE,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Options")
            .field("allow_no_auth", &self.allow_no_auth)
            .field("authenticate", &self.authenticate.is_some())
            .field("gssapi", &self.gssapi.is_some())
            .field("connect", &self.connect.is_some())
            .field("bind", &self.bind.is_some())
            .field("max_conn_idle", &self.max_conn_idle)
            .finish()
    }
}

fn auth_handlers(
    allow_no_auth: bool,
    authenticate: Option<Authenticator>,
    gssapi: Option<GssApiFactory>,
) -> BTreeMap<Method, Box<dyn AuthHandler>> {
    let mut handlers: BTreeMap<Method, Box<dyn AuthHandler>> = BTreeMap::new();
    if allow_no_auth {
        handlers.insert(Method::NoAuth, Box::new(NoAuthHandler));
    }
    if let Some(verify) = authenticate {
        handlers.insert(Method::UserPass, Box::new(UserPassHandler::new(verify)));
    }
    if let Some(factory) = gssapi {
        handlers.insert(Method::GssApi, Box::new(GssApiHandler::new(factory)));
    }
    handlers
}

/// Stateless per-connection protocol driver. One instance serves any number
/// of concurrent connections.
pub struct Handler {
    pub(crate) auth: BTreeMap<Method, Box<dyn AuthHandler>>,
    pub(crate) connect: ConnectFn,
    pub(crate) bind: Option<BindFn>,
    pub(crate) max_conn_idle: Duration,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("auth", &self.auth)
            .field("max_conn_idle", &self.max_conn_idle)
            .finish()
    }
}

impl Handler {
    /// Build a handler from `opts`; fails when no auth method is enabled.
    pub fn new(opts: Options) -> Result<Handler, Error> {
        let Options {
            allow_no_auth,
            authenticate,
            gssapi,
            connect,
            bind,
            max_conn_idle,
        } = opts;

        let auth = auth_handlers(allow_no_auth, authenticate, gssapi);
        if auth.is_empty() {
            return Err(ErrorKind::NoAuthMethod.into());
        }

        let connect = connect.unwrap_or_else(|| {
            Box::new(move |addr: &Address| connector::default_connect(addr, max_conn_idle))
        });

        Ok(Handler {
            auth,
            connect,
            bind,
            max_conn_idle,
        })
    }

    /// Drive the SOCKS5 negotiation and relay on `stream` until the session
    /// is over. Internal errors terminate the connection and are delivered
    /// to `on_error`, never propagated; the host closes the stream after
    /// this returns.
    pub fn handle<S>(&self, stream: S, on_error: Option<&dyn Fn(&model::Error)>)
    where
        S: ByteStream + 'static,
    {
        if let Err(err) = session::run(self, Box::new(stream)) {
            if let Some(sink) = on_error {
                sink(&err);
            }
        }
    }
}

pub struct Server<T: Binder> {
    config: ServerConfig,
    handler: Arc<Handler>,
    binder: T,
    tx_cmd: SyncSender<ServerCommand<T::Stream>>,
    rx_cmd: Receiver<ServerCommand<T::Stream>>,
    sessions: Vec<thread::JoinHandle<()>>,
}

impl Server<TcpBinder> {
    /// Build a server whose handler is derived from `config`.
    pub fn new(
        config: ServerConfig,
    ) -> Result<(Self, SyncSender<ServerCommand<<TcpBinder as Binder>::Stream>>), Error> {
        let mut opts = Options::default();
        opts.allow_no_auth = config.allow_no_auth;
        opts.max_conn_idle = config.max_conn_idle;
        if let Some(users) = config.users.clone() {
            opts.authenticate = Some(Box::new(move |user, pass| users.verify(user, pass)));
        }
        let handler = Handler::new(opts)?;
        let binder = TcpBinder::new(config.max_conn_idle);
        Server::with_binder(config, binder, handler)
    }
}

impl<T> Server<T>
where
    T: Binder,
{
    pub fn with_binder(
        config: ServerConfig,
        binder: T,
        handler: Handler,
    ) -> Result<(Self, SyncSender<ServerCommand<T::Stream>>), Error> {
        let (tx, rx) = mpsc::sync_channel(0);
        Ok((
            Self {
                config,
                handler: Arc::new(handler),
                binder,
                tx_cmd: tx.clone(),
                rx_cmd: rx,
                sessions: vec![],
            },
            tx,
        ))
    }

    pub fn serve(&mut self) -> Result<(), Error> {
        let acceptor = self.binder.bind(self.config.server_addr())?;
        info!("listening on {}", self.config.server_addr());
        spawn_acceptor(acceptor, self.tx_cmd.clone());

        while let Ok(cmd) = self.rx_cmd.recv() {
            debug!("cmd: {:?}", cmd);
            match cmd {
                ServerCommand::Terminate => {
                    self.sessions.drain(..).for_each(|hnd| {
                        hnd.join().ok();
                    });
                    break;
                }
                ServerCommand::Connect(stream, addr) => {
                    info!("connect from: {}", addr);
                    match spawn_session(self.handler.clone(), stream, addr) {
                        Ok(hnd) => self.sessions.push(hnd),
                        Err(err) => error!("spawn session: {}", err),
                    }
                }
            }
        }
        info!("server shutdown");
        Ok(())
    }
}

/// spawn a thread sending accepted streams to `tx`
fn spawn_acceptor<S>(
    acceptor: impl Iterator<Item = (S, model::SocketAddr)> + Send + 'static,
    tx: SyncSender<ServerCommand<S>>,
) -> thread::JoinHandle<()>
where
    S: ByteStream + 'static,
{
    thread::spawn(move || {
        for (strm, addr) in acceptor {
            if tx.send(ServerCommand::Connect(strm, addr)).is_err() {
                info!("server command channel disconnected");
                break;
            }
        }
    })
}

/// spawn a thread running one client session
fn spawn_session<S>(
    handler: Arc<Handler>,
    stream: S,
    addr: model::SocketAddr,
) -> std::io::Result<thread::JoinHandle<()>>
where
    S: ByteStream + 'static,
{
    thread::Builder::new()
        .name(format!("session: {}", addr))
        .spawn(move || {
            handler.handle(stream, Some(&|err| error!("session ({}): {}", addr, err)));
        })
}
