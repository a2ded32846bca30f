///! Per-connection protocol engine.
///!
///! One tagged state per negotiation stage, driven by a small loop. The
///! connection state lives only for the duration of [`run`]; the stream is
///! owned exclusively and may be swapped by the auth stage.
use log::*;

use model::{Command, Error, ErrorKind, Method, ProtocolVersion, ReplyStatus};

use crate::byte_stream::BoxedStream;
use crate::message::{CommandReply, CommandRequest, MethodReply, MethodRequest};
use crate::relay;
use crate::server::Handler;

#[derive(Debug)]
enum State {
    /// read the client's method candidates
    Initial,
    /// no offered method is configured; refuse and stop
    FailAuth,
    /// announce the selection and run its subnegotiation
    Authenticate(Method),
    /// read the command request
    GetCommand,
    RunConnect(CommandRequest),
    RunBind(CommandRequest),
    /// send a failure reply echoing the client address, then stop with the
    /// pending error
    FailCommand(ReplyStatus, CommandRequest, Error),
    /// splice client and target until either side stops
    Relay(BoxedStream),
}

/// Drive one client connection to completion. Returning is termination; the
/// host owns (and closes) the client socket.
pub(crate) fn run(handler: &Handler, mut stream: BoxedStream) -> Result<(), Error> {
    let mut state = State::Initial;
    loop {
        trace!("state: {:?}", state);
        state = match state {
            State::Initial => initial(handler, &mut stream)?,
            State::FailAuth => return Err(fail_auth(&mut stream)),
            State::Authenticate(method) => {
                stream = authenticate(handler, method, stream)?;
                State::GetCommand
            }
            State::GetCommand => get_command(&mut stream)?,
            State::RunConnect(req) => run_connect(handler, &mut stream, req)?,
            State::RunBind(req) => run_bind(handler, &mut stream, req)?,
            State::FailCommand(status, req, err) => {
                return Err(fail_command(&mut stream, status, req, err))
            }
            State::Relay(target) => return relay::relay(stream, target),
        };
    }
}

fn initial(handler: &Handler, stream: &mut BoxedStream) -> Result<State, Error> {
    let req = MethodRequest::read_from(stream)?;
    req.validate()?;

    // first offered method with a configured handler wins; the client's
    // order is authoritative
    for method in &req.methods {
        if handler.auth.contains_key(method) {
            return Ok(State::Authenticate(*method));
        }
    }
    Ok(State::FailAuth)
}

fn fail_auth(stream: &mut BoxedStream) -> Error {
    let reply = MethodReply {
        version: ProtocolVersion::SOCKS5,
        method: Method::NoAcceptable,
    };
    if let Err(err) = reply.write_to(stream) {
        return err;
    }
    // the client MUST close; terminate from this side as well
    ErrorKind::NoAcceptableMethod.into()
}

fn authenticate(
    handler: &Handler,
    method: Method,
    mut stream: BoxedStream,
) -> Result<BoxedStream, Error> {
    let reply = MethodReply {
        version: ProtocolVersion::SOCKS5,
        method,
    };
    reply.write_to(&mut stream)?;

    let auth = handler
        .auth
        .get(&method)
        .ok_or_else(|| Error::from(ErrorKind::NoAcceptableMethod))?;
    debug!("authenticate: {}", method);
    // the handler may hijack the stream (e.g. GSS encapsulation)
    auth.authenticate(stream)
}

fn get_command(stream: &mut BoxedStream) -> Result<State, Error> {
    let req = CommandRequest::read_from(stream)?;
    req.validate()?;
    debug!("command: {:?} {}", req.command, req.dst);

    match req.command {
        Command::Connect => Ok(State::RunConnect(req)),
        Command::Bind => Ok(State::RunBind(req)),
        Command::UdpAssociate | Command::Other(_) => {
            let cmd = req.command.code();
            Ok(State::FailCommand(
                ReplyStatus::CommandNotSupported,
                req,
                ErrorKind::command_not_supported(cmd).into(),
            ))
        }
    }
}

fn run_connect(
    handler: &Handler,
    stream: &mut BoxedStream,
    req: CommandRequest,
) -> Result<State, Error> {
    let target = match (handler.connect)(&req.dst) {
        Ok(target) => target,
        Err(cerr) => {
            let status = ReplyStatus::from(&cerr);
            return Ok(State::FailCommand(
                status,
                req,
                ErrorKind::connect(cerr).into(),
            ));
        }
    };
    let target = target.with_idle_timeout(handler.max_conn_idle);

    // the client learns the server-side address of the outgoing socket
    let bound = match target.local_addr() {
        Ok(bound) => bound,
        Err(err) => {
            return Ok(State::FailCommand(
                ReplyStatus::GeneralFailure,
                req,
                ErrorKind::bound_address(format_args!("{}", err)).into(),
            ))
        }
    };

    info!("connect: {} (bound: {})", req.dst, bound);
    CommandReply::new(ReplyStatus::Succeeded, bound.into()).write_to(stream)?;
    Ok(State::Relay(target))
}

fn run_bind(
    handler: &Handler,
    stream: &mut BoxedStream,
    req: CommandRequest,
) -> Result<State, Error> {
    let bind = match &handler.bind {
        Some(bind) => bind,
        None => {
            return Ok(State::FailCommand(
                ReplyStatus::NotAllowed,
                req,
                ErrorKind::BindNotAllowed.into(),
            ))
        }
    };

    let listener = match bind() {
        Ok(listener) => listener,
        Err(err) => return Ok(State::FailCommand(ReplyStatus::GeneralFailure, req, err)),
    };
    let bound = match listener.local_addr() {
        Ok(bound) => bound,
        Err(err) => {
            return Ok(State::FailCommand(
                ReplyStatus::GeneralFailure,
                req,
                ErrorKind::bound_address(format_args!("{}", err)).into(),
            ))
        }
    };

    // first reply advertises the listening address
    CommandReply::new(ReplyStatus::Succeeded, bound.into()).write_to(stream)?;

    let (peer, peer_addr) = match listener.accept() {
        Ok(accepted) => accepted,
        Err(err) => {
            return Ok(State::FailCommand(
                ReplyStatus::GeneralFailure,
                req,
                err.into(),
            ))
        }
    };
    info!("bind: inbound peer {}", peer_addr);

    // second reply carries the inbound peer's address
    CommandReply::new(ReplyStatus::Succeeded, peer_addr.into()).write_to(stream)?;

    let peer = peer.with_idle_timeout(handler.max_conn_idle);
    Ok(State::Relay(peer))
}

fn fail_command(
    stream: &mut BoxedStream,
    status: ReplyStatus,
    req: CommandRequest,
    err: Error,
) -> Error {
    debug!("command failed: {:?}", status);
    let reply = CommandReply::new(status, req.dst.clone());
    if let Err(write_err) = reply.write_to(stream) {
        return write_err;
    }
    err
}
