use std::net::IpAddr;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use log::*;
use structopt::*;

use wicket::config::{ServerConfig, UserDb};
use wicket::server::Server;

#[derive(StructOpt, Debug)]
#[structopt(name = "wicket")]
struct Opt {
    #[structopt(short = "p", long = "port", default_value = "1080")]
    /// Set port to listen on
    port: u16,

    #[structopt(short = "i", long = "ip", default_value = "0.0.0.0")]
    /// Set ip address to listen on
    ipaddr: IpAddr,

    #[structopt(long = "users")]
    /// YAML credentials file; enables username/password authentication
    users: Option<PathBuf>,

    #[structopt(long = "allow-no-auth")]
    /// Accept unauthenticated clients even when credentials are configured
    allow_no_auth: bool,

    #[structopt(long = "max-conn-idle", default_value = "180")]
    /// Idle timeout of relayed connections in seconds
    max_conn_idle: u64,
}

fn main() {
    pretty_env_logger::init_timed();

    println!("wicketd");
    let opt = Opt::from_args();
    debug!("option: {:?}", opt);

    let users = match opt.users.as_ref().map(|path| UserDb::with_file(path)) {
        Some(Ok(db)) => Some(db),
        Some(Err(err)) => {
            error!("users file: {}", err);
            exit(1);
        }
        None => None,
    };

    let config = ServerConfig {
        server_ip: opt.ipaddr,
        server_port: opt.port,
        // without credentials the daemon is an open proxy
        allow_no_auth: opt.allow_no_auth || users.is_none(),
        users,
        max_conn_idle: Duration::from_secs(opt.max_conn_idle),
    };

    let (mut server, _tx) = match Server::new(config) {
        Ok(server) => server,
        Err(err) => {
            error!("configuration: {}", err);
            exit(1);
        }
    };
    if let Err(err) = server.serve() {
        error!("server error: {:?}", err);
    }
}
