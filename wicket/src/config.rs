use std::fs::File;
use std::path::Path;
use std::time::Duration;

use failure::ResultExt;
use serde::Deserialize;

use model::{ErrorKind as SessionErrorKind, IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, ErrorKind};
use crate::server::DEFAULT_MAX_CONN_IDLE;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_ip: IpAddr,
    pub server_port: u16,
    /// accept clients that only offer the no-auth method
    pub allow_no_auth: bool,
    /// enables username/password authentication when present
    pub users: Option<UserDb>,
    pub max_conn_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            server_ip: Ipv4Addr::new(0, 0, 0, 0).into(),
            server_port: 1080,
            allow_no_auth: true,
            users: None,
            max_conn_idle: DEFAULT_MAX_CONN_IDLE,
        }
    }
}

impl ServerConfig {
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip, self.server_port)
    }
}

/// Username/password credential store loaded from a YAML file:
///
/// ```yaml
/// users:
///   - username: alice
///     password: open sesame
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserDb {
    users: Vec<Credential>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Credential {
    username: String,
    password: String,
}

impl UserDb {
    pub fn with_file(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).context(ErrorKind::Config)?;
        let db = serde_yaml::from_reader(file).context(ErrorKind::Config)?;
        Ok(db)
    }

    pub fn verify(&self, username: &[u8], password: &[u8]) -> Result<(), model::Error> {
        for cred in &self.users {
            if cred.username.as_bytes() == username && cred.password.as_bytes() == password {
                return Ok(());
            }
        }
        Err(SessionErrorKind::UnrecognizedUsernamePassword.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const USERS_YAML: &str = r#"
users:
  - username: alice
    password: open sesame
  - username: bob
    password: hunter2
"#;

    #[test]
    fn parses_credentials_from_yaml() {
        let db: UserDb = serde_yaml::from_str(USERS_YAML).unwrap();
        db.verify(b"alice", b"open sesame").unwrap();
        db.verify(b"bob", b"hunter2").unwrap();
    }

    #[test]
    fn rejects_unknown_or_mismatched_credentials() {
        let db: UserDb = serde_yaml::from_str(USERS_YAML).unwrap();
        assert!(db.verify(b"alice", b"hunter2").is_err());
        assert!(db.verify(b"mallory", b"open sesame").is_err());
        assert!(db.verify(b"", b"").is_err());
    }

    #[test]
    fn default_config_listens_on_1080() {
        let config = ServerConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:1080".parse().unwrap());
        assert!(config.allow_no_auth);
        assert!(config.users.is_none());
    }
}
