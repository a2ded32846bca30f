pub mod acceptor;
pub mod auth_service;
pub mod byte_stream;
pub mod config;
pub mod connector;
pub mod error;
pub mod gss;
pub mod lru;
pub mod message;
mod relay;
pub mod server;
pub mod server_command;
mod session;
pub mod timeout_stream;

pub use server::*;
pub use server_command::*;
