//! Socket transport helpers for the device simulator.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::AppError;

pub(super) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn connect(host: &str, port: u16) -> Result<TcpStream, AppError> {
    let endpoint = format!("{host}:{port}");
    let address = resolve_tcp_address(host, port).map_err(|source| AppError::Resolve {
        endpoint: endpoint.clone(),
        source,
    })?;
    TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
        .map_err(|source| AppError::Connect { endpoint, source })
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
