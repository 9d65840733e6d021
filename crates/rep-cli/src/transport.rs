//! TCP transport for the client.
//!
//! Every resolved address for the endpoint is tried in turn; the first one
//! that accepts the connection wins.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use rep_config::Endpoint;
use tracing::debug;

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

const TRANSPORT_TARGET: &str = "rep::transport";

pub(crate) fn connect(endpoint: &Endpoint) -> Result<TcpStream, AppError> {
    let display = endpoint.to_string();
    let addresses = resolve_addresses(endpoint).map_err(|source| AppError::Resolve {
        endpoint: display.clone(),
        source,
    })?;

    let mut last_error =
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses");
    for address in addresses {
        debug!(target: TRANSPORT_TARGET, %address, "connecting");
        match TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = error,
        }
    }
    Err(AppError::Connect {
        endpoint: display,
        source: last_error,
    })
}

fn resolve_addresses(endpoint: &Endpoint) -> io::Result<Vec<SocketAddr>> {
    let addresses: Vec<SocketAddr> = (endpoint.host(), endpoint.port())
        .to_socket_addrs()?
        .collect();
    if addresses.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no resolved addresses",
        ));
    }
    Ok(addresses)
}
