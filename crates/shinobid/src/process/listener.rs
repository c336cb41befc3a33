use std::io;
use std::net::TcpListener;

use tracing::info;

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Binds the HTTP socket ahead of the async runtime.
///
/// The listener is returned in non-blocking mode for
/// `tokio::net::TcpListener::from_std`.
pub(crate) fn bind(address: &str) -> Result<TcpListener, LaunchError> {
    let listener = TcpListener::bind(address).map_err(|source| {
        if source.kind() == io::ErrorKind::AddrInUse {
            LaunchError::AddressInUse {
                address: address.to_owned(),
            }
        } else {
            LaunchError::Bind {
                address: address.to_owned(),
                source,
            }
        }
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| LaunchError::Bind {
            address: address.to_owned(),
            source,
        })?;
    info!(target: PROCESS_TARGET, address, "listener bound");
    Ok(listener)
}
