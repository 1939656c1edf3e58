use std::io;
use std::net::IpAddr;

use thiserror::Error;

/// Errors that stop a trace before or while it runs.
#[derive(Error, Debug)]
pub enum TracerouteError {
    #[error("{host}: Hostname not resolvable.")]
    Resolution { host: String },

    #[error("Unable to open probe channel to {target}: {source}")]
    TransportConstruction {
        target: IpAddr,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a single probe.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The raw channel cannot be opened at all (missing privilege, unsupported socket type).
    #[error("probe channel unavailable (ttl {ttl}): {source}")]
    Unavailable {
        ttl: u8,
        #[source]
        source: io::Error,
    },

    #[error("probe i/o failure (ttl {ttl}): {source}")]
    Io {
        ttl: u8,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn ttl(&self) -> u8 {
        match self {
            ProbeError::Unavailable { ttl, .. } | ProbeError::Io { ttl, .. } => *ttl,
        }
    }

    pub fn into_io_error(self) -> io::Error {
        match self {
            ProbeError::Unavailable { source, .. } | ProbeError::Io { source, .. } => source,
        }
    }

    /// Per-hop failures are recovered as timeouts, everything else ends the trace.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProbeError::Io { .. })
    }

    /// Classifies a socket-open failure: missing privilege or an unsupported
    /// socket type can never succeed on a later hop.
    pub fn from_open_error(ttl: u8, source: io::Error) -> Self {
        if is_unavailable_kind(&source) {
            ProbeError::Unavailable { ttl, source }
        } else {
            ProbeError::Io { ttl, source }
        }
    }
}

pub(crate) fn is_unavailable_kind(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::Unsupported)
}

#[derive(Error, Debug)]
pub enum GeolocationError {
    #[error("geolocation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geolocation lookup for {address} failed: {message}")]
    Lookup { address: IpAddr, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_open_is_unavailable() {
        let error = ProbeError::from_open_error(3, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!error.is_recoverable());
        assert_eq!(error.ttl(), 3);
    }

    #[test]
    fn other_open_failures_are_recoverable() {
        let error = ProbeError::from_open_error(7, io::Error::from(io::ErrorKind::AddrNotAvailable));
        assert!(error.is_recoverable());
    }

    #[test]
    fn resolution_error_message_names_host() {
        let error = TracerouteError::Resolution { host: String::from("nowhere.invalid") };
        assert_eq!(error.to_string(), "nowhere.invalid: Hostname not resolvable.");
    }
}
