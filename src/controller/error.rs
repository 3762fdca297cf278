use std::error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::pcep::PcepError;
use crate::session::SessionError;
use crate::store::StoreError;
use crate::topology::TopologyError;

#[derive(Debug)]
pub enum ControllerError {
    /// PCEP session from an address no router claims
    UnknownPeer(IpAddr),
    /// No session for the router with this loopback
    NoSession(Ipv4Addr),
    /// No feasible path. [src, dst]
    NoPath(String, String),
    /// Nothing registered under this key
    NotFound(String),
    Store(StoreError),
    Session(SessionError),
    Topology(TopologyError),
    /// Request rejected before anything was changed. [reason]
    Invalid(String),
    /// One or both halves of a session push + store write failed
    Phases(PhaseErrors),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ControllerError::*;
        match self {
            UnknownPeer(addr) => write!(f, "No router configured for PCEP peer {}", addr),
            NoSession(loopback) => write!(f, "No session for router {}", loopback),
            NoPath(src, dst) => write!(f, "No path found from {} to {}", src, dst),
            NotFound(key) => write!(f, "{} not found", key),
            Store(err) => write!(f, "{}", err),
            Session(err) => write!(f, "{}", err),
            Topology(err) => write!(f, "{}", err),
            Invalid(reason) => write!(f, "Invalid request: {}", reason),
            Phases(errors) => write!(f, "{}", errors),
        }
    }
}

impl error::Error for ControllerError {}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        ControllerError::Store(err)
    }
}

impl From<SessionError> for ControllerError {
    fn from(err: SessionError) -> Self {
        ControllerError::Session(err)
    }
}

impl From<TopologyError> for ControllerError {
    fn from(err: TopologyError) -> Self {
        ControllerError::Topology(err)
    }
}

impl From<PcepError> for ControllerError {
    fn from(err: PcepError) -> Self {
        ControllerError::Invalid(err.to_string())
    }
}

impl From<PhaseErrors> for ControllerError {
    fn from(errors: PhaseErrors) -> Self {
        ControllerError::Phases(errors)
    }
}

/// Outcome of each half of a two-phase LSP change
///
/// Both halves are always attempted; nothing is rolled back.
#[derive(Debug, Default)]
pub struct PhaseErrors {
    pub session: Option<SessionError>,
    pub store: Option<StoreError>,
}

impl PhaseErrors {
    pub fn is_empty(&self) -> bool {
        self.session.is_none() && self.store.is_none()
    }

    /// `Ok` when neither half failed
    pub fn into_result(self) -> Result<(), ControllerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Phases(self))
        }
    }
}

impl fmt::Display for PhaseErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut errors = vec![];
        if let Some(err) = &self.session {
            errors.push(format!("session push failed: {}", err));
        }
        if let Some(err) = &self.store {
            errors.push(format!("store write failed: {}", err));
        }
        write!(f, "{}", errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_errors() {
        assert!(PhaseErrors::default().into_result().is_ok());
        let errors = PhaseErrors {
            session: Some(SessionError::NotConnected),
            store: Some(StoreError::Poisoned),
        };
        assert_eq!(
            errors.to_string(),
            "session push failed: Session Error: Session is not up; \
             store write failed: Store Error: Store lock poisoned"
        );
        assert!(matches!(
            errors.into_result(),
            Err(ControllerError::Phases(_))
        ));
    }
}
