use tracing::warn;

use crate::pipeline::PipelineError;

/// Session-scoped access gate in front of the data pipeline. Until the
/// gate has been opened with the configured password, no fetch or
/// computation runs at all: view builders call [`AccessGate::require`]
/// before touching any table.
#[derive(Debug)]
pub struct AccessGate {
    open: bool,
}

impl AccessGate {
    pub fn closed() -> Self {
        Self { open: false }
    }

    /// Compare an entered password with the configured secret and open the
    /// gate on a match. The attempt is not stored either way.
    pub fn unlock(&mut self, attempt: &str, secret: &str) -> bool {
        if !secret.is_empty() && attempt == secret {
            self.open = true;
        } else {
            warn!("access gate: incorrect password");
        }
        self.open
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn require(&self) -> Result<(), PipelineError> {
        if self.open {
            Ok(())
        } else {
            Err(PipelineError::GateClosed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_opens_only_on_the_right_password() {
        let mut gate = AccessGate::closed();
        assert!(gate.require().is_err());

        assert!(!gate.unlock("guess", "galingan"));
        assert!(gate.require().is_err());

        assert!(gate.unlock("galingan", "galingan"));
        assert!(gate.require().is_ok());
    }

    #[test]
    fn empty_secret_never_opens() {
        let mut gate = AccessGate::closed();
        assert!(!gate.unlock("", ""));
        assert!(!gate.is_open());
    }
}
