use crate::RuntimeError;
use std::fmt;

/// Lifecycle of a [`VirtualEnv`](crate::VirtualEnv). Linear, no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Uninitialized,
    Provisioned,
    TornDown,
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Provisioned => "provisioned",
            Self::TornDown => "torn-down",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: EnvState, to: EnvState) -> Result<(), RuntimeError> {
    let valid = matches!(
        (from, to),
        (EnvState::Uninitialized, EnvState::Provisioned | EnvState::TornDown)
            | (EnvState::Provisioned, EnvState::TornDown)
    );

    if valid {
        Ok(())
    } else {
        Err(RuntimeError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
