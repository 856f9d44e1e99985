//! Route gate command.

use shopfront_state::{AppState, GateDecision};
use tracing::info;

use crate::error::CliError;

/// Ask the gate whether `path` may be entered.
///
/// Uses the route table unless `require_admin` forces an admin check.
///
/// # Errors
///
/// Returns `CliError::Denied` with the redirect target when navigation is
/// denied, so the process exits non-zero.
pub fn check(state: &AppState, path: &str, require_admin: bool) -> Result<(), CliError> {
    let gate = state.gate();
    let decision = if require_admin {
        gate.decide(path, true)
    } else {
        gate.decide_path(path)
    };

    match decision {
        GateDecision::Allow => {
            info!("Allow {path}");
            Ok(())
        }
        GateDecision::DenyUnauthenticated(redirect) => {
            info!("Not signed in");
            Err(CliError::Denied(redirect.href()))
        }
        GateDecision::DenyForbidden(redirect) => {
            info!("Admin role required");
            Err(CliError::Denied(redirect.href()))
        }
    }
}
