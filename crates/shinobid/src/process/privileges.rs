//! Identity checks applied before a production server binds its socket.

use nix::errno::Errno;
use nix::unistd::{self, User};
use thiserror::Error;
use tracing::{info, warn};

use shinobi_config::ServerMode;

use super::PROCESS_TARGET;

/// Errors raised while checking or switching the process identity.
#[derive(Debug, Error)]
pub enum PrivilegeError {
    /// Production refuses to serve as root without a target account.
    #[error("refusing to run as root in production; set `run_as` to an unprivileged user")]
    RootRefused,
    /// The configured account does not exist.
    #[error("user '{user}' does not exist")]
    UnknownUser {
        /// Configured account name.
        user: String,
    },
    /// Looking up the configured account failed.
    #[error("failed to look up user '{user}': {source}")]
    Lookup {
        /// Configured account name.
        user: String,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Dropping to the configured account failed.
    #[error("failed to switch to user '{user}': {source}")]
    Switch {
        /// Configured account name.
        user: String,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Operating system identity operations.
pub(crate) trait IdentityControl: Send + Sync {
    /// Whether the effective user is root.
    fn is_root(&self) -> bool;

    /// Switches the group list, group and user to `user`, in that order.
    fn switch_to(&self, user: &str) -> Result<(), PrivilegeError>;
}

/// Identity control backed by the real process credentials.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemIdentity;

impl IdentityControl for SystemIdentity {
    fn is_root(&self) -> bool {
        unistd::geteuid().is_root()
    }

    fn switch_to(&self, user: &str) -> Result<(), PrivilegeError> {
        let account = User::from_name(user)
            .map_err(|source| PrivilegeError::Lookup {
                user: user.to_owned(),
                source,
            })?
            .ok_or_else(|| PrivilegeError::UnknownUser {
                user: user.to_owned(),
            })?;
        let switch_error = |source| PrivilegeError::Switch {
            user: user.to_owned(),
            source,
        };
        unistd::setgroups(&[account.gid]).map_err(switch_error)?;
        unistd::setgid(account.gid).map_err(switch_error)?;
        unistd::setuid(account.uid).map_err(switch_error)?;
        Ok(())
    }
}

/// Applies the identity policy for `mode`.
///
/// Production servers started as root switch to `run_as`, or refuse to start
/// when no account is configured. Development servers keep their identity.
pub(crate) fn enforce(
    mode: ServerMode,
    run_as: Option<&str>,
    identity: &dyn IdentityControl,
) -> Result<(), PrivilegeError> {
    if !mode.forbids_root() {
        return Ok(());
    }
    if !identity.is_root() {
        if let Some(user) = run_as {
            warn!(
                target: PROCESS_TARGET,
                user,
                "not running as root; ignoring run_as"
            );
        }
        return Ok(());
    }
    let user = run_as.ok_or(PrivilegeError::RootRefused)?;
    identity.switch_to(user)?;
    if identity.is_root() {
        return Err(PrivilegeError::RootRefused);
    }
    info!(target: PROCESS_TARGET, user, "switched process identity");
    Ok(())
}
