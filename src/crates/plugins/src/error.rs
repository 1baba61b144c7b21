//! Errors raised while constructing or dispatching through a [`crate::PluginManager`].

use thiserror::Error;

/// The error type a hook implementation returns. Hooks are user-supplied, so
/// this is left as an opaque boxed error rather than a fixed enum — the
/// manager only ever needs to wrap and forward it.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin name must not be empty")]
    EmptyName,

    #[error("duplicate plugin name: {0}")]
    DuplicateName(String),

    /// A hook raised an error; it is wrapped with the offending plugin's
    /// name (spec §4.2: `plugin "p2": <inner>`).
    #[error("plugin \"{plugin}\": {source}")]
    Wrapped {
        plugin: String,
        #[source]
        source: HookError,
    },

    /// One or more `close()` hooks returned an error. Close always runs every
    /// registered closer regardless of earlier failures, then joins them.
    #[error("{} plugin(s) failed to close: {}", errors.len(), format_close_errors(errors))]
    CloseFailed { errors: Vec<(String, HookError)> },
}

fn format_close_errors(errors: &[(String, HookError)]) -> String {
    errors
        .iter()
        .map(|(name, err)| format!("plugin \"{name}\": {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PluginError {
    pub fn wrap(plugin: impl Into<String>, source: HookError) -> Self {
        Self::Wrapped {
            plugin: plugin.into(),
            source,
        }
    }
}
