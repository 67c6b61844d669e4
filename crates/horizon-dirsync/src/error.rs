//! Error types for Horizon DirSync.

use std::path::PathBuf;

use horizon_dirsync_core::CoreError;

use crate::dom::NodeId;

/// Result type alias for Horizon DirSync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or wiring the direction synchronizer.
///
/// The synchronization paths themselves (reconcile, sweep, trigger callbacks)
/// never fail; missing collaborators are skipped and hook failures are
/// contained.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration value for '{key}': {message}")]
    Config { key: String, message: String },

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be written as TOML.
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Configuration file I/O error.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Selector parsing error.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The node id does not belong to this document.
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A tree edit would produce an invalid tree.
    #[error("Invalid tree operation on {parent:?} and {child:?}: {message}")]
    Hierarchy {
        parent: NodeId,
        child: NodeId,
        message: &'static str,
    },

    /// A mutation observer was registered without anything to observe.
    #[error("Mutation observer must watch attributes or the child list")]
    InvalidObserverOptions,

    /// `start` was called twice on the same controller.
    #[error("Direction controller has already been started")]
    AlreadyStarted,

    /// Runtime error from the event loop or scheduler.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl Error {
    /// Create a configuration error.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a selector error.
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
