//! Error taxonomy for the content pipeline.
//!
//! None of the stage errors is fatal: each one is carried next to the
//! fallback artifact that replaced the failed stage.

use std::fmt;
use thiserror::Error;

/// Why a stage fell back or an upload was skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("{credential} is not configured")]
    ConfigurationMissing { credential: &'static str },

    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("media assembly failed: {0}")]
    AssemblyFailure(String),

    #[error("archival failed: {0}")]
    ArchivalFailure(String),

    #[error("no request workspace: {0}")]
    WorkspaceUnavailable(String),
}

impl StageError {
    pub fn missing(credential: &'static str) -> Self {
        Self::ConfigurationMissing { credential }
    }

    pub fn unavailable(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            Self::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Self::AssemblyFailure(_) => ErrorKind::AssemblyFailure,
            Self::ArchivalFailure(_) => ErrorKind::ArchivalFailure,
            Self::WorkspaceUnavailable(_) => ErrorKind::WorkspaceUnavailable,
        }
    }
}

/// Tag attached to a degraded stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigurationMissing,
    ProviderUnavailable,
    AssemblyFailure,
    ArchivalFailure,
    WorkspaceUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConfigurationMissing => "configuration-missing",
            Self::ProviderUnavailable => "provider-unavailable",
            Self::AssemblyFailure => "assembly-failure",
            Self::ArchivalFailure => "archival-failure",
            Self::WorkspaceUnavailable => "workspace-unavailable",
        };
        f.write_str(label)
    }
}
