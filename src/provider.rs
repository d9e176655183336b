//! Remote generators and their offline fallbacks.
//!
//! A remote `Generator` may fail for any reason in the `StageError`
//! taxonomy. `WithFallback` pairs it with an `OfflineGenerator` of the same
//! output type, so a stage always yields an artifact and the reason for a
//! fallback travels next to it.

use crate::error::StageError;
use crate::logw;
use crate::request::GenerationRequest;
use async_trait::async_trait;
use std::fmt;

/// Where an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Provider,
    Offline,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => f.write_str("provider"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// A single-attempt call to a remote provider.
#[async_trait]
pub trait Generator: Send + Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Self::Output, StageError>;
}

/// A deterministic generator that cannot fail.
pub trait OfflineGenerator: Send + Sync {
    type Output;

    fn generate_offline(&self, request: &GenerationRequest) -> Self::Output;
}

/// An artifact plus the reason it had to be produced by a fallback.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub artifact: T,
    pub fallback: Option<StageError>,
}

impl<T> Generated<T> {
    pub fn primary(artifact: T) -> Self {
        Self {
            artifact,
            fallback: None,
        }
    }

    pub fn degraded(artifact: T, reason: StageError) -> Self {
        Self {
            artifact,
            fallback: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }
}

pub struct WithFallback<O: OfflineGenerator> {
    remote: Box<dyn Generator<Output = O::Output>>,
    offline: O,
}

impl<O> WithFallback<O>
where
    O: OfflineGenerator,
    O::Output: Send,
{
    pub fn new(remote: impl Generator<Output = O::Output> + 'static, offline: O) -> Self {
        Self {
            remote: Box::new(remote),
            offline,
        }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Generated<O::Output> {
        match self.remote.generate(request).await {
            Ok(artifact) => Generated::primary(artifact),
            Err(reason) => {
                logw(format!(
                    "{} fell back to offline generator [{}]: {}",
                    self.remote.name(),
                    reason.kind(),
                    reason
                ));
                Generated::degraded(self.offline.generate_offline(request), reason)
            }
        }
    }
}
