// intake-core/src/application/context.rs

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::IntakeError;
use crate::infrastructure::config::RuntimeSettings;
use crate::infrastructure::error::InfrastructureError;

/// Cancellation and deadline applied to every collaborator call of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: settings.io_timeout(),
        }
    }

    /// Per-call deadline, not a deadline for the whole request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancelled together with this context, but can also be cancelled alone.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            timeout: self.timeout,
        }
    }

    /// Same deadline, fresh token. Used to record failures after the request
    /// itself was cancelled.
    pub fn detached(&self) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: self.timeout,
        }
    }

    /// Run one collaborator call under this context.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, IntakeError>
    where
        F: Future<Output = Result<T, IntakeError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(cancelled(operation));
        }

        let guarded = async {
            match self.timeout {
                Some(after) => match tokio::time::timeout(after, call).await {
                    Ok(result) => result,
                    Err(_) => Err(InfrastructureError::Timeout {
                        operation: operation.to_string(),
                        after,
                    }
                    .into()),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled(operation)),
            result = guarded => result,
        }
    }
}

fn cancelled(operation: &str) -> IntakeError {
    InfrastructureError::Cancelled {
        operation: operation.to_string(),
    }
    .into()
}
