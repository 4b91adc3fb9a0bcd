use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::ClientError;

/// Fires when either the owner's token or the caller's token fires.
#[derive(Clone, Copy, Debug)]
pub struct AnyOf<'a> {
    base: &'a CancellationToken,
    caller: Option<&'a CancellationToken>,
}

impl<'a> AnyOf<'a> {
    pub fn new(base: &'a CancellationToken, caller: Option<&'a CancellationToken>) -> Self {
        Self { base, caller }
    }

    pub fn is_cancelled(&self) -> bool {
        self.base.is_cancelled() || self.caller.is_some_and(CancellationToken::is_cancelled)
    }

    pub async fn cancelled(&self) {
        match self.caller {
            Some(caller) => tokio::select! {
                _ = self.base.cancelled() => {}
                _ = caller.cancelled() => {}
            },
            None => self.base.cancelled().await,
        }
    }

    /// Drive `fut` unless cancelled first. An already cancelled scope never
    /// polls `fut`; a later cancellation drops it mid-flight.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ClientError::Cancelled),
            out = fut => out,
        }
    }
}
