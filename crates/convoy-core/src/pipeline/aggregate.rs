//! Fan-in of worker completion tokens into one total.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::CompletionToken;

/// Running totals over every token received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Files written (sum of token values)
    pub files: u64,
    /// Files skipped after a recoverable error
    pub failed: u64,
    /// Output rows reported under row granularity
    pub rows: u64,
}

impl Totals {
    fn record(&mut self, token: &CompletionToken) {
        self.files += token.value();
        match token {
            CompletionToken::Row => self.rows += 1,
            CompletionToken::Failed(_) => self.failed += 1,
            CompletionToken::File(_) => {}
        }
    }
}

/// Drains the token channel.
pub struct Aggregator;

impl Aggregator {
    /// Sum every token until the channel closes.
    ///
    /// The channel closes only once every sender (every worker plus the
    /// dispatcher's supervisor) is gone, so no token is missed. `on_token`
    /// sees each token with the totals after it was counted.
    pub async fn reduce<F>(mut tokens: mpsc::Receiver<CompletionToken>, mut on_token: F) -> Totals
    where
        F: FnMut(&CompletionToken, &Totals),
    {
        let mut totals = Totals::default();
        while let Some(token) = tokens.recv().await {
            totals.record(&token);
            on_token(&token, &totals);
        }
        tracing::debug!(
            "Token stream closed: {} files, {} failed, {} rows",
            totals.files,
            totals.failed,
            totals.rows
        );
        totals
    }
}
