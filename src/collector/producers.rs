//! Built-in producers for chain and market metrics.

use crate::collector::{CollectorError, Producer};
use crate::source::{DEFAULT_USDC_TOKEN_ID, MirrorClient, SentimentClient};
use crate::storage::{SOURCE_CRYPTO_GREED_FEAR, SOURCE_HEDERA_TX_COUNT, SOURCE_HEDERA_USDC};

/// Number of transactions on the mirror's latest transactions page.
#[derive(Debug, Clone)]
pub struct TransactionCountProducer {
    client: MirrorClient,
}

impl TransactionCountProducer {
    pub fn new(client: MirrorClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Producer for TransactionCountProducer {
    fn source(&self) -> &str {
        SOURCE_HEDERA_TX_COUNT
    }

    async fn produce(&self) -> Result<f64, CollectorError> {
        let count = self.client.transaction_count().await?;
        Ok(count as f64)
    }
}

/// Total supply of a token, in the token's smallest unit.
#[derive(Debug, Clone)]
pub struct TokenSupplyProducer {
    client: MirrorClient,
    token_id: String,
    label: String,
}

impl TokenSupplyProducer {
    /// USDC supply, stored as `hedera_usdc`.
    pub fn usdc(client: MirrorClient) -> Self {
        Self::new(client, DEFAULT_USDC_TOKEN_ID, SOURCE_HEDERA_USDC)
    }

    pub fn new(client: MirrorClient, token_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            client,
            token_id: token_id.into(),
            label: label.into(),
        }
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }
}

#[async_trait::async_trait]
impl Producer for TokenSupplyProducer {
    fn source(&self) -> &str {
        &self.label
    }

    async fn produce(&self) -> Result<f64, CollectorError> {
        Ok(self.client.token_total_supply(&self.token_id).await?)
    }
}

/// Current fear & greed index (0-100).
#[derive(Debug, Clone)]
pub struct SentimentIndexProducer {
    client: SentimentClient,
}

impl SentimentIndexProducer {
    pub fn new(client: SentimentClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Producer for SentimentIndexProducer {
    fn source(&self) -> &str {
        SOURCE_CRYPTO_GREED_FEAR
    }

    async fn produce(&self) -> Result<f64, CollectorError> {
        let index = self.client.index().await?;
        Ok(index as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    #[test]
    fn test_labels() {
        let mirror = MirrorClient::new(Client::new(), "http://127.0.0.1:1/api/v1");
        let sentiment = SentimentClient::new(Client::new(), "http://127.0.0.1:1/fng/");

        assert_eq!(
            TransactionCountProducer::new(mirror.clone()).source(),
            "hedera_tx_count"
        );
        let usdc = TokenSupplyProducer::usdc(mirror);
        assert_eq!(usdc.source(), "hedera_usdc");
        assert_eq!(usdc.token_id(), "0.0.456858");
        assert_eq!(
            SentimentIndexProducer::new(sentiment).source(),
            "crypto_greed_fear"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_source_error() {
        let mirror = MirrorClient::new(Client::new(), "http://127.0.0.1:1/api/v1");
        let err = TransactionCountProducer::new(mirror)
            .produce()
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Source(ref e) if e.is_transport()));
    }
}
