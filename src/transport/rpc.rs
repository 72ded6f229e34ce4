//! JSON-RPC transport over the nonblocking `RpcClient`

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
};
use solana_rpc_client_api::{
    config::RpcTransactionConfig,
    request::{RpcError, RpcRequest, RpcResponseErrorData},
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{Freshness, Transport, TransportError};

/// [`Transport`] backed by a Solana JSON-RPC endpoint
pub struct RpcTransport {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcTransport {
    pub fn new(
        rpc_url: impl Into<String>,
        commitment: CommitmentConfig,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        let client = RpcClient::new_with_commitment(rpc_url.into(), commitment);
        Self::with_client(Arc::new(client), confirm_timeout, poll_interval)
    }

    pub fn with_client(
        client: Arc<RpcClient>,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        let commitment = client.commitment();
        Self {
            client,
            commitment,
            confirm_timeout,
            poll_interval,
        }
    }

    /// Whether the chain has moved past `last_valid_block_height`. A failed
    /// height lookup counts as not expired; the poll simply continues.
    async fn blockhash_expired(&self, last_valid_block_height: u64) -> bool {
        match self.client.get_block_height().await {
            Ok(height) => height > last_valid_block_height,
            Err(e) => {
                debug!(error = %e, "Could not fetch block height");
                false
            }
        }
    }

    /// Log lines of a landed transaction, empty when unavailable.
    async fn transaction_logs(&self, signature: &Signature) -> Vec<String> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match self
            .client
            .get_transaction_with_config(signature, config)
            .await
        {
            Ok(tx) => tx
                .transaction
                .meta
                .and_then(|meta| Option::<Vec<String>>::from(meta.log_messages))
                .unwrap_or_default(),
            Err(e) => {
                debug!(signature = %signature, error = %e, "Could not fetch transaction logs");
                Vec::new()
            }
        }
    }
}

/// Converts a client error into a transport error, keeping preflight
/// simulation results (error + logs) intact for classification.
pub fn transport_error_from_client(err: ClientError) -> TransportError {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            message,
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => TransportError::Rejected {
            message: message.clone(),
            error: result
                .err
                .as_ref()
                .and_then(|e| serde_json::to_value(e).ok()),
            logs: result.logs.clone().unwrap_or_default(),
        },
        ClientErrorKind::TransactionError(tx_err) => TransportError::Rejected {
            message: tx_err.to_string(),
            error: serde_json::to_value(tx_err).ok(),
            logs: Vec::new(),
        },
        _ => TransportError::Rpc(err.to_string()),
    }
}

#[async_trait]
impl Transport for RpcTransport {
    async fn latest_blockhash(&self) -> Result<Freshness, TransportError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(transport_error_from_client)?;
        Ok(Freshness {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn send_signed_bytes(&self, bytes: &[u8]) -> Result<Signature, TransportError> {
        let params = serde_json::json!([
            BASE64_STANDARD.encode(bytes),
            {
                "encoding": "base64",
                "preflightCommitment": self.commitment.commitment,
            }
        ]);

        let signature: String = self
            .client
            .send(RpcRequest::SendTransaction, params)
            .await
            .map_err(transport_error_from_client)?;

        Signature::from_str(&signature)
            .map_err(|e| TransportError::Decode(format!("signature {}: {}", signature, e)))
    }

    async fn confirm(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), TransportError> {
        let started = Instant::now();

        loop {
            let statuses = self
                .client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(transport_error_from_client)?;

            match statuses.value.into_iter().next().flatten() {
                Some(status) => {
                    if let Some(err) = status.err.as_ref() {
                        let logs = self.transaction_logs(signature).await;
                        warn!(signature = %signature, error = ?err, "Transaction failed on-chain");
                        return Err(TransportError::Rejected {
                            message: format!("Transaction failed: {:?}", err),
                            error: serde_json::to_value(err).ok(),
                            logs,
                        });
                    }
                    if status.satisfies_commitment(CommitmentConfig::finalized()) {
                        debug!(
                            signature = %signature,
                            slot = status.slot,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Transaction finalized"
                        );
                        return Ok(());
                    }
                }
                None => {
                    if self.blockhash_expired(last_valid_block_height).await {
                        warn!(
                            signature = %signature,
                            last_valid_block_height,
                            "Blockhash expired before the transaction landed"
                        );
                        return Err(TransportError::BlockhashExpired {
                            signature: *signature,
                            last_valid_block_height,
                        });
                    }
                }
            }

            if started.elapsed() >= self.confirm_timeout {
                return Err(TransportError::ConfirmationTimeout {
                    signature: *signature,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(transport_error_from_client)?;
        Ok(response.value.map(|account| account.data))
    }

    async fn fetch_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, TransportError> {
        let accounts = self
            .client
            .get_multiple_accounts(addresses)
            .await
            .map_err(transport_error_from_client)?;

        if accounts.len() != addresses.len() {
            return Err(TransportError::Decode(format!(
                "requested {} accounts, node returned {}",
                addresses.len(),
                accounts.len()
            )));
        }
        Ok(accounts
            .into_iter()
            .map(|account| account.map(|a| a.data))
            .collect())
    }
}
