use std::time::Duration;

use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::TokenNetwork;
use crate::error::ProvisionError;
use crate::token::{unpack_mint, unpack_token_account, MintDescriptor, TokenAccount};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// [`TokenNetwork`] backed by the JSON-RPC API of a cluster.
pub struct RpcNetwork {
    client: RpcClient,
}

impl RpcNetwork {
    /// Creates a client for `url`. No request is made until the first call.
    pub fn connect(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        let url = url.into();
        tracing::debug!(%url, commitment = ?commitment.commitment, "rpc client created");
        Self {
            client: RpcClient::new_with_commitment(url, commitment),
        }
    }
}

fn rpc_error(err: ClientError) -> ProvisionError {
    match err.get_transaction_error() {
        Some(tx_err) => ProvisionError::Transaction(tx_err.to_string()),
        None => ProvisionError::Network(err.to_string()),
    }
}

impl TokenNetwork for RpcNetwork {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ProvisionError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(rpc_error)
    }

    async fn latest_blockhash(&self) -> Result<Hash, ProvisionError> {
        self.client.get_latest_blockhash().await.map_err(rpc_error)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ProvisionError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.client.commitment().commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(rpc_error)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<(), ProvisionError> {
        loop {
            let status = self
                .client
                .get_signature_status_with_commitment(signature, commitment)
                .await
                .map_err(rpc_error)?;
            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => {
                    return Err(ProvisionError::Transaction(format!(
                        "transaction {signature} failed: {err}"
                    )))
                }
                None => tokio::time::sleep(CONFIRM_POLL_INTERVAL).await,
            }
        }
    }

    async fn token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>, ProvisionError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map_err(rpc_error)?;
        response
            .value
            .map(|account| unpack_token_account(address, &account.owner, &account.data))
            .transpose()
    }

    async fn mint_account(&self, address: &Pubkey) -> Result<Option<MintDescriptor>, ProvisionError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map_err(rpc_error)?;
        response
            .value
            .map(|account| unpack_mint(address, &account.owner, &account.data))
            .transpose()
    }
}
