//! The network service boundary.
//!
//! [`TokenNetwork`] is the minimal set of cluster calls the workflow needs.
//! Composite token operations (mint creation, associated account
//! get-or-create, minting) are built on top of it in [`crate::token`], so a
//! mock only has to model these primitives.

mod rpc;

pub use rpc::RpcNetwork;

use std::future::Future;
use std::time::Duration;

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::ProvisionError;
use crate::token::{MintDescriptor, TokenAccount};

/// Calls made against a Solana cluster.
///
/// Implementations must be usable from a multi-threaded runtime; every
/// returned future is `Send`.
pub trait TokenNetwork: Send + Sync {
    /// Minimum lamports an account of `data_len` bytes must hold to be rent exempt.
    fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> impl Future<Output = Result<u64, ProvisionError>> + Send;

    /// Latest blockhash, used as the recency token of a new transaction.
    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash, ProvisionError>> + Send;

    /// Submits a signed transaction and returns its first signature.
    fn send_transaction(
        &self,
        transaction: &Transaction,
    ) -> impl Future<Output = Result<Signature, ProvisionError>> + Send;

    /// Waits until `signature` reaches `commitment`.
    ///
    /// Resolves to [`ProvisionError::Transaction`] when the transaction was
    /// processed but failed. Does not return while the status is unknown;
    /// callers bound the wait (see [`Timed`]).
    fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;

    /// Reads a token account. `Ok(None)` when no account exists at `address`.
    fn token_account(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Option<TokenAccount>, ProvisionError>> + Send;

    /// Reads a mint. `Ok(None)` when no account exists at `address`.
    fn mint_account(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Option<MintDescriptor>, ProvisionError>> + Send;
}

/// Wraps a [`TokenNetwork`] so that every call fails with
/// [`ProvisionError::Timeout`] once `after` elapses.
pub struct Timed<'a, N> {
    inner: &'a N,
    after: Duration,
}

impl<'a, N: TokenNetwork> Timed<'a, N> {
    pub fn new(inner: &'a N, after: Duration) -> Self {
        Self { inner, after }
    }
}

async fn bounded<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T, ProvisionError>
where
    F: Future<Output = Result<T, ProvisionError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?after, "network call timed out");
            Err(ProvisionError::Timeout { operation, after })
        }
    }
}

impl<N: TokenNetwork> TokenNetwork for Timed<'_, N> {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ProvisionError> {
        bounded(
            "rent exemption query",
            self.after,
            self.inner.minimum_balance_for_rent_exemption(data_len),
        )
        .await
    }

    async fn latest_blockhash(&self) -> Result<Hash, ProvisionError> {
        bounded("latest blockhash", self.after, self.inner.latest_blockhash()).await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ProvisionError> {
        bounded("send transaction", self.after, self.inner.send_transaction(transaction)).await
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<(), ProvisionError> {
        bounded(
            "confirm transaction",
            self.after,
            self.inner.confirm_transaction(signature, commitment),
        )
        .await
    }

    async fn token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>, ProvisionError> {
        bounded("token account lookup", self.after, self.inner.token_account(address)).await
    }

    async fn mint_account(&self, address: &Pubkey) -> Result<Option<MintDescriptor>, ProvisionError> {
        bounded("mint lookup", self.after, self.inner.mint_account(address)).await
    }
}
