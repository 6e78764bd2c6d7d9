//! Provisions an SPL token on a Solana cluster: creates a mint, ensures the
//! signer's associated token account, mints a fixed supply into it and
//! reports the balance.
//!
//! The workflow in [`sequencer`] is generic over [`network::TokenNetwork`];
//! [`network::RpcNetwork`] talks to a real cluster.
//!
//! ```no_run
//! use solana_sdk::commitment_config::CommitmentConfig;
//! use token_provisioner::network::RpcNetwork;
//! use token_provisioner::sequencer;
//!
//! # async fn example() -> Result<(), token_provisioner::sequencer::StageFailure> {
//! let report = sequencer::run(
//!     |key| std::env::var(key).ok(),
//!     |settings| RpcNetwork::connect(settings.rpc_url.clone(), CommitmentConfig::confirmed()),
//! )
//! .await?;
//! println!("balance: {}", report.ui_balance());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod sequencer;
pub mod telemetry;
pub mod token;

pub use config::Settings;
pub use error::{ErrorKind, ProvisionError};
pub use sequencer::{provision, run, ProvisionReport, Stage, StageFailure};
