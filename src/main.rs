//! Creates a token mint, the wallet's associated token account and mints
//! 100 tokens into it, then prints the resulting balance.
//!
//! ```bash
//! export PRIVATE_KEY=<base58 secret key>
//! RUST_LOG=info cargo run --bin provision-token
//! ```

use std::env;
use std::process::ExitCode;

use solana_sdk::commitment_config::CommitmentConfig;
use token_provisioner::config::Cluster;
use token_provisioner::network::RpcNetwork;
use token_provisioner::token::TOKENS_TO_MINT;
use token_provisioner::{sequencer, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init();

    let mut cluster = Cluster::Devnet;
    let result = sequencer::run(
        |key| env::var(key).ok(),
        |settings| {
            cluster = settings.cluster();
            RpcNetwork::connect(settings.rpc_url.clone(), CommitmentConfig::confirmed())
        },
    )
    .await;

    match result {
        Ok(report) => {
            println!("🔑 Wallet public key: {}", report.wallet);
            if report.mint_created {
                println!("✅ Token created: {}", cluster.address_url(&report.mint.address));
            }
            println!(
                "✅ Token account: {}",
                cluster.address_url(&report.token_account.address)
            );
            println!(
                "✅ Minted {TOKENS_TO_MINT} tokens: {}",
                cluster.transaction_url(&report.mint_signature)
            );
            println!("💰 Token account balance: {}", report.ui_balance());
            ExitCode::SUCCESS
        }
        Err(failure) => {
            // mint creation failures are logged where they are contained
            if !failure.is_mint_creation() {
                tracing::error!(
                    stage = %failure.stage,
                    kind = %failure.kind(),
                    error = %failure.error,
                    "provisioning failed"
                );
            }
            failure.error.exit_code()
        }
    }
}
