//! Creates a new token mint (9 decimals) with the wallet as mint and freeze
//! authority. Export the printed address as `TOKEN_MINT` for the other
//! stage binaries.

use std::process::ExitCode;

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signer;
use token_provisioner::network::{RpcNetwork, Timed};
use token_provisioner::token::{self, TOKEN_DECIMALS};
use token_provisioner::{telemetry, ProvisionError, Settings};

async fn create_token_mint(settings: &Settings) -> Result<(), ProvisionError> {
    let connection = RpcNetwork::connect(settings.rpc_url.clone(), CommitmentConfig::confirmed());
    let network = Timed::new(&connection, settings.call_timeout);

    println!("🔑 Our public key is: {}", settings.signer.pubkey());

    let mint = token::create_mint(&network, &settings.signer, TOKEN_DECIMALS).await?;
    println!("✅ Token Mint: {}", settings.cluster().address_url(&mint.address));
    println!("TOKEN_MINT={}", mint.address);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init();

    let result = match Settings::from_env() {
        Ok(settings) => create_token_mint(&settings).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "failed to create token mint");
            error.exit_code()
        }
    }
}
