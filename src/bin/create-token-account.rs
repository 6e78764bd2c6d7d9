//! Ensures the wallet's associated token account for `TOKEN_MINT` exists.

use std::process::ExitCode;

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signer;
use token_provisioner::network::{RpcNetwork, Timed};
use token_provisioner::token;
use token_provisioner::{telemetry, ProvisionError, Settings};

async fn create_token_account(settings: &Settings) -> Result<(), ProvisionError> {
    let mint = settings.require_mint()?;
    let connection = RpcNetwork::connect(settings.rpc_url.clone(), CommitmentConfig::confirmed());
    let network = Timed::new(&connection, settings.call_timeout);

    let owner = settings.signer.pubkey();
    println!("🔑 Our public key is: {owner}");

    let account =
        token::get_or_create_associated_account(&network, &settings.signer, &owner, &mint).await?;
    println!(
        "✅ Token account: {}",
        settings.cluster().address_url(&account.address)
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init();

    let result = match Settings::from_env() {
        Ok(settings) => create_token_account(&settings).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "failed to prepare token account");
            error.exit_code()
        }
    }
}
