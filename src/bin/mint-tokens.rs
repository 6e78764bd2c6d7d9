//! Mints 100 tokens of `TOKEN_MINT` into the wallet's associated token
//! account and prints the new balance.

use std::process::ExitCode;

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signer;
use token_provisioner::network::{RpcNetwork, Timed};
use token_provisioner::token::{self, MINT_AMOUNT, TOKEN_DECIMALS};
use token_provisioner::{telemetry, ProvisionError, Settings};

async fn mint_tokens(settings: &Settings) -> Result<(), ProvisionError> {
    let mint = settings.require_mint()?;
    let connection = RpcNetwork::connect(settings.rpc_url.clone(), CommitmentConfig::confirmed());
    let network = Timed::new(&connection, settings.call_timeout);

    let sender = &settings.signer;
    println!("🔑 Our public key is: {}", sender.pubkey());

    let destination =
        token::get_or_create_associated_account(&network, sender, &sender.pubkey(), &mint).await?;
    let signature =
        token::mint_to(&network, sender, &mint, &destination.address, sender, MINT_AMOUNT).await?;
    println!(
        "✅ Success! Mint Token Transaction: {}",
        settings.cluster().transaction_url(&signature)
    );

    let account = token::get_account(&network, &destination.address).await?;
    println!(
        "💰 Token account balance: {}",
        token::ui_amount(account.amount, TOKEN_DECIMALS)
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init();

    let result = match Settings::from_env() {
        Ok(settings) => mint_tokens(&settings).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "failed to mint tokens");
            error.exit_code()
        }
    }
}
