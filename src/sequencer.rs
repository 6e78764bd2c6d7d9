//! The provisioning workflow.
//!
//! Stages run strictly in order, each awaiting the previous one:
//!
//! ```text
//! Idle -> CredentialsLoaded -> Connected -> MintCreated
//!      -> TokenAccountReady -> Minted -> Reported
//! ```
//!
//! A failure stops the run and is returned together with the last stage
//! reached. Mint creation is the only stage with its own containment: its
//! failure is logged on the spot and nothing after it is attempted.

use std::fmt;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Signature, Signer};

use crate::config::Settings;
use crate::error::{ErrorKind, ProvisionError};
use crate::network::{Timed, TokenNetwork};
use crate::token::{self, MintDescriptor, TokenAccount, MINT_AMOUNT, TOKEN_DECIMALS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    CredentialsLoaded,
    Connected,
    MintCreated,
    TokenAccountReady,
    Minted,
    Reported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CredentialsLoaded => "credentials loaded",
            Self::Connected => "connected",
            Self::MintCreated => "mint created",
            Self::TokenAccountReady => "token account ready",
            Self::Minted => "minted",
            Self::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// A run that ended before [`Stage::Reported`].
#[derive(Debug)]
pub struct StageFailure {
    /// Last stage completed before the error.
    pub stage: Stage,
    pub error: ProvisionError,
}

impl StageFailure {
    fn new(stage: Stage, error: ProvisionError) -> Self {
        Self { stage, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// True when the run stopped inside the mint boundary: creating a new
    /// mint or validating a reused one.
    pub fn is_mint_creation(&self) -> bool {
        self.stage == Stage::Connected
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after stage '{}': {}", self.kind(), self.stage, self.error)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub stage: Stage,
    pub wallet: Pubkey,
    pub mint: MintDescriptor,
    /// False when an existing mint was reused.
    pub mint_created: bool,
    pub token_account: TokenAccount,
    pub minted: u64,
    pub mint_signature: Signature,
}

impl ProvisionReport {
    /// Final balance in base units.
    pub fn balance(&self) -> u64 {
        self.token_account.amount
    }

    /// Final balance in whole tokens.
    pub fn ui_balance(&self) -> String {
        token::ui_amount(self.token_account.amount, self.mint.decimals)
    }
}

/// Loads settings through `lookup`, connects with `connect` and runs
/// [`provision`].
///
/// `connect` is only called once the credentials decoded, so a missing or
/// malformed secret never touches the network.
pub async fn run<N, L, C>(lookup: L, connect: C) -> Result<ProvisionReport, StageFailure>
where
    N: TokenNetwork,
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Settings) -> N,
{
    let settings = Settings::from_lookup(lookup).map_err(|e| StageFailure::new(Stage::Idle, e))?;
    tracing::info!(
        wallet = %settings.signer.pubkey(),
        stage = %Stage::CredentialsLoaded,
        "wallet loaded"
    );

    let network = connect(&settings);
    provision(&network, &settings).await
}

/// Runs the workflow against an already connected `network`.
pub async fn provision<N: TokenNetwork>(
    network: &N,
    settings: &Settings,
) -> Result<ProvisionReport, StageFailure> {
    let network = Timed::new(network, settings.call_timeout);
    let payer = &settings.signer;
    let wallet = payer.pubkey();

    let (mint, mint_created) = match settings.existing_mint {
        Some(address) => {
            tracing::info!(mint = %address, "using existing token mint");
            match token::load_mint(&network, &address, &wallet, TOKEN_DECIMALS).await {
                Ok(mint) => (mint, false),
                Err(error) => {
                    tracing::error!(%error, "existing token mint cannot be used");
                    return Err(StageFailure::new(Stage::Connected, error));
                }
            }
        }
        None => {
            tracing::info!("starting token creation");
            match token::create_mint(&network, payer, TOKEN_DECIMALS).await {
                Ok(mint) => (mint, true),
                Err(error) => {
                    tracing::error!(%error, "failed to create token mint");
                    return Err(StageFailure::new(Stage::Connected, error));
                }
            }
        }
    };
    let mut stage = Stage::MintCreated;

    let token_account =
        token::get_or_create_associated_account(&network, payer, &wallet, &mint.address)
            .await
            .map_err(|e| StageFailure::new(stage, e))?;
    stage = Stage::TokenAccountReady;
    tracing::info!(address = %token_account.address, "token account ready");

    let mint_signature = token::mint_to(
        &network,
        payer,
        &mint.address,
        &token_account.address,
        payer,
        MINT_AMOUNT,
    )
    .await
    .map_err(|e| StageFailure::new(stage, e))?;
    stage = Stage::Minted;
    tracing::info!(
        amount = %token::ui_amount(MINT_AMOUNT, mint.decimals),
        account = %token_account.address,
        signature = %mint_signature,
        "tokens minted"
    );

    let token_account = token::get_account(&network, &token_account.address)
        .await
        .map_err(|e| StageFailure::new(stage, e))?;

    Ok(ProvisionReport {
        stage: Stage::Reported,
        wallet,
        mint,
        mint_created,
        token_account,
        minted: MINT_AMOUNT,
        mint_signature,
    })
}
