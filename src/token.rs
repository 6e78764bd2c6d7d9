//! SPL token operations expressed over a [`TokenNetwork`].

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::instruction::{initialize_mint, mint_to as mint_to_instruction};
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as SplAccount, Mint};

use crate::error::ProvisionError;
use crate::network::TokenNetwork;

/// Decimal places of every mint this crate creates.
pub const TOKEN_DECIMALS: u8 = 9;

/// Whole tokens minted per run.
pub const TOKENS_TO_MINT: u64 = 100;

/// [`TOKENS_TO_MINT`] in base units.
pub const MINT_AMOUNT: u64 = TOKENS_TO_MINT * 10u64.pow(TOKEN_DECIMALS as u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintDescriptor {
    pub address: Pubkey,
    pub decimals: u8,
    pub mint_authority: Pubkey,
    pub freeze_authority: Option<Pubkey>,
}

/// Balance-holding account for one (owner, mint) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub mint: Pubkey,
    /// Balance in base units.
    pub amount: u64,
}

/// Human-readable amount: `amount / 10^decimals`, trailing zeros trimmed.
pub fn ui_amount(amount: u64, decimals: u8) -> String {
    spl_token::amount_to_ui_amount_string_trimmed(amount, decimals)
}

/// Decodes raw account data owned by `program_owner` into a [`TokenAccount`].
pub fn unpack_token_account(
    address: &Pubkey,
    program_owner: &Pubkey,
    data: &[u8],
) -> Result<TokenAccount, ProvisionError> {
    if *program_owner != spl_token::id() {
        return Err(ProvisionError::Account(format!(
            "{address} is owned by {program_owner}, not the token program"
        )));
    }
    let state = SplAccount::unpack(data).map_err(|e| {
        ProvisionError::Account(format!("cannot decode token account {address}: {e}"))
    })?;
    Ok(TokenAccount {
        address: *address,
        owner: state.owner,
        mint: state.mint,
        amount: state.amount,
    })
}

/// Decodes raw mint data owned by `program_owner` into a [`MintDescriptor`].
///
/// Mints without a mint authority are rejected: their supply is fixed.
pub fn unpack_mint(
    address: &Pubkey,
    program_owner: &Pubkey,
    data: &[u8],
) -> Result<MintDescriptor, ProvisionError> {
    if *program_owner != spl_token::id() {
        return Err(ProvisionError::Account(format!(
            "{address} is owned by {program_owner}, not the token program"
        )));
    }
    let state = Mint::unpack(data)
        .map_err(|e| ProvisionError::Account(format!("cannot decode mint {address}: {e}")))?;
    let mint_authority: Option<Pubkey> = state.mint_authority.into();
    let mint_authority = mint_authority
        .ok_or_else(|| ProvisionError::Account(format!("mint {address} has a fixed supply")))?;
    Ok(MintDescriptor {
        address: *address,
        decimals: state.decimals,
        mint_authority,
        freeze_authority: state.freeze_authority.into(),
    })
}

/// Signs `instructions` with `signers` (fee payer = `payer`), submits them
/// as one transaction and waits for `confirmed` commitment.
async fn submit<N: TokenNetwork>(
    network: &N,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<Signature, ProvisionError> {
    let blockhash = network.latest_blockhash().await?;

    let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
    transaction
        .try_sign(signers, blockhash)
        .map_err(|e| ProvisionError::Transaction(format!("signing failed: {e}")))?;

    let signature = network.send_transaction(&transaction).await?;
    tracing::debug!(%signature, "transaction submitted");

    network
        .confirm_transaction(&signature, CommitmentConfig::confirmed())
        .await?;
    tracing::debug!(%signature, "transaction confirmed");

    Ok(signature)
}

/// Creates and initializes a new mint with `payer` as mint and freeze authority.
///
/// Account allocation and mint initialization travel in one transaction,
/// signed by both the fresh mint keypair and `payer`, so either both land or
/// neither does.
pub async fn create_mint<N: TokenNetwork>(
    network: &N,
    payer: &Keypair,
    decimals: u8,
) -> Result<MintDescriptor, ProvisionError> {
    let mint_keypair = Keypair::generate(&mut rand::thread_rng());
    let mint = mint_keypair.pubkey();
    let authority = payer.pubkey();

    let lamports = network.minimum_balance_for_rent_exemption(Mint::LEN).await?;
    tracing::debug!(%mint, lamports, "rent exempt minimum for mint");

    let create_account_ix = system_instruction::create_account(
        &authority,
        &mint,
        lamports,
        Mint::LEN as u64,
        &spl_token::id(),
    );
    let initialize_mint_ix = initialize_mint(
        &spl_token::id(),
        &mint,
        &authority,
        Some(&authority),
        decimals,
    )
    .map_err(|e| ProvisionError::Transaction(format!("building initialize_mint: {e}")))?;

    let signature = submit(
        network,
        &[create_account_ix, initialize_mint_ix],
        payer,
        &[payer, &mint_keypair],
    )
    .await?;
    tracing::info!(%mint, %signature, "token mint created");

    Ok(MintDescriptor {
        address: mint,
        decimals,
        mint_authority: authority,
        freeze_authority: Some(authority),
    })
}

/// Loads an existing mint and checks that `authority` can mint `decimals`
/// precision tokens from it.
pub async fn load_mint<N: TokenNetwork>(
    network: &N,
    address: &Pubkey,
    authority: &Pubkey,
    decimals: u8,
) -> Result<MintDescriptor, ProvisionError> {
    let mint = network
        .mint_account(address)
        .await?
        .ok_or_else(|| ProvisionError::Account(format!("no mint at {address}")))?;
    if mint.decimals != decimals {
        return Err(ProvisionError::Account(format!(
            "mint {address} has {} decimals, expected {decimals}",
            mint.decimals
        )));
    }
    if mint.mint_authority != *authority {
        return Err(ProvisionError::Account(format!(
            "mint {address} is controlled by {}, not {authority}",
            mint.mint_authority
        )));
    }
    Ok(mint)
}

/// Returns the associated token account of (`owner`, `mint`), creating it
/// when it does not exist yet.
///
/// Idempotent: an existing account is returned as-is and no transaction is
/// submitted. The creation instruction is the idempotent variant, so a
/// concurrent creator cannot make this call fail either.
pub async fn get_or_create_associated_account<N: TokenNetwork>(
    network: &N,
    payer: &Keypair,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<TokenAccount, ProvisionError> {
    let address = get_associated_token_address(owner, mint);

    if let Some(account) = network.token_account(&address).await? {
        tracing::debug!(%address, amount = account.amount, "reusing associated token account");
        return check_association(account, owner, mint);
    }

    let ix = create_associated_token_account_idempotent(&payer.pubkey(), owner, mint, &spl_token::id());
    let signature = submit(network, &[ix], payer, &[payer])
        .await
        .map_err(|e| match e {
            ProvisionError::Transaction(msg) => ProvisionError::Account(format!(
                "creating associated token account {address}: {msg}"
            )),
            other => other,
        })?;
    tracing::debug!(%address, %signature, "associated token account created");

    let account = network.token_account(&address).await?.ok_or_else(|| {
        ProvisionError::Account(format!("{address} not found after creation"))
    })?;
    check_association(account, owner, mint)
}

fn check_association(
    account: TokenAccount,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<TokenAccount, ProvisionError> {
    if account.owner != *owner || account.mint != *mint {
        return Err(ProvisionError::Account(format!(
            "{} belongs to owner {} and mint {}, expected {owner} and {mint}",
            account.address, account.owner, account.mint
        )));
    }
    Ok(account)
}

/// Mints `amount` base units of `mint` into `destination`.
///
/// Not idempotent: every call adds `amount` to the balance.
pub async fn mint_to<N: TokenNetwork>(
    network: &N,
    payer: &Keypair,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Keypair,
    amount: u64,
) -> Result<Signature, ProvisionError> {
    let ix = mint_to_instruction(
        &spl_token::id(),
        mint,
        destination,
        &authority.pubkey(),
        &[],
        amount,
    )
    .map_err(|e| ProvisionError::Transaction(format!("building mint_to: {e}")))?;

    let signers: Vec<&Keypair> = if authority.pubkey() == payer.pubkey() {
        vec![payer]
    } else {
        vec![payer, authority]
    };
    submit(network, &[ix], payer, &signers).await
}

/// Reads the token account at `address`; a missing account is an error.
pub async fn get_account<N: TokenNetwork>(
    network: &N,
    address: &Pubkey,
) -> Result<TokenAccount, ProvisionError> {
    network
        .token_account(address)
        .await?
        .ok_or_else(|| ProvisionError::Account(format!("no token account at {address}")))
}
