//! Settings loaded from the process environment.
//!
//! Binaries call `dotenv::dotenv()` first so a `.env` file next to the
//! working directory behaves like exported variables.

use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use crate::error::ProvisionError;

pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";
pub const RPC_URL_VAR: &str = "RPC_URL";
pub const TOKEN_MINT_VAR: &str = "TOKEN_MINT";
pub const CALL_TIMEOUT_VAR: &str = "CALL_TIMEOUT_SECS";

pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Raw length of an ed25519 secret key as stored by Solana tooling
/// (32 secret bytes followed by the 32-byte public key).
pub const SECRET_KEY_LEN: usize = 64;

#[derive(Debug)]
pub struct Settings {
    /// Fee payer, mint authority, freeze authority and token account owner.
    pub signer: Keypair,
    pub rpc_url: String,
    /// Mint to reuse; `None` creates a fresh one.
    pub existing_mint: Option<Pubkey>,
    pub call_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ProvisionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    ///
    /// The secret key is resolved first: a missing key is a
    /// [`ProvisionError::Config`], an undecodable one a [`ProvisionError::Decode`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProvisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = non_empty(lookup(PRIVATE_KEY_VAR)).ok_or_else(|| {
            ProvisionError::Config(format!("{PRIVATE_KEY_VAR} environment variable is not set"))
        })?;
        let signer = decode_secret_key(&secret)?;

        let rpc_url = non_empty(lookup(RPC_URL_VAR)).unwrap_or_else(|| DEVNET_URL.to_string());

        let existing_mint = non_empty(lookup(TOKEN_MINT_VAR))
            .map(|value| {
                Pubkey::from_str(&value).map_err(|e| {
                    ProvisionError::Config(format!("{TOKEN_MINT_VAR} is not a valid address: {e}"))
                })
            })
            .transpose()?;

        let call_timeout = match non_empty(lookup(CALL_TIMEOUT_VAR)) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ProvisionError::Config(format!(
                        "{CALL_TIMEOUT_VAR} must be a positive number of seconds, got {value:?}"
                    )))
                }
            },
            None => DEFAULT_CALL_TIMEOUT,
        };

        Ok(Self {
            signer,
            rpc_url,
            existing_mint,
            call_timeout,
        })
    }

    /// The configured mint, for stages that cannot create one.
    pub fn require_mint(&self) -> Result<Pubkey, ProvisionError> {
        self.existing_mint.ok_or_else(|| {
            ProvisionError::Config(format!("{TOKEN_MINT_VAR} environment variable is not set"))
        })
    }

    pub fn cluster(&self) -> Cluster {
        Cluster::from_url(&self.rpc_url)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decodes a secret key in Base58, or as the JSON byte array written by
/// `solana-keygen`.
pub fn decode_secret_key(encoded: &str) -> Result<Keypair, ProvisionError> {
    let encoded = encoded.trim();
    let bytes: Vec<u8> = if encoded.starts_with('[') {
        serde_json::from_str(encoded)
            .map_err(|e| ProvisionError::Decode(format!("invalid byte array: {e}")))?
    } else {
        bs58::decode(encoded)
            .into_vec()
            .map_err(|e| ProvisionError::Decode(format!("invalid base58: {e}")))?
    };

    if bytes.len() != SECRET_KEY_LEN {
        return Err(ProvisionError::Decode(format!(
            "expected {SECRET_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    Keypair::try_from(bytes.as_slice()).map_err(|e| ProvisionError::Decode(e.to_string()))
}

pub fn encode_secret_key(keypair: &Keypair) -> String {
    bs58::encode(keypair.to_bytes()).into_string()
}

/// Cluster an RPC endpoint belongs to, as understood by the block explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cluster {
    Mainnet,
    Devnet,
    Testnet,
    Localnet,
    Custom(String),
}

impl Cluster {
    pub fn from_url(url: &str) -> Self {
        if url.contains("devnet") {
            Self::Devnet
        } else if url.contains("testnet") {
            Self::Testnet
        } else if url.contains("mainnet") {
            Self::Mainnet
        } else if url.contains("127.0.0.1") || url.contains("localhost") {
            Self::Localnet
        } else {
            Self::Custom(url.to_string())
        }
    }

    fn query(&self) -> String {
        match self {
            Self::Mainnet => String::new(),
            Self::Devnet => "?cluster=devnet".to_string(),
            Self::Testnet => "?cluster=testnet".to_string(),
            Self::Localnet => "?cluster=custom&customUrl=http%3A%2F%2Flocalhost%3A8899".to_string(),
            Self::Custom(url) => format!("?cluster=custom&customUrl={url}"),
        }
    }

    pub fn address_url(&self, address: &Pubkey) -> String {
        format!("https://explorer.solana.com/address/{address}{}", self.query())
    }

    pub fn transaction_url(&self, signature: &impl std::fmt::Display) -> String {
        format!("https://explorer.solana.com/tx/{signature}{}", self.query())
    }
}
