//! In-memory [`TokenNetwork`] that executes the system, token and
//! associated-token-account instructions the crate submits.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_token::instruction::TokenInstruction;

use token_provisioner::network::TokenNetwork;
use token_provisioner::token::{MintDescriptor, TokenAccount};
use token_provisioner::{ProvisionError, Settings};

pub fn settings(signer: Keypair, existing_mint: Option<Pubkey>) -> Settings {
    Settings {
        signer,
        rpc_url: "memory".to_string(),
        existing_mint,
        call_timeout: Duration::from_secs(5),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintState {
    pub decimals: u8,
    pub mint_authority: Pubkey,
    pub freeze_authority: Option<Pubkey>,
    pub supply: u64,
}

#[derive(Default, Clone)]
struct Ledger {
    allocated: HashSet<Pubkey>,
    mints: HashMap<Pubkey, MintState>,
    token_accounts: HashMap<Pubkey, TokenAccount>,
}

#[derive(Default)]
struct State {
    ledger: Ledger,
    pending: HashMap<Signature, Transaction>,
    submitted: Vec<Transaction>,
    calls: Vec<&'static str>,
    fail_confirmations: bool,
    stall_blockhash: bool,
}

#[derive(Default)]
pub struct MemoryNetwork {
    state: Mutex<State>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every confirmation reports the transaction as failed.
    pub fn fail_confirmations(self) -> Self {
        self.state.lock().unwrap().fail_confirmations = true;
        self
    }

    /// `latest_blockhash` never resolves.
    pub fn stall_blockhash(self) -> Self {
        self.state.lock().unwrap().stall_blockhash = true;
        self
    }

    pub fn seed_mint(&self, mint: Pubkey, decimals: u8, authority: Pubkey, supply: u64) {
        let mut state = self.state.lock().unwrap();
        state.ledger.allocated.insert(mint);
        state.ledger.mints.insert(
            mint,
            MintState {
                decimals,
                mint_authority: authority,
                freeze_authority: Some(authority),
                supply,
            },
        );
    }

    /// Seeds the associated token account of (`owner`, `mint`) and returns its address.
    pub fn seed_token_account(&self, owner: Pubkey, mint: Pubkey, amount: u64) -> Pubkey {
        let address = get_associated_token_address(&owner, &mint);
        let mut state = self.state.lock().unwrap();
        state.ledger.allocated.insert(address);
        state.ledger.token_accounts.insert(
            address,
            TokenAccount {
                address,
                owner,
                mint,
                amount,
            },
        );
        address
    }

    pub fn mint(&self, mint: &Pubkey) -> Option<MintState> {
        self.state.lock().unwrap().ledger.mints.get(mint).copied()
    }

    pub fn balance(&self, account: &Pubkey) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .ledger
            .token_accounts
            .get(account)
            .map(|a| a.amount)
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub fn submitted(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    /// Number of submitted instructions addressed to `program_id`.
    pub fn instructions_for(&self, program_id: &Pubkey) -> usize {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .flat_map(|tx| {
                tx.message
                    .instructions
                    .iter()
                    .map(move |ix| tx.message.account_keys[ix.program_id_index as usize])
            })
            .filter(|id| id == program_id)
            .count()
    }

    /// Number of submitted `MintTo` instructions.
    pub fn mint_to_instructions(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .flat_map(|tx| {
                tx.message.instructions.iter().filter(move |ix| {
                    tx.message.account_keys[ix.program_id_index as usize] == spl_token::id()
                        && matches!(
                            TokenInstruction::unpack(&ix.data),
                            Ok(TokenInstruction::MintTo { .. })
                        )
                })
            })
            .count()
    }
}

fn fail(msg: impl Into<String>) -> ProvisionError {
    ProvisionError::Transaction(msg.into())
}

impl Ledger {
    fn execute(&mut self, tx: &Transaction) -> Result<(), ProvisionError> {
        let keys = &tx.message.account_keys;
        for ix in &tx.message.instructions {
            let program_id = keys[ix.program_id_index as usize];
            let accounts: Vec<Pubkey> = ix.accounts.iter().map(|i| keys[*i as usize]).collect();

            if program_id == system_program::id() {
                self.create_account(accounts[1])?;
            } else if program_id == spl_token::id() {
                self.token_instruction(&accounts, &ix.data)?;
            } else if program_id == spl_associated_token_account::id() {
                let idempotent = ix.data.first() == Some(&1);
                self.create_associated(&accounts, idempotent)?;
            } else {
                return Err(fail(format!("unsupported program {program_id}")));
            }
        }
        Ok(())
    }

    fn create_account(&mut self, address: Pubkey) -> Result<(), ProvisionError> {
        if !self.allocated.insert(address) {
            return Err(fail(format!("account {address} already in use")));
        }
        Ok(())
    }

    fn token_instruction(&mut self, accounts: &[Pubkey], data: &[u8]) -> Result<(), ProvisionError> {
        let instruction = TokenInstruction::unpack(data).map_err(|e| fail(e.to_string()))?;
        match instruction {
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                freeze_authority,
            } => {
                let mint = accounts[0];
                if !self.allocated.contains(&mint) {
                    return Err(fail(format!("mint {mint} not allocated")));
                }
                if self.mints.contains_key(&mint) {
                    return Err(fail(format!("mint {mint} already initialized")));
                }
                self.mints.insert(
                    mint,
                    MintState {
                        decimals,
                        mint_authority,
                        freeze_authority: freeze_authority.into(),
                        supply: 0,
                    },
                );
                Ok(())
            }
            TokenInstruction::MintTo { amount } => {
                let (mint, destination, authority) = (accounts[0], accounts[1], accounts[2]);
                let state = self
                    .mints
                    .get_mut(&mint)
                    .ok_or_else(|| fail(format!("unknown mint {mint}")))?;
                if state.mint_authority != authority {
                    return Err(fail("owner does not match mint authority"));
                }
                let account = self
                    .token_accounts
                    .get_mut(&destination)
                    .ok_or_else(|| fail(format!("unknown token account {destination}")))?;
                if account.mint != mint {
                    return Err(fail("mint mismatch"));
                }
                account.amount = account
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| fail("overflow"))?;
                state.supply += amount;
                Ok(())
            }
            _ => Err(fail("unsupported token instruction")),
        }
    }

    fn create_associated(&mut self, accounts: &[Pubkey], idempotent: bool) -> Result<(), ProvisionError> {
        let (address, wallet, mint) = (accounts[1], accounts[2], accounts[3]);
        if self.token_accounts.contains_key(&address) {
            return if idempotent {
                Ok(())
            } else {
                Err(fail(format!("account {address} already in use")))
            };
        }
        if !self.mints.contains_key(&mint) {
            return Err(fail(format!("unknown mint {mint}")));
        }
        if get_associated_token_address(&wallet, &mint) != address {
            return Err(fail("invalid associated address"));
        }
        self.allocated.insert(address);
        self.token_accounts.insert(
            address,
            TokenAccount {
                address,
                owner: wallet,
                mint,
                amount: 0,
            },
        );
        Ok(())
    }
}

impl TokenNetwork for MemoryNetwork {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ProvisionError> {
        self.state.lock().unwrap().calls.push("rent");
        Ok(890_880 + 6_960 * data_len as u64)
    }

    async fn latest_blockhash(&self) -> Result<Hash, ProvisionError> {
        let stall = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("blockhash");
            state.stall_blockhash
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ProvisionError> {
        transaction
            .verify()
            .map_err(|e| fail(format!("signature verification failed: {e}")))?;
        let signature = transaction.signatures[0];

        let mut state = self.state.lock().unwrap();
        state.calls.push("send");
        state.submitted.push(transaction.clone());
        state.pending.insert(signature, transaction.clone());
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<(), ProvisionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("confirm");
        let tx = state
            .pending
            .remove(signature)
            .ok_or_else(|| fail(format!("unknown signature {signature}")))?;
        if state.fail_confirmations {
            return Err(fail(format!("transaction {signature} failed: simulated")));
        }

        // all-or-nothing, like the runtime
        let mut ledger = state.ledger.clone();
        ledger.execute(&tx)?;
        state.ledger = ledger;
        Ok(())
    }

    async fn token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>, ProvisionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("token_account");
        Ok(state.ledger.token_accounts.get(address).copied())
    }

    async fn mint_account(&self, address: &Pubkey) -> Result<Option<MintDescriptor>, ProvisionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("mint_account");
        Ok(state.ledger.mints.get(address).map(|mint| MintDescriptor {
            address: *address,
            decimals: mint.decimals,
            mint_authority: mint.mint_authority,
            freeze_authority: mint.freeze_authority,
        }))
    }
}
