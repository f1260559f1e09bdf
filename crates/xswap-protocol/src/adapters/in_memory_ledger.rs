//! Simulated Ledger Adapter
//!
//! Implements `LedgerAdapter` over an in-memory account table.
//!
//! Holding accounts carry an escrow policy instead of a master key: the
//! preimage of the commitment merges the account into the withdrawer, and a
//! refund envelope signed by the withdrawer merges it into the depositor no
//! earlier than its `not_before`. Refund envelopes are ed25519-signed JSON,
//! hex encoded, and bound to the ledger's network label.

use crate::domain::{
    verify_signature, Address, Commitment, LedgerError, PartyKey, RefundEnvelope, RefundTerms,
    SecureSecret, TxRef,
};
use crate::ports::outbound::{LedgerAdapter, TimeSource};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Authorization installed on a holding account at creation.
#[derive(Clone, Debug)]
struct EscrowPolicy {
    withdrawer: Address,
    commitment: Commitment,
    refund_signer: Address,
    master_enabled: bool,
}

#[derive(Clone, Debug, Default)]
struct Account {
    balance: u64,
    escrow: Option<EscrowPolicy>,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Address, Account>,
    /// Closed account -> account it was merged into.
    merged_into: HashMap<Address, Address>,
    /// Closed escrow -> preimage that opened it.
    revealed: HashMap<Address, [u8; 32]>,
    tx_counter: u64,
    pending_failures: u32,
}

impl LedgerState {
    fn next_tx(&mut self, network: &str) -> TxRef {
        self.tx_counter += 1;
        TxRef::new(format!("{}-tx-{}", network, self.tx_counter))
    }

    fn merge(&mut self, account: &Address, destination: &Address) -> Result<u64, LedgerError> {
        if !self.accounts.contains_key(destination) {
            return Err(LedgerError::AccountNotFound(destination.clone()));
        }
        let closed = self
            .accounts
            .remove(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        if let Some(dest) = self.accounts.get_mut(destination) {
            dest.balance += closed.balance;
        }
        self.merged_into.insert(account.clone(), destination.clone());
        Ok(closed.balance)
    }
}

#[derive(Serialize, Deserialize)]
struct SignedRefund {
    terms: RefundTerms,
    signer: Address,
    signature: String,
}

/// Shared handle to a simulated ledger. Clones see the same state.
#[derive(Clone)]
pub struct InMemoryLedger {
    network: String,
    state: Arc<RwLock<LedgerState>>,
    clock: Arc<dyn TimeSource>,
    escrow_reserve: u64,
}

impl InMemoryLedger {
    /// Empty ledger named `network`, reading time from `clock`.
    pub fn new(network: impl Into<String>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            network: network.into(),
            state: Arc::new(RwLock::new(LedgerState::default())),
            clock,
            escrow_reserve: 0,
        }
    }

    /// Require `reserve` to be moved into every new holding account.
    pub fn with_escrow_reserve(mut self, reserve: u64) -> Self {
        self.escrow_reserve = reserve;
        self
    }

    /// Network label.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Create or credit a plain account.
    pub fn fund_account(&self, account: &Address, amount: u64) {
        let mut state = self.state.write();
        state.accounts.entry(account.clone()).or_default().balance += amount;
    }

    /// Balance of an account, `None` if it does not exist.
    pub fn balance_of(&self, account: &Address) -> Option<u64> {
        self.state.read().accounts.get(account).map(|a| a.balance)
    }

    /// Make the next `n` ledger calls fail with a network error.
    pub fn fail_next(&self, n: u32) {
        self.state.write().pending_failures = n;
    }

    /// Re-enable the master key of a holding account, breaking its escrow
    /// guarantees.
    pub fn enable_master_key(&self, account: &Address) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let policy = state
            .accounts
            .get_mut(account)
            .and_then(|a| a.escrow.as_mut())
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        policy.master_enabled = true;
        Ok(())
    }

    fn check_network(&self) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(LedgerError::Network(format!("{} unreachable", self.network)));
        }
        Ok(())
    }

    fn refund_message(&self, terms: &RefundTerms) -> Result<Vec<u8>, LedgerError> {
        let body = serde_json::to_string(terms)
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        Ok(format!("{}:refund:{}", self.network, body).into_bytes())
    }

    fn decode(&self, envelope: &RefundEnvelope) -> Result<SignedRefund, LedgerError> {
        let raw = hex::decode(envelope.as_str())
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        let signed: SignedRefund = serde_json::from_slice(&raw)
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        let message = self.refund_message(&signed.terms)?;
        verify_signature(&signed.signer, &message, &signed.signature)
            .map_err(|_| LedgerError::InvalidEnvelope("signature does not verify".into()))?;
        Ok(signed)
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("network", &self.network)
            .field("escrow_reserve", &self.escrow_reserve)
            .finish()
    }
}

#[async_trait]
impl LedgerAdapter for InMemoryLedger {
    async fn create_escrow(
        &self,
        new_account_key: &PartyKey,
        local_signer: &PartyKey,
        counterparty: &Address,
        commitment: &Commitment,
    ) -> Result<Address, LedgerError> {
        self.check_network()?;
        let escrow = new_account_key.address();
        let funder = local_signer.address();
        if *counterparty == funder {
            return Err(LedgerError::Rejected(
                "counterparty is the funding account".into(),
            ));
        }

        let mut state = self.state.write();
        if state.accounts.contains_key(&escrow) || state.merged_into.contains_key(&escrow) {
            return Err(LedgerError::AccountExists(escrow));
        }
        let available = state
            .accounts
            .get(&funder)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::AccountNotFound(funder.clone()))?;
        if available < self.escrow_reserve {
            return Err(LedgerError::InsufficientFunds {
                needed: self.escrow_reserve,
                available,
            });
        }
        if let Some(source) = state.accounts.get_mut(&funder) {
            source.balance -= self.escrow_reserve;
        }
        state.accounts.insert(
            escrow.clone(),
            Account {
                balance: self.escrow_reserve,
                escrow: Some(EscrowPolicy {
                    withdrawer: counterparty.clone(),
                    commitment: *commitment,
                    refund_signer: counterparty.clone(),
                    master_enabled: false,
                }),
            },
        );

        info!(
            "[xswap] {} escrow {} created for withdrawer {}",
            self.network, escrow, counterparty
        );
        Ok(escrow)
    }

    async fn get_balance(&self, account: &Address) -> Result<u64, LedgerError> {
        self.check_network()?;
        self.balance_of(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))
    }

    async fn fund_escrow(
        &self,
        local_signer: &PartyKey,
        account: &Address,
        amount: u64,
    ) -> Result<TxRef, LedgerError> {
        self.check_network()?;
        let funder = local_signer.address();
        let mut state = self.state.write();
        if !state.accounts.contains_key(account) {
            return Err(LedgerError::AccountNotFound(account.clone()));
        }
        let source = state
            .accounts
            .get_mut(&funder)
            .ok_or_else(|| LedgerError::AccountNotFound(funder.clone()))?;
        if source.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: source.balance,
            });
        }
        source.balance -= amount;
        if let Some(target) = state.accounts.get_mut(account) {
            target.balance += amount;
        }

        debug!("[xswap] {} paid {} into {}", self.network, amount, account);
        Ok(state.next_tx(&self.network))
    }

    async fn build_refund_envelope(
        &self,
        account: &Address,
        signer: &PartyKey,
        depositor: &Address,
        not_before: u64,
        amount: u64,
    ) -> Result<RefundEnvelope, LedgerError> {
        self.check_network()?;
        {
            let state = self.state.read();
            let policy = state
                .accounts
                .get(account)
                .and_then(|a| a.escrow.as_ref())
                .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
            if policy.refund_signer != signer.address() {
                return Err(LedgerError::Unauthorized(format!(
                    "{} may not sign refunds for {}",
                    signer.address(),
                    account
                )));
            }
        }

        let terms = RefundTerms {
            escrow: account.clone(),
            depositor: depositor.clone(),
            amount,
            not_before,
        };
        let message = self.refund_message(&terms)?;
        let signed = SignedRefund {
            signature: signer.sign_hex(&message),
            signer: signer.address(),
            terms,
        };
        let encoded = serde_json::to_vec(&signed)
            .map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        Ok(RefundEnvelope::new(hex::encode(encoded)))
    }

    async fn submit_envelope(&self, envelope: &RefundEnvelope) -> Result<TxRef, LedgerError> {
        self.check_network()?;
        let signed = self.decode(envelope)?;
        let terms = &signed.terms;
        let now = self.clock.now();

        let mut state = self.state.write();
        let policy = state
            .accounts
            .get(&terms.escrow)
            .and_then(|a| a.escrow.clone())
            .ok_or_else(|| LedgerError::AccountNotFound(terms.escrow.clone()))?;
        if policy.refund_signer != signed.signer {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the refund signer of {}",
                signed.signer, terms.escrow
            )));
        }
        if now < terms.not_before {
            return Err(LedgerError::TimelockNotReached {
                now,
                not_before: terms.not_before,
            });
        }

        let refunded = state.merge(&terms.escrow, &terms.depositor)?;
        info!(
            "[xswap] {} escrow {} refunded {} to {}",
            self.network, terms.escrow, refunded, terms.depositor
        );
        Ok(state.next_tx(&self.network))
    }

    async fn withdraw_with_preimage(
        &self,
        account: &Address,
        local_signer: &PartyKey,
        secret: &SecureSecret,
        amount: u64,
    ) -> Result<TxRef, LedgerError> {
        self.check_network()?;
        let mut state = self.state.write();
        let (balance, policy) = state
            .accounts
            .get(account)
            .and_then(|a| a.escrow.clone().map(|p| (a.balance, p)))
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        if !secret.opens(&policy.commitment) {
            return Err(LedgerError::Unauthorized(
                "preimage does not match the escrow commitment".into(),
            ));
        }
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: balance,
            });
        }

        let paid = state.merge(account, &policy.withdrawer)?;
        state.revealed.insert(account.clone(), *secret.as_bytes());
        info!(
            "[xswap] {} escrow {} withdrawn by {} ({} paid to {})",
            self.network,
            account,
            local_signer.address(),
            paid,
            policy.withdrawer
        );
        Ok(state.next_tx(&self.network))
    }

    async fn is_valid_escrow(
        &self,
        account: &Address,
        expected_withdrawer: &Address,
        commitment: &Commitment,
    ) -> Result<bool, LedgerError> {
        self.check_network()?;
        let state = self.state.read();
        let valid = state
            .accounts
            .get(account)
            .and_then(|a| a.escrow.as_ref())
            .map(|p| {
                p.withdrawer == *expected_withdrawer
                    && p.commitment == *commitment
                    && p.refund_signer == *expected_withdrawer
                    && !p.master_enabled
            })
            .unwrap_or(false);
        Ok(valid)
    }

    async fn is_escrow_closed(
        &self,
        account: &Address,
        expected_withdrawer: &Address,
    ) -> Result<bool, LedgerError> {
        self.check_network()?;
        let state = self.state.read();
        Ok(!state.accounts.contains_key(account)
            && state.merged_into.get(account) == Some(expected_withdrawer))
    }

    async fn account_exists(&self, account: &Address) -> Result<bool, LedgerError> {
        self.check_network()?;
        Ok(self.state.read().accounts.contains_key(account))
    }

    fn inspect_envelope(&self, envelope: &RefundEnvelope) -> Result<RefundTerms, LedgerError> {
        Ok(self.decode(envelope)?.terms)
    }

    async fn revealed_preimage(
        &self,
        account: &Address,
    ) -> Result<Option<SecureSecret>, LedgerError> {
        self.check_network()?;
        Ok(self
            .state
            .read()
            .revealed
            .get(account)
            .map(|bytes| SecureSecret::new(*bytes)))
    }
}
