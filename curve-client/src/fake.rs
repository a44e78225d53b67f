//! In-memory [`LedgerClient`] for tests.
//!
//! Records every call, deducts a fixed fee per confirmed transaction, and can
//! be told to fail a given submission or balance read, or to credit the
//! wallet mid-run.

use {
    crate::{
        error::{CurveClientError, Result},
        ledger::{LedgerClient, MemcmpFilter, SubmitOptions},
    },
    async_trait::async_trait,
    parking_lot::Mutex,
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    solana_transaction::Transaction,
    std::collections::HashMap,
};

/// Lamports deducted for every confirmed transaction.
pub const DEFAULT_FEE_PER_TRANSACTION: u64 = 15_000_000;

/// Per-method call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub get_balance: usize,
    pub get_latest_blockhash: usize,
    pub send_and_confirm: usize,
    pub get_account_data: usize,
    pub get_program_accounts: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.get_balance
            + self.get_latest_blockhash
            + self.send_and_confirm
            + self.get_account_data
            + self.get_program_accounts
    }
}

#[derive(Default)]
struct State {
    balance: u64,
    fee_per_transaction: u64,
    calls: CallCounts,
    blockhash_seed: u64,
    failing_submissions: Vec<usize>,
    fail_balance_read: Option<usize>,
    deposits: Vec<(usize, u64)>,
    submitted: Vec<(Transaction, SubmitOptions)>,
    accounts: HashMap<Pubkey, (Pubkey, Vec<u8>)>,
}

pub struct FakeLedger {
    state: Mutex<State>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new(10_000_000_000)
    }
}

impl FakeLedger {
    /// A ledger where every address holds `balance` lamports.
    pub fn new(balance: u64) -> Self {
        Self {
            state: Mutex::new(State {
                balance,
                fee_per_transaction: DEFAULT_FEE_PER_TRANSACTION,
                ..State::default()
            }),
        }
    }

    /// Fail the `nth` submission (1-based).
    pub fn fail_submission(&self, nth: usize) {
        self.state.lock().failing_submissions.push(nth);
    }

    /// Fail the `nth` balance read (1-based).
    pub fn fail_balance_read(&self, nth: usize) {
        self.state.lock().fail_balance_read = Some(nth);
    }

    pub fn set_fee_per_transaction(&self, lamports: u64) {
        self.state.lock().fee_per_transaction = lamports;
    }

    /// Credit `lamports` just before the `nth` balance read (1-based), as if
    /// an outside party funded the wallet in the meantime.
    pub fn deposit_before_balance_read(&self, nth: usize, lamports: u64) {
        self.state.lock().deposits.push((nth, lamports));
    }

    pub fn insert_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state.lock().accounts.insert(address, (owner, data));
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Transactions that were confirmed, with the options they were sent with.
    pub fn submitted(&self) -> Vec<(Transaction, SubmitOptions)> {
        self.state.lock().submitted.clone()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_balance(&self, _address: &Pubkey) -> Result<u64> {
        let mut state = self.state.lock();
        state.calls.get_balance += 1;
        let nth = state.calls.get_balance;
        if state.fail_balance_read == Some(nth) {
            return Err(CurveClientError::InvalidParameter(
                "injected balance failure".to_string(),
            ));
        }
        let credited: u64 = state
            .deposits
            .iter()
            .filter(|(at, _)| *at == nth)
            .map(|(_, lamports)| lamports)
            .sum();
        state.balance += credited;
        Ok(state.balance)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        let mut state = self.state.lock();
        state.calls.get_latest_blockhash += 1;
        state.blockhash_seed += 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&state.blockhash_seed.to_le_bytes());
        Ok(Hash::new_from_array(bytes))
    }

    async fn send_and_confirm(
        &self,
        transaction: &Transaction,
        options: SubmitOptions,
    ) -> Result<Signature> {
        let mut state = self.state.lock();
        state.calls.send_and_confirm += 1;
        let signature = transaction.signatures.first().copied().unwrap_or_default();
        if !transaction.is_signed() {
            return Err(CurveClientError::TransactionFailed {
                signature,
                reason: "missing signature".to_string(),
            });
        }
        if state
            .failing_submissions
            .contains(&state.calls.send_and_confirm)
        {
            return Err(CurveClientError::TransactionFailed {
                signature,
                reason: "injected submission failure".to_string(),
            });
        }
        state.balance = state.balance.saturating_sub(state.fee_per_transaction);
        state.submitted.push((transaction.clone(), options));
        Ok(signature)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.calls.get_account_data += 1;
        state
            .accounts
            .get(address)
            .map(|(_, data)| data.clone())
            .ok_or(CurveClientError::AccountNotFound(*address))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let mut state = self.state.lock();
        state.calls.get_program_accounts += 1;
        Ok(state
            .accounts
            .iter()
            .filter(|(_, (owner, data))| {
                owner == program_id && filters.iter().all(|filter| filter.matches(data))
            })
            .map(|(address, (_, data))| (*address, data.clone()))
            .collect())
    }
}
