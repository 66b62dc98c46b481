//! # Pending Delta Sets
//!
//! `PendingState` accumulates the effects of a block's transactions on top of
//! a parent `StateView`. The view is never written. Each transaction runs
//! against a scratch map that is merged only when every check passes, so a
//! rejected transaction leaves the pending set exactly as it was.
//!
//! ## Check Order
//!
//! 1. Signature
//! 2. Sequence (`current + 1`)
//! 3. Funds for `fee + debit`
//! 4. Payload rules

use std::collections::BTreeMap;

use sc_03_pos_rules::ProtocolParams;
use shared_crypto::sha256;
use shared_types::{Amount, Hash, Height, PublicKey, Transaction, TxPayload};

use crate::domain::account::{contract_address, Account, LockedFunds};
use crate::domain::errors::RejectReason;
use crate::domain::layers::StateDelta;
use crate::domain::view::StateView;

/// Balances after a successful application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: Hash,
    pub fee: Amount,
    /// New balance of every account the transaction touched.
    pub balances: Vec<(PublicKey, Amount)>,
}

/// Result of applying one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Accepted(Receipt),
    Rejected(RejectReason),
}

impl TxOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TxOutcome::Accepted(_))
    }

    /// Convert into a `Result`, for `?` chains.
    pub fn into_result(self) -> Result<Receipt, RejectReason> {
        match self {
            TxOutcome::Accepted(receipt) => Ok(receipt),
            TxOutcome::Rejected(reason) => Err(reason),
        }
    }
}

/// Delta set for one block under construction.
#[derive(Debug, Clone)]
pub struct PendingState {
    view: StateView,
    params: ProtocolParams,
    height: Height,
    changes: BTreeMap<PublicKey, Account>,
    fees: Amount,
    applied: usize,
}

type Scratch = BTreeMap<PublicKey, Account>;

impl PendingState {
    pub(crate) fn new(view: StateView, params: ProtocolParams) -> Self {
        let height = view.height() + 1;
        Self {
            view,
            params,
            height,
            changes: BTreeMap::new(),
            fees: 0,
            applied: 0,
        }
    }

    /// Height of the block being built.
    pub fn height(&self) -> Height {
        self.height
    }

    /// The parent view.
    pub fn view(&self) -> &StateView {
        &self.view
    }

    /// Accounts changed so far.
    pub fn changes(&self) -> &BTreeMap<PublicKey, Account> {
        &self.changes
    }

    /// Fees collected so far.
    pub fn fees(&self) -> Amount {
        self.fees
    }

    /// Number of transactions applied.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Current account value including pending changes.
    pub fn account(&self, key: &PublicKey) -> Account {
        self.changes
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.view.account(key))
    }

    /// Apply `tx`. On rejection nothing changes.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> TxOutcome {
        self.apply(tx, true)
    }

    /// Apply `tx` whose signature has already been checked, skipping only
    /// that step. For transactions taken from the pool or a committed block.
    pub fn apply_verified(&mut self, tx: &Transaction) -> TxOutcome {
        self.apply(tx, false)
    }

    fn apply(&mut self, tx: &Transaction, check_signature: bool) -> TxOutcome {
        let mut scratch = Scratch::new();
        match self.try_apply(tx, check_signature, &mut scratch) {
            Ok((receipt, fees)) => {
                self.changes.extend(scratch);
                self.fees = fees;
                self.applied += 1;
                TxOutcome::Accepted(receipt)
            }
            Err(reason) => TxOutcome::Rejected(reason),
        }
    }

    /// Close the block: credit fees and reward to `proposer`, locked for
    /// `maturity` blocks, and return the delta against the parent view.
    pub fn finish(mut self, block_hash: Hash, proposer: &PublicKey) -> Result<StateDelta, RejectReason> {
        let credit = self
            .fees
            .checked_add(self.params.block_reward)
            .ok_or(RejectReason::Overflow)?;
        if credit > 0 {
            let mut account = self.account(proposer);
            account.locked.push(LockedFunds {
                amount: credit,
                unlock_height: self.height + self.params.maturity,
            });
            self.changes.insert(*proposer, account);
        }

        let previous = self
            .changes
            .keys()
            .map(|key| (*key, self.view.get(key).cloned()))
            .collect();

        Ok(StateDelta {
            block_hash,
            parent_hash: self.view.block_hash(),
            height: self.height,
            changes: self.changes,
            previous,
            fees: self.fees,
        })
    }

    fn load(&self, scratch: &Scratch, key: &PublicKey) -> Account {
        scratch
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.account(key))
    }

    fn try_apply(
        &self,
        tx: &Transaction,
        check_signature: bool,
        scratch: &mut Scratch,
    ) -> Result<(Receipt, Amount), RejectReason> {
        if check_signature && !tx.verify_signature() {
            return Err(RejectReason::BadSignature);
        }

        let body = &tx.body;
        let mut sender = self.load(scratch, &body.sender);

        let expected = sender.sequence + 1;
        if body.sequence != expected {
            return Err(RejectReason::BadSequence {
                expected,
                got: body.sequence,
            });
        }

        sender.release_matured(self.height)?;
        let required = body
            .fee
            .checked_add(body.payload.debit())
            .ok_or(RejectReason::Overflow)?;
        if sender.balance < required {
            return Err(RejectReason::InsufficientFunds {
                required,
                available: sender.balance,
            });
        }
        sender.balance -= required;
        sender.sequence = body.sequence;

        match &body.payload {
            TxPayload::Transfer { to, amount } => {
                scratch.insert(body.sender, sender);
                credit(self, scratch, to, *amount)?;
            }
            TxPayload::Stake { amount } => {
                if *amount == 0 {
                    return Err(RejectReason::MalformedPayload("zero stake".into()));
                }
                sender.stake = sender
                    .stake
                    .checked_add(*amount)
                    .ok_or(RejectReason::Overflow)?;
                sender.stake_matures_at = self.height + self.params.maturity;
                scratch.insert(body.sender, sender);
            }
            TxPayload::Unstake { amount } => {
                if *amount == 0 {
                    return Err(RejectReason::MalformedPayload("zero unstake".into()));
                }
                if sender.stake < *amount {
                    return Err(RejectReason::InsufficientStake {
                        staked: sender.stake,
                        requested: *amount,
                    });
                }
                if self.height < sender.stake_matures_at {
                    return Err(RejectReason::StakeImmature {
                        matures_at: sender.stake_matures_at,
                    });
                }
                sender.stake -= amount;
                sender.balance = sender
                    .balance
                    .checked_add(*amount)
                    .ok_or(RejectReason::Overflow)?;
                scratch.insert(body.sender, sender);
            }
            TxPayload::ContractCreate { code, endowment } => {
                if code.is_empty() || code.len() > self.params.max_code_size {
                    return Err(RejectReason::MalformedPayload(format!(
                        "code size {} outside 1..={}",
                        code.len(),
                        self.params.max_code_size
                    )));
                }
                scratch.insert(body.sender, sender);
                let address = contract_address(&body.sender, body.sequence);
                let mut contract = self.load(scratch, &address);
                if contract.code_hash.is_some() {
                    return Err(RejectReason::ContractExists);
                }
                contract.code_hash = Some(sha256(code));
                contract.balance = contract
                    .balance
                    .checked_add(*endowment)
                    .ok_or(RejectReason::Overflow)?;
                scratch.insert(address, contract);
            }
            TxPayload::ContractCall {
                contract, amount, ..
            } => {
                if self.load(scratch, contract).code_hash.is_none() {
                    return Err(RejectReason::UnknownContract);
                }
                scratch.insert(body.sender, sender);
                credit(self, scratch, contract, *amount)?;
            }
        }

        let fees = self
            .fees
            .checked_add(body.fee)
            .ok_or(RejectReason::Overflow)?;
        let receipt = Receipt {
            tx_hash: tx.hash(),
            fee: body.fee,
            balances: scratch.iter().map(|(k, a)| (*k, a.balance)).collect(),
        };
        Ok((receipt, fees))
    }
}

fn credit(
    pending: &PendingState,
    scratch: &mut Scratch,
    to: &PublicKey,
    amount: Amount,
) -> Result<(), RejectReason> {
    let mut recipient = pending.load(scratch, to);
    recipient.balance = recipient
        .balance
        .checked_add(amount)
        .ok_or(RejectReason::Overflow)?;
    scratch.insert(*to, recipient);
    Ok(())
}
