//! # Accounts
//!
//! One record per public key. Stake and rewards are tracked separately from
//! the spendable balance until they mature.

use serde::{Deserialize, Serialize};
use shared_crypto::sha256_many;
use shared_types::{Amount, Hash, Height, PublicKey};

use crate::domain::errors::RejectReason;

/// Funds credited but not yet spendable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFunds {
    pub amount: Amount,
    /// First height at which the funds count as spendable.
    pub unlock_height: Height,
}

/// Account and stake state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Spendable balance.
    pub balance: Amount,
    /// Bonded stake.
    pub stake: Amount,
    /// Sequence of the last applied transaction from this account.
    pub sequence: u64,
    /// First height at which `stake` counts as matured.
    pub stake_matures_at: Height,
    /// Rewards waiting for maturity.
    pub locked: Vec<LockedFunds>,
    /// Set for contract accounts.
    pub code_hash: Option<Hash>,
}

impl Account {
    /// Plain account with a balance.
    pub fn with_balance(balance: Amount) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Balance plus locked funds matured at `height`. `None` on overflow.
    pub fn spendable(&self, height: Height) -> Option<Amount> {
        self.locked
            .iter()
            .filter(|l| l.unlock_height <= height)
            .try_fold(self.balance, |acc, l| acc.checked_add(l.amount))
    }

    /// Move locked funds matured at `height` into the balance.
    pub fn release_matured(&mut self, height: Height) -> Result<(), RejectReason> {
        let mut released = self.balance;
        for l in self.locked.iter().filter(|l| l.unlock_height <= height) {
            released = released
                .checked_add(l.amount)
                .ok_or(RejectReason::Overflow)?;
        }
        self.balance = released;
        self.locked.retain(|l| l.unlock_height > height);
        Ok(())
    }

    /// Stake that counts for eligibility and unstaking at `height`.
    pub fn matured_stake(&self, height: Height) -> Amount {
        if height >= self.stake_matures_at {
            self.stake
        } else {
            0
        }
    }

    /// Whether this record carries no state at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Address of a contract created by `creator` with transaction `sequence`.
pub fn contract_address(creator: &PublicKey, sequence: u64) -> PublicKey {
    sha256_many(&[&b"contract"[..], &creator[..], &sequence.to_be_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_locks() -> Account {
        Account {
            balance: 100,
            locked: vec![
                LockedFunds {
                    amount: 10,
                    unlock_height: 5,
                },
                LockedFunds {
                    amount: 20,
                    unlock_height: 8,
                },
            ],
            ..Account::default()
        }
    }

    #[test]
    fn test_spendable_counts_only_matured_locks() {
        let account = account_with_locks();
        assert_eq!(account.spendable(4), Some(100));
        assert_eq!(account.spendable(5), Some(110));
        assert_eq!(account.spendable(8), Some(130));
    }

    #[test]
    fn test_release_matured_moves_funds() {
        let mut account = account_with_locks();
        account.release_matured(6).unwrap();
        assert_eq!(account.balance, 110);
        assert_eq!(account.locked.len(), 1);
        assert_eq!(account.locked[0].unlock_height, 8);
    }

    #[test]
    fn test_release_overflow_is_rejected() {
        let mut account = Account {
            balance: u64::MAX,
            locked: vec![LockedFunds {
                amount: 1,
                unlock_height: 0,
            }],
            ..Account::default()
        };
        assert_eq!(account.release_matured(1), Err(RejectReason::Overflow));
        assert_eq!(account.balance, u64::MAX);
    }

    #[test]
    fn test_matured_stake() {
        let account = Account {
            stake: 500,
            stake_matures_at: 12,
            ..Account::default()
        };
        assert_eq!(account.matured_stake(11), 0);
        assert_eq!(account.matured_stake(12), 500);
    }

    #[test]
    fn test_contract_address_depends_on_sequence() {
        let creator = [3u8; 32];
        assert_ne!(contract_address(&creator, 1), contract_address(&creator, 2));
        assert_eq!(contract_address(&creator, 1), contract_address(&creator, 1));
    }
}
