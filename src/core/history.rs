//! Paginated reads of an account's ledger
//!
//! The reader only sees committed state and never takes a lease.

use std::sync::Arc;

use tracing::debug;

use super::traits::{AccountStore, Backend, LedgerStore};
use crate::config::LedgerConfig;
use crate::types::{BalanceView, HistoryResult, LedgerError, OwnerId, PaginationMeta};

/// Read side of the ledger
pub struct HistoryReader<B: Backend> {
    accounts: Arc<B::Accounts>,
    ledger: Arc<B::Ledger>,
    default_page_size: u32,
    max_page_size: u32,
}

impl<B: Backend> Clone for HistoryReader<B> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            ledger: Arc::clone(&self.ledger),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

impl<B: Backend> HistoryReader<B> {
    pub fn new(accounts: Arc<B::Accounts>, ledger: Arc<B::Ledger>, config: &LedgerConfig) -> Self {
        Self {
            accounts,
            ledger,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// One page of the owner's entries, newest first
    ///
    /// `page` below 1 reads page 1. A `limit` outside `1..=max_page_size`
    /// falls back to the default page size.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - the owner has no wallet
    pub async fn get_history(
        &self,
        owner: OwnerId,
        page: i64,
        limit: i64,
    ) -> Result<HistoryResult, LedgerError> {
        let account = self.accounts.get(owner).await?;

        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let limit = match u32::try_from(limit) {
            Ok(limit) if (1..=self.max_page_size).contains(&limit) => limit,
            _ => self.default_page_size,
        };
        let offset = u64::from(page - 1) * u64::from(limit);

        let (entries, total) = self
            .ledger
            .list_by_account(account.id, limit, offset)
            .await?;
        debug!(
            user = owner,
            wallet = account.id,
            page,
            limit,
            total,
            "history read"
        );

        Ok(HistoryResult {
            entries,
            pagination: PaginationMeta {
                page,
                limit,
                total,
                total_pages: total.div_ceil(u64::from(limit)),
            },
        })
    }

    /// Committed balance of the owner's wallet
    pub async fn balance(&self, owner: OwnerId) -> Result<BalanceView, LedgerError> {
        let account = self.accounts.get(owner).await?;
        Ok(BalanceView {
            wallet_id: account.id,
            user_id: account.owner,
            balance: account.balance,
        })
    }
}
