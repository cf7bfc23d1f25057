//! Wallet service facade
//!
//! `WalletService` is the entry point used by callers: it registers users,
//! forwards money movements to the [`TransferEngine`] and reads through the
//! [`HistoryReader`].

use std::sync::Arc;

use tracing::warn;

use super::engine::TransferEngine;
use super::history::HistoryReader;
use super::memory::{MemoryBackend, MemoryDirectory};
use super::traits::{AccountStore, Backend, UserDirectory};
use crate::config::LedgerConfig;
use crate::types::{
    Account, BalanceView, HistoryResult, LedgerError, Operation, OperationOutcome, OwnerId,
    TopUpRequest, TopUpResult, TransferRequest, TransferResult, User,
};

/// Ledger service over one backend
pub struct WalletService<B: Backend> {
    engine: TransferEngine<B>,
    history: HistoryReader<B>,
    accounts: Arc<B::Accounts>,
    directory: Arc<dyn UserDirectory>,
}

impl<B: Backend> Clone for WalletService<B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            history: self.history.clone(),
            accounts: Arc::clone(&self.accounts),
            directory: Arc::clone(&self.directory),
        }
    }
}

impl WalletService<MemoryBackend> {
    /// Service over a fresh in-memory backend
    pub fn in_memory(config: &LedgerConfig) -> Self {
        let (units, accounts, ledger) = MemoryBackend::open(config.lock_timeout);
        Self::new(
            Arc::new(units),
            Arc::new(accounts),
            Arc::new(ledger),
            Arc::new(MemoryDirectory::new()),
            config,
        )
    }
}

impl<B: Backend> WalletService<B> {
    pub fn new(
        units: Arc<B::Units>,
        accounts: Arc<B::Accounts>,
        ledger: Arc<B::Ledger>,
        directory: Arc<dyn UserDirectory>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            engine: TransferEngine::new(
                units,
                Arc::clone(&accounts),
                Arc::clone(&ledger),
                Arc::clone(&directory),
            ),
            history: HistoryReader::new(Arc::clone(&accounts), ledger, config),
            accounts,
            directory,
        }
    }

    /// Register a user and open their zero-balance wallet
    ///
    /// # Errors
    ///
    /// * `AlreadyExists` - the email is taken, or the user already has a wallet
    ///
    /// When the wallet cannot be opened the user is removed again, so a user
    /// never exists without a wallet.
    pub async fn register(&self, email: &str, name: &str) -> Result<(User, Account), LedgerError> {
        let user = self.directory.register(email, name).await?;
        match self.accounts.create(user.id).await {
            Ok(account) => Ok((user, account)),
            Err(e) => {
                warn!(user = user.id, error = %e, "wallet not opened, removing user");
                self.directory.unregister(user.id).await?;
                Err(e)
            }
        }
    }

    pub async fn top_up(
        &self,
        owner: OwnerId,
        request: TopUpRequest,
    ) -> Result<TopUpResult, LedgerError> {
        self.engine.top_up(owner, request).await
    }

    pub async fn transfer(
        &self,
        sender: OwnerId,
        request: TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        self.engine.transfer(sender, request).await
    }

    pub async fn history(
        &self,
        owner: OwnerId,
        page: i64,
        limit: i64,
    ) -> Result<HistoryResult, LedgerError> {
        self.history.get_history(owner, page, limit).await
    }

    pub async fn balance(&self, owner: OwnerId) -> Result<BalanceView, LedgerError> {
        self.history.balance(owner).await
    }

    /// Committed snapshot of every wallet, ordered by id
    pub async fn wallets(&self) -> Result<Vec<Account>, LedgerError> {
        self.accounts.list().await
    }

    /// Apply one replayed operation
    pub async fn apply(&self, operation: Operation) -> Result<OperationOutcome, LedgerError> {
        match operation {
            Operation::Register { email, name } => {
                let (user, account) = self.register(&email, &name).await?;
                Ok(OperationOutcome::Registered { user, account })
            }
            Operation::TopUp {
                user,
                amount,
                idempotency_key,
            } => self
                .top_up(
                    user,
                    TopUpRequest {
                        amount,
                        idempotency_key,
                    },
                )
                .await
                .map(OperationOutcome::ToppedUp),
            Operation::Transfer {
                user,
                destination,
                amount,
                memo,
                idempotency_key,
            } => self
                .transfer(
                    user,
                    TransferRequest {
                        destination,
                        amount,
                        memo,
                        idempotency_key,
                    },
                )
                .await
                .map(OperationOutcome::Transferred),
        }
    }
}
