use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{BankAccount, BankAccountDraft};
use tokio_postgres::Row;

use crate::RepositoryError;

/// Repository interface for organizer bank accounts; at most one per user.
#[async_trait]
pub trait BankAccountsRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<BankAccount>, RepositoryError>;

    /// A second account for the same user yields [`RepositoryError::UniqueViolation`].
    async fn insert(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<BankAccount, RepositoryError>;

    async fn update(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<Option<BankAccount>, RepositoryError>;
}

pub struct PgBankAccountsRepository {
    pool: Pool,
}

impl PgBankAccountsRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

const BANK_ACCOUNT_COLUMNS: &str = "id, user_id, bank, va_number, created_at";

fn bank_account_from_row(row: &Row) -> Result<BankAccount, tokio_postgres::Error> {
    Ok(BankAccount {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        bank: row.try_get("bank")?,
        va_number: row.try_get("va_number")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl BankAccountsRepository for PgBankAccountsRepository {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<BankAccount>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts WHERE user_id = $1");
        let row = client.query_opt(&query, &[&user_id]).await?;
        Ok(row.as_ref().map(bank_account_from_row).transpose()?)
    }

    async fn insert(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<BankAccount, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            INSERT INTO bank_accounts (user_id, bank, va_number)
            VALUES ($1, $2, $3)
            RETURNING {BANK_ACCOUNT_COLUMNS}
            "#
        );
        let row = client
            .query_one(&query, &[&user_id, &draft.bank, &draft.va_number])
            .await?;
        Ok(bank_account_from_row(&row)?)
    }

    async fn update(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            UPDATE bank_accounts SET bank = $2, va_number = $3, updated_at = now()
            WHERE user_id = $1
            RETURNING {BANK_ACCOUNT_COLUMNS}
            "#
        );
        let row = client
            .query_opt(&query, &[&user_id, &draft.bank, &draft.va_number])
            .await?;
        Ok(row.as_ref().map(bank_account_from_row).transpose()?)
    }
}
