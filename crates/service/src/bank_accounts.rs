use async_trait::async_trait;
use model::request::{BankAccountRequest, Validate};
use model::{BankAccount, BankAccountDraft, Principal, Role};
use repository::{BankAccountsRepository, RepositoryError};
use tracing::{info, instrument};

use crate::{ServiceError, require_role};

const ALREADY_EXISTS: &str = "bank account already exists";

/// The bank account an organizer receives payments on. Organizers only.
#[async_trait]
pub trait BankAccountService: Send + Sync {
    async fn get_bank_accounts(&self, principal: Principal) -> Result<Vec<BankAccount>, ServiceError>;

    async fn create_bank_account(
        &self,
        principal: Principal,
        request: BankAccountRequest,
    ) -> Result<BankAccount, ServiceError>;

    async fn update_bank_account(
        &self,
        principal: Principal,
        request: BankAccountRequest,
    ) -> Result<BankAccount, ServiceError>;
}

pub struct BankAccountServiceImpl<B> {
    bank_accounts: B,
}

impl<B> BankAccountServiceImpl<B>
where
    B: BankAccountsRepository,
{
    pub fn new(bank_accounts: B) -> Self {
        Self { bank_accounts }
    }
}

fn draft(request: BankAccountRequest) -> BankAccountDraft {
    BankAccountDraft {
        bank: request.bank,
        va_number: request.va_number,
    }
}

#[async_trait]
impl<B> BankAccountService for BankAccountServiceImpl<B>
where
    B: BankAccountsRepository,
{
    async fn get_bank_accounts(&self, principal: Principal) -> Result<Vec<BankAccount>, ServiceError> {
        require_role(&principal, Role::Organizer)?;
        let account = self.bank_accounts.find_by_user_id(principal.user_id).await?;
        Ok(account.into_iter().collect())
    }

    #[instrument(skip(self, request))]
    async fn create_bank_account(
        &self,
        principal: Principal,
        request: BankAccountRequest,
    ) -> Result<BankAccount, ServiceError> {
        require_role(&principal, Role::Organizer)?;
        request.validate()?;

        if self
            .bank_accounts
            .find_by_user_id(principal.user_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::BadRequest(ALREADY_EXISTS.into()));
        }

        let account = match self.bank_accounts.insert(principal.user_id, &draft(request)).await {
            Err(RepositoryError::UniqueViolation(_)) => {
                return Err(ServiceError::BadRequest(ALREADY_EXISTS.into()));
            }
            other => other?,
        };
        info!(bank = %account.bank, "bank account created");
        Ok(account)
    }

    #[instrument(skip(self, request))]
    async fn update_bank_account(
        &self,
        principal: Principal,
        request: BankAccountRequest,
    ) -> Result<BankAccount, ServiceError> {
        require_role(&principal, Role::Organizer)?;
        request.validate()?;

        self.bank_accounts
            .update(principal.user_id, &draft(request))
            .await?
            .ok_or_else(|| ServiceError::not_found("bank account"))
    }
}
