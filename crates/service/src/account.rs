use async_trait::async_trait;
use model::request::{
    LoginRequest, RegisterRequest, ResetPasswordRequest, UpdateAccountRequest, Validate,
};
use model::{NewUser, Principal, ProfileUpdate, Role, User};
use repository::{RepositoryError, UsersRepository};
use tracing::{info, instrument};

use crate::auth::{PasswordManager, TokenManager};
use crate::ServiceError;

const DUPLICATE_USERNAME: &str = "user with the same username already exists";

/// Registration, login and self-service account management.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn register(&self, request: RegisterRequest) -> Result<User, ServiceError>;

    /// Returns a signed access token.
    async fn login(&self, request: LoginRequest) -> Result<String, ServiceError>;

    async fn get_account(&self, principal: Principal) -> Result<User, ServiceError>;

    async fn update_account(
        &self,
        principal: Principal,
        request: UpdateAccountRequest,
    ) -> Result<User, ServiceError>;

    async fn reset_password(
        &self,
        principal: Principal,
        request: ResetPasswordRequest,
    ) -> Result<(), ServiceError>;
}

pub struct AccountServiceImpl<U> {
    users: U,
    tokens: TokenManager,
    passwords: PasswordManager,
}

impl<U> AccountServiceImpl<U>
where
    U: UsersRepository,
{
    pub fn new(users: U, tokens: TokenManager, passwords: PasswordManager) -> Self {
        Self {
            users,
            tokens,
            passwords,
        }
    }

    async fn find_user(&self, id: i64) -> Result<User, ServiceError> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }
}

#[async_trait]
impl<U> AccountService for AccountServiceImpl<U>
where
    U: UsersRepository,
{
    #[instrument(skip_all, fields(username = %request.username))]
    async fn register(&self, request: RegisterRequest) -> Result<User, ServiceError> {
        request.validate()?;
        let role: Role = request
            .role
            .parse()
            .map_err(|e: model::UnknownRole| ServiceError::BadRequest(e.to_string()))?;

        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(ServiceError::BadRequest(DUPLICATE_USERNAME.into()));
        }

        let new_user = NewUser {
            name: request.name,
            username: request.username,
            email: request.email,
            password_hash: self.passwords.hash(&request.password)?,
            role,
        };
        let user = match self.users.insert(&new_user).await {
            Err(RepositoryError::UniqueViolation(_)) => {
                return Err(ServiceError::BadRequest(DUPLICATE_USERNAME.into()));
            }
            other => other?,
        };

        info!(user_id = user.id, role = %user.role, "user registered");
        Ok(user)
    }

    #[instrument(skip_all, fields(username = %request.username))]
    async fn login(&self, request: LoginRequest) -> Result<String, ServiceError> {
        request.validate()?;
        let user = self
            .users
            .find_by_username(&request.username)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;

        if !self.passwords.verify(&request.password, &user.password_hash) {
            return Err(ServiceError::BadRequest("invalid password".into()));
        }

        self.tokens.issue(&user)
    }

    #[instrument(skip(self))]
    async fn get_account(&self, principal: Principal) -> Result<User, ServiceError> {
        self.find_user(principal.user_id).await
    }

    #[instrument(skip(self, request))]
    async fn update_account(
        &self,
        principal: Principal,
        request: UpdateAccountRequest,
    ) -> Result<User, ServiceError> {
        request.validate()?;
        let update = ProfileUpdate {
            name: request.name,
            email: request.email,
            address: request.address,
        };
        match self.users.update_profile(principal.user_id, &update).await {
            Err(RepositoryError::NotFound) => Err(ServiceError::not_found("user")),
            other => Ok(other?),
        }
    }

    #[instrument(skip(self, request))]
    async fn reset_password(
        &self,
        principal: Principal,
        request: ResetPasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        let user = self.find_user(principal.user_id).await?;
        if !self.passwords.verify(&request.old_password, &user.password_hash) {
            return Err(ServiceError::Unauthorized);
        }

        let hash = self.passwords.hash(&request.password)?;
        self.users.update_password(user.id, &hash).await?;
        info!(user_id = user.id, "password changed");
        Ok(())
    }
}
