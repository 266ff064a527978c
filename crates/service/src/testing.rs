//! In-memory repositories and gateways for usecase tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use gateway::{ChargeRequest, GatewayError, PaymentGateway, SentimentAnalyzer};
use model::{
    BankAccount, BankAccountDraft, Feedback, NewFeedback, NewOrder, NewUser, Order, Payment,
    PaymentStatus, ProfileUpdate, Role, Service, ServiceDraft, User,
};
use repository::{
    BankAccountsRepository, FeedbacksRepository, OrdersRepository, PaymentsRepository,
    RepositoryError, ServicesRepository, UsersRepository,
};

pub(crate) fn user(id: i64, role: Role) -> User {
    User {
        id,
        name: format!("user {id}"),
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        address: "Jakarta".into(),
        password_hash: String::new(),
        role,
        created_at: Utc.with_ymd_and_hms(2022, 11, 1, 8, 0, 0).unwrap(),
    }
}

pub(crate) fn service(id: i64, owner_id: i64, cost: f64) -> Service {
    Service {
        id,
        user_id: owner_id,
        name: format!("service {id}"),
        cost,
        phone: "0800".into(),
        email: "eo@example.com".into(),
        description: "sound system and lighting".into(),
        is_published: true,
        created_at: Utc.with_ymd_and_hms(2022, 10, 1, 8, 0, 0).unwrap(),
    }
}

#[derive(Default)]
struct Store {
    next_id: i64,
    users: Vec<User>,
    services: Vec<(Service, bool)>,
    orders: Vec<(Order, bool)>,
    payments: Vec<Payment>,
    bank_accounts: Vec<BankAccount>,
    feedbacks: Vec<Feedback>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn completed_orders(&self, from: i64, to: i64) -> i64 {
        self.orders
            .iter()
            .filter(|(o, deleted)| {
                !deleted
                    && o.is_completed
                    && o.customer_id == from
                    && o.services.iter().any(|s| s.user_id == to)
            })
            .count() as i64
    }

    fn given_feedbacks(&self, from: i64, to: i64) -> i64 {
        self.feedbacks
            .iter()
            .filter(|f| f.from_user_id == from && f.to_user_id == to)
            .count() as i64
    }
}

/// One in-memory database implementing every repository trait.
#[derive(Clone, Default)]
pub(crate) struct FakeDb {
    store: Arc<Mutex<Store>>,
}

impl FakeDb {
    pub fn with_user(self, user: User) -> Self {
        self.store.lock().unwrap().users.push(user);
        self
    }

    pub fn with_service(self, service: Service) -> Self {
        self.store.lock().unwrap().services.push((service, false));
        self
    }

    pub fn with_bank_account(self, user_id: i64) -> Self {
        self.store.lock().unwrap().bank_accounts.push(BankAccount {
            id: user_id,
            user_id,
            bank: "bca".into(),
            va_number: format!("8800{user_id}"),
            created_at: Utc::now(),
        });
        self
    }

    /// Stores an order of `service_ids` placed by `customer_id`.
    pub fn with_order(self, id: i64, customer_id: i64, service_ids: &[i64]) -> Self {
        {
            let mut store = self.store.lock().unwrap();
            let services: Vec<Service> = store
                .services
                .iter()
                .filter(|(s, _)| service_ids.contains(&s.id))
                .map(|(s, _)| s.clone())
                .collect();
            let provider_id = services.first().map(|s| s.user_id).unwrap_or_default();
            let customer = store
                .users
                .iter()
                .find(|u| u.id == customer_id)
                .map(User::profile);
            store.orders.push((
                Order {
                    id,
                    customer_id,
                    provider_id,
                    is_accepted: false,
                    is_completed: false,
                    date_of_event: NaiveDate::from_ymd_opt(2022, 12, 12).unwrap(),
                    first_name: "Example".into(),
                    last_name: "Customer".into(),
                    phone: "081234567890".into(),
                    email: "customer@example.com".into(),
                    address: "Jakarta".into(),
                    note: "-".into(),
                    created_at: Utc::now(),
                    customer,
                    services,
                },
                false,
            ));
        }
        self
    }

    pub fn set_order_flags(&self, id: i64, is_accepted: bool, is_completed: bool) {
        let mut store = self.store.lock().unwrap();
        if let Some((order, _)) = store.orders.iter_mut().find(|(o, _)| o.id == id) {
            order.is_accepted = is_accepted;
            order.is_completed = is_completed;
        }
    }

    pub fn order(&self, id: i64) -> Option<Order> {
        let store = self.store.lock().unwrap();
        store
            .orders
            .iter()
            .find(|(o, deleted)| o.id == id && !deleted)
            .map(|(o, _)| o.clone())
    }

    pub fn order_count(&self) -> usize {
        self.store.lock().unwrap().orders.len()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.store.lock().unwrap().payments.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.store.lock().unwrap().users.clone()
    }

    pub fn feedback_count(&self) -> usize {
        self.store.lock().unwrap().feedbacks.len()
    }

    pub fn is_service_deleted(&self, id: i64) -> bool {
        let store = self.store.lock().unwrap();
        store.services.iter().any(|(s, deleted)| s.id == id && *deleted)
    }
}

#[async_trait]
impl UsersRepository for FakeDb {
    async fn find(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::UniqueViolation("users_username_key".into()));
        }
        let inserted = User {
            id: store.next_id(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            address: String::new(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        store.users.push(inserted.clone());
        Ok(inserted)
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.name = update.name.clone();
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(address) = &update.address {
            user.address = address.clone();
        }
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl ServicesRepository for FakeDb {
    async fn list(&self, keyword: Option<&str>) -> Result<Vec<Service>, RepositoryError> {
        let store = self.store.lock().unwrap();
        let keyword = keyword.map(str::to_lowercase);
        Ok(store
            .services
            .iter()
            .filter(|(s, deleted)| !deleted && s.is_published)
            .filter(|(s, _)| match &keyword {
                Some(k) => {
                    s.name.to_lowercase().contains(k) || s.description.to_lowercase().contains(k)
                }
                None => true,
            })
            .map(|(s, _)| s.clone())
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Service>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .services
            .iter()
            .find(|(s, deleted)| s.id == id && !deleted)
            .map(|(s, _)| s.clone()))
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<Service>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .services
            .iter()
            .filter(|(s, deleted)| ids.contains(&s.id) && !deleted)
            .map(|(s, _)| s.clone())
            .collect())
    }

    async fn insert(&self, owner_id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let inserted = Service {
            id: store.next_id(),
            user_id: owner_id,
            name: draft.name.clone(),
            cost: draft.cost,
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            description: draft.description.clone(),
            is_published: draft.is_published,
            created_at: Utc::now(),
        };
        store.services.push((inserted.clone(), false));
        Ok(inserted)
    }

    async fn update(&self, id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let (service, _) = store
            .services
            .iter_mut()
            .find(|(s, deleted)| s.id == id && !deleted)
            .ok_or(RepositoryError::NotFound)?;
        service.name = draft.name.clone();
        service.cost = draft.cost;
        service.phone = draft.phone.clone();
        service.email = draft.email.clone();
        service.description = draft.description.clone();
        service.is_published = draft.is_published;
        Ok(service.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store.services.iter_mut().find(|(s, deleted)| s.id == id && !deleted) {
            Some(entry) => {
                entry.1 = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrdersRepository for FakeDb {
    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .orders
            .iter()
            .filter(|(o, deleted)| !deleted && o.customer_id == customer_id)
            .map(|(o, _)| o.clone())
            .collect())
    }

    async fn list_for_provider(&self, provider_id: i64) -> Result<Vec<Order>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .orders
            .iter()
            .filter(|(o, deleted)| {
                !deleted
                    && o.customer_id != provider_id
                    && o.services.iter().any(|s| s.user_id == provider_id)
            })
            .map(|(o, _)| o.clone())
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        Ok(self.order(id))
    }

    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let id = self.store.lock().unwrap().next_id();
        let db = self.clone().with_order(id, order.customer_id, &order.service_ids);
        let mut store = db.store.lock().unwrap();
        let (stored, _) = store
            .orders
            .iter_mut()
            .find(|(o, _)| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        stored.provider_id = order.provider_id;
        stored.date_of_event = order.date_of_event;
        stored.first_name = order.first_name.clone();
        stored.last_name = order.last_name.clone();
        stored.phone = order.phone.clone();
        stored.email = order.email.clone();
        stored.address = order.address.clone();
        stored.note = order.note.clone();
        Ok(stored.clone())
    }

    async fn accept(&self, id: i64, amount: f64) -> Result<Option<Payment>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let Some((order, _)) = store
            .orders
            .iter_mut()
            .find(|(o, deleted)| o.id == id && !deleted && !o.is_accepted)
        else {
            return Ok(None);
        };
        order.is_accepted = true;
        if store.payments.iter().any(|p| p.order_id == id) {
            return Err(RepositoryError::UniqueViolation("payments_order_id_key".into()));
        }
        let payment = Payment {
            id: store.next_id(),
            order_id: id,
            amount,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.payments.push(payment.clone());
        Ok(Some(payment))
    }

    async fn revert_accept(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut guard = self.store.lock().unwrap();
        let store = &mut *guard;
        let pending = store
            .payments
            .iter()
            .position(|p| p.order_id == id && p.status == PaymentStatus::Pending);
        let order = store
            .orders
            .iter_mut()
            .find(|(o, deleted)| o.id == id && !deleted && o.is_accepted && !o.is_completed);
        match (order, pending) {
            (Some((order, _)), Some(index)) => {
                order.is_accepted = false;
                store.payments.remove(index);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store
            .orders
            .iter_mut()
            .find(|(o, deleted)| o.id == id && !deleted && o.is_accepted && !o.is_completed)
        {
            Some((order, _)) => {
                order.is_completed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store.orders.iter_mut().find(|(o, deleted)| o.id == id && !deleted) {
            Some(entry) => {
                entry.1 = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentsRepository for FakeDb {
    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<Payment>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.payments.iter().find(|p| p.order_id == order_id).cloned())
    }

    async fn find_by_order_ids(&self, order_ids: &[i64]) -> Result<Vec<Payment>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .payments
            .iter()
            .filter(|p| order_ids.contains(&p.order_id))
            .cloned()
            .collect())
    }

    async fn settle(
        &self,
        order_id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let Some(payment) = store
            .payments
            .iter_mut()
            .find(|p| p.order_id == order_id && p.status == PaymentStatus::Pending)
        else {
            return Ok(None);
        };
        payment.status = status;
        let settled = payment.clone();
        if status == PaymentStatus::Fail {
            if let Some(entry) = store.orders.iter_mut().find(|(o, _)| o.id == order_id) {
                entry.1 = true;
            }
        }
        Ok(Some(settled))
    }
}

#[async_trait]
impl BankAccountsRepository for FakeDb {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<BankAccount>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.bank_accounts.iter().find(|b| b.user_id == user_id).cloned())
    }

    async fn insert(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<BankAccount, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if store.bank_accounts.iter().any(|b| b.user_id == user_id) {
            return Err(RepositoryError::UniqueViolation("bank_accounts_user_id_key".into()));
        }
        let account = BankAccount {
            id: store.next_id(),
            user_id,
            bank: draft.bank.clone(),
            va_number: draft.va_number.clone(),
            created_at: Utc::now(),
        };
        store.bank_accounts.push(account.clone());
        Ok(account)
    }

    async fn update(
        &self,
        user_id: i64,
        draft: &BankAccountDraft,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Ok(store
            .bank_accounts
            .iter_mut()
            .find(|b| b.user_id == user_id)
            .map(|account| {
                account.bank = draft.bank.clone();
                account.va_number = draft.va_number.clone();
                account.clone()
            }))
    }
}

#[async_trait]
impl FeedbacksRepository for FakeDb {
    async fn list(&self, to_user_id: Option<i64>) -> Result<Vec<Feedback>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .feedbacks
            .iter()
            .filter(|f| to_user_id.is_none_or(|to| f.to_user_id == to))
            .cloned()
            .collect())
    }

    async fn feedbacks_count(&self, from_user_id: i64, to_user_id: i64) -> Result<i64, RepositoryError> {
        Ok(self.store.lock().unwrap().given_feedbacks(from_user_id, to_user_id))
    }

    async fn completed_orders_count(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<i64, RepositoryError> {
        Ok(self.store.lock().unwrap().completed_orders(from_user_id, to_user_id))
    }

    async fn insert_if_eligible(
        &self,
        feedback: &NewFeedback,
    ) -> Result<Option<Feedback>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let (from, to) = (feedback.from_user_id, feedback.to_user_id);
        if store.given_feedbacks(from, to) >= store.completed_orders(from, to) {
            return Ok(None);
        }
        let inserted = Feedback {
            id: store.next_id(),
            description: feedback.description.clone(),
            rating: feedback.rating,
            positive: feedback.sentiment.positive,
            negative: feedback.sentiment.negative,
            from_user_id: from,
            to_user_id: to,
            created_at: Utc::now(),
            from_user: store.users.iter().find(|u| u.id == from).map(User::profile),
            to_user: store.users.iter().find(|u| u.id == to).map(User::profile),
        };
        store.feedbacks.push(inserted.clone());
        Ok(Some(inserted))
    }
}

/// Records every charge; fails them all when `fail` is set.
#[derive(Clone, Default)]
pub(crate) struct FakeGateway {
    pub charges: Arc<Mutex<Vec<ChargeRequest>>>,
    pub fail: bool,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<(), GatewayError> {
        self.charges.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(GatewayError::InvalidResponse("gateway unavailable".into()));
        }
        Ok(())
    }
}

/// Returns a fixed score, or fails when `score` is `None`.
#[derive(Clone, Copy)]
pub(crate) struct FakeSentiment {
    pub score: Option<f32>,
}

#[async_trait]
impl SentimentAnalyzer for FakeSentiment {
    async fn analyze(&self, _text: &str) -> Result<f32, GatewayError> {
        self.score
            .ok_or_else(|| GatewayError::InvalidResponse("sentiment unavailable".into()))
    }
}
