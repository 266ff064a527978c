pub(crate) mod account;
pub(crate) mod bank_accounts;
pub(crate) mod catalog;
pub(crate) mod feedbacks;
pub(crate) mod orders;
