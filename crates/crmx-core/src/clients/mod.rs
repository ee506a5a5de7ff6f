//! Typed clients for the auth backend, the CRM proxy and Bitrix24.

pub mod auth;
pub mod bitrix;
pub mod crm;

pub use auth::AuthClient;
pub use bitrix::BitrixClient;
pub use crm::CrmClient;
