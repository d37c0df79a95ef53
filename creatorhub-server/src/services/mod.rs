//! Multi-step workflows shared by the HTTP handlers

pub mod access;
pub mod accounts;
pub mod availability;
pub mod invoices;
pub mod notifications;
pub mod onboarding;
pub mod smoke;
pub mod test_data;
