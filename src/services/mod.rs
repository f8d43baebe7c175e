pub mod admin;
pub mod auth;
pub mod orders;
pub mod payments;
pub mod retry;
pub mod rewards;
pub mod support;
