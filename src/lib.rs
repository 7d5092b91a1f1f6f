pub mod account;
pub mod admin;
pub mod api;
pub mod card;
pub mod config;
pub mod controller;
pub mod identity;
pub mod locale;
pub mod poller;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
