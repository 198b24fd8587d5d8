//! Infrastructure layer: persistence, configuration, workflow services and
//! outbound notifications.

pub mod config;
pub mod notifications;
pub mod reports;
pub mod retry;
pub mod services;
pub mod store;
