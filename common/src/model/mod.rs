pub mod bank_account;
pub mod cancel_request;
pub mod offer;
pub mod order;
pub mod settings;
