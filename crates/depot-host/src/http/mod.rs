pub mod admin;
pub mod download;
pub mod error;
pub mod health;
pub mod packages;
