pub mod attendance;
pub mod auth;
pub mod comment;
pub mod crypto;
pub mod event;
pub mod log;
pub mod notification;
pub mod push;
pub mod query;
pub mod tags;
pub mod upload;
pub mod user;
