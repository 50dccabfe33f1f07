pub mod auth;
pub mod bids;
pub mod chat;
pub mod guard;
pub mod realtime;
pub mod requests;
pub mod users;
