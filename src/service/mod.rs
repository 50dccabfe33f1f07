pub mod bid_service;
pub mod error;
pub mod realtime;
pub mod request_service;
pub mod route_guard;
