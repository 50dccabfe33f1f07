pub mod biddb;
pub mod chatdb;
pub mod db;
pub mod requestdb;
pub mod userdb;
