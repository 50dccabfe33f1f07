pub mod bidmodel;
pub mod chatmodel;
pub mod requestmodel;
pub mod usermodel;
