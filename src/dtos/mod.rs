pub mod biddtos;
pub mod chatdtos;
pub mod requestdtos;
pub mod userdtos;

pub use userdtos::*;
