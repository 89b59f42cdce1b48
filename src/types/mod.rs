pub mod position;
pub mod trade;
pub mod user;
