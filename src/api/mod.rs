pub mod auth;
pub mod routes;
