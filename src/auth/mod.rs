pub mod auth;
pub mod csrf;
pub mod handlers;
pub mod identity;
pub mod identity_cache;
pub mod jwt;
pub mod middleware;
pub mod password;
