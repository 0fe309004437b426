pub mod auth;
pub mod load;
pub mod login;
