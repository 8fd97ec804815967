pub mod admin;
pub mod auth;
pub mod shared;
pub mod shifts;
pub mod stations;
pub mod users;
