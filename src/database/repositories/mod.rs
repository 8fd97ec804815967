pub mod shift;
pub mod special_code;
pub mod station;
pub mod user;
