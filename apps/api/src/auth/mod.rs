pub mod extract;
pub mod handlers;
pub mod password;
pub mod token;
