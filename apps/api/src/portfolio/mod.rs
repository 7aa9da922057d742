pub mod handlers;
pub mod publish;
pub mod slug;
