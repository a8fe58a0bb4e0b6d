pub mod assessment;
pub mod business;
pub mod conversation;
pub mod file;
pub mod knowledge;
pub mod message;
pub mod user;
