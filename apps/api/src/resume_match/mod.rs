pub mod analysis;
pub mod chat;
pub mod handlers;
pub mod typewriter;
pub mod upload;
