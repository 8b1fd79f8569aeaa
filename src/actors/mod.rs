pub mod chat;
pub mod client;
pub mod room;
pub mod supervisor;
