// Conversation orchestration: extraction, optional search, then the assistant reply.

pub mod context;
pub mod handlers;
