mod hosted_batch;
mod hosted_chat;
mod local_chat;

pub use hosted_batch::HostedBatchProvider;
pub use hosted_chat::HostedChatProvider;
pub use local_chat::LocalHttpChatProvider;
