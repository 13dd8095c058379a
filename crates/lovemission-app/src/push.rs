use async_trait::async_trait;

/// Source of this device's push-notification token.
#[async_trait]
pub trait PushRegistrar: Send + Sync {
    /// Ask for a token. `None` when push is unavailable or denied.
    async fn register(&self) -> Option<String>;
}

/// Push disabled.
pub struct NoPush;

#[async_trait]
impl PushRegistrar for NoPush {
    async fn register(&self) -> Option<String> {
        None
    }
}

/// A token obtained out of band (e.g. passed on the command line).
pub struct StaticPush(pub String);

#[async_trait]
impl PushRegistrar for StaticPush {
    async fn register(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.is_empty())
    }
}
