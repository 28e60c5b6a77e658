pub mod telegram;

/// A text message received from a chat
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Platform-specific user ID as string, empty for channel posts
    pub user_id: String,
    /// Chat the reply goes back to
    pub chat_id: i64,
    /// Display name of the user
    pub user_name: String,
    /// The message text
    pub text: String,
}
