use thiserror::Error;

/// Domain error taxonomy for the conversation store. Display strings are
/// the client-visible error messages.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conversation does not exist")]
    ConversationNotFound,

    #[error("Message does not exist")]
    MessageNotFound,

    #[error("User does not exist")]
    UserNotFound,

    #[error("You do not have permission to access this conversation")]
    PermissionNotFound,

    #[error("Message content cannot be empty")]
    EmptyContent,

    #[error("Reply must reference an earlier message in this conversation")]
    InvalidReply,

    #[error("Cannot start a conversation with yourself")]
    InvalidRecipient,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}
