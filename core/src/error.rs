use thiserror::Error;

/// Everything that can stop a chat turn from producing a reply.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key is required")]
    MissingCredential,

    #[error("Message is required")]
    MissingMessage,

    // The model call (or anything it depends on) failed. The whole cause chain goes
    // back to the caller, so a bad key and a dead network read differently.
    #[error("An error occurred: {0:#}")]
    ExternalCallFailure(#[source] anyhow::Error),
}

impl ChatError {
    /// HTTP status the gateway should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::MissingCredential | ChatError::MissingMessage => 400,
            ChatError::ExternalCallFailure(_) => 500,
        }
    }
}
