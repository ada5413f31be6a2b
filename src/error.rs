use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// One or more of the three settings fields was empty at send time.
    /// The send is rejected before any network activity.
    #[error("API key, base URL, and model must all be set (press 's' for settings)")]
    ConfigIncomplete,

    /// Network, auth, or malformed-response failure during a completion call.
    #[error("completion request failed: {0}")]
    Transport(String),

    /// The settings file could not be read or written.
    #[error("settings file error: {0}")]
    Persistence(String),
}
