use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    // Valeur par défaut de TrackSource::activate : l'appelant se replie sur get_stream
    #[error("operation not implemented for this track")]
    NotImplemented,
    #[error("stream unavailable: {0}")]
    Stream(String),
    #[error("nothing to play")]
    NothingToPlay,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("cache error: {0}")]
    Cache(#[from] mmpcache::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlayerError {
    pub fn stream(message: impl Into<String>) -> Self {
        PlayerError::Stream(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        PlayerError::Backend(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
