pub type ScrollResult<T> = Result<T, ScrollError>;

#[derive(thiserror::Error, Debug)]
pub enum ScrollError {
    #[error("no sections found")]
    NoSections,

    #[error("missing element: {0}")]
    MissingElement(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("dom error: {0}")]
    Dom(String),

    #[error("serialization error: {0}")]
    Serde(String),
}

impl ScrollError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingElement(what.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dom(msg: impl Into<String>) -> Self {
        Self::Dom(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ScrollError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
