//! Device state errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Update references a zone the snapshot doesn't contain
    #[error("Unknown zone: {0}")]
    UnknownZone(u8),
}
