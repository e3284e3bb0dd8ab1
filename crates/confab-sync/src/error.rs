use confab_shared::AdapterError;
use thiserror::Error;

/// Errors surfaced by the reconciliation engine's write path.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The authoritative remote store refused or could not be reached.
    /// The operation had no durable effect.
    #[error("remote store: {0}")]
    Remote(#[source] AdapterError),

    /// The local cache failed.
    #[error("local cache: {0}")]
    Cache(#[source] AdapterError),

    /// The caller supplied an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Partial-failure report for a status update, which writes to the
/// remote store and the local cache independently.  At least one of the
/// two fields is set.
#[derive(Debug)]
pub struct StatusUpdateError {
    pub remote: Option<AdapterError>,
    pub cache: Option<AdapterError>,
}

impl StatusUpdateError {
    pub(crate) fn from_parts(
        remote: Option<AdapterError>,
        cache: Option<AdapterError>,
    ) -> Option<Self> {
        if remote.is_none() && cache.is_none() {
            None
        } else {
            Some(Self { remote, cache })
        }
    }
}

impl std::fmt::Display for StatusUpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.remote, &self.cache) {
            (Some(r), Some(c)) => write!(f, "status update failed everywhere: remote: {r}; cache: {c}"),
            (Some(r), None) => write!(f, "status update failed on the remote store: {r}"),
            (None, Some(c)) => write!(f, "status update failed on the local cache: {c}"),
            (None, None) => write!(f, "status update succeeded"),
        }
    }
}

impl std::error::Error for StatusUpdateError {}
