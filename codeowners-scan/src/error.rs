/// Errors that abort a scan. Only data acquisition fails this way; problems
/// inside declaration files are reported as diagnostics instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch `{path}`: {detail}")]
    Fetch { path: String, detail: String },

    #[error("request to {url} failed: {detail}")]
    Http { url: String, detail: String },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("could not decode `{path}`: {reason}")]
    Decode { path: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
