/// Failure modes that abort the whole invocation.
///
/// Per-probe failures are deliberately absent: a probe that cannot run is
/// recorded as that task's outcome and scanning continues.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("could not resolve '{0}' to an IPv4 address")]
    ResolutionFailure(String),
}
