use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `llm-guard`.
///
/// Each subsystem defines its own error variant. Pipeline code matches on
/// these to decide whether a failure is absorbed, reported to the requester,
/// or re-raised; startup and CLI glue keep using `anyhow::Result`.
#[derive(Debug, Error)]
pub enum GuardError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Chat platform ───────────────────────────────────────────────────
    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),

    // ── Action dispatch ─────────────────────────────────────────────────
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Chat platform errors ───────────────────────────────────────────────────

/// Failures surfaced by a [`crate::platform::ChatPlatform`] call.
///
/// `NotFound` and `Forbidden` are expected conditions and drive the
/// requester-facing rejection messages; everything else is a transport or
/// protocol problem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("resource not found")]
    NotFound,

    #[error("missing permission")]
    Forbidden,

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u8 },

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("decode: {0}")]
    Decode(String),
}

impl PlatformError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            404 => Self::NotFound,
            403 => Self::Forbidden,
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }
}

// ─── Context collection errors ──────────────────────────────────────────────

/// Why the reported member's context could not be gathered. Each variant
/// ends the pipeline with a short message to the reporter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("reported member not found")]
    NotFound,

    #[error("missing permission to read member context")]
    Forbidden,

    #[error("member lookup failed: {0}")]
    Platform(PlatformError),
}

impl From<PlatformError> for ContextError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::NotFound => Self::NotFound,
            PlatformError::Forbidden => Self::Forbidden,
            other => Self::Platform(other),
        }
    }
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("provider {provider} returned no content")]
    EmptyResponse { provider: String },
}

// ─── Persistence errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("open failed: {0}")]
    Open(String),

    #[error("schema setup failed: {0}")]
    Schema(String),

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

// ─── Dispatch errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The escalation notice never reached the reviewers.
    #[error("escalation notice undelivered: {0}")]
    EscalationUndelivered(#[source] PlatformError),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GuardError>;
