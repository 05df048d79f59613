use thiserror::Error;

pub type EcotopeResult<T> = Result<T, EcotopeError>;

#[derive(Debug, Error)]
pub enum EcotopeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Errors surfaced while loading or validating a scenario. The engine
/// refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read scenario file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse scenario YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid world extent {width}x{height}: {msg}")]
    InvalidWorld {
        width: usize,
        height: usize,
        msg: String,
    },

    #[error("Scenario declares no fields")]
    NoFields,

    #[error("Duplicate field name: '{0}'")]
    DuplicateField(String),

    #[error("Invalid bounds for field '{field}': lo {lo} must be < hi {hi}")]
    InvalidBounds { field: String, lo: f32, hi: f32 },

    #[error("Out-of-range setting '{key}': {msg}")]
    OutOfRange { key: String, msg: String },
}

/// Errors related to the run directory and its persisted artifacts.
/// Partial artifacts already on disk are left as-is.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Run directory error: {0}")]
    RunDir(String),

    #[error("Missing artifact: {0}")]
    Missing(String),

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Checksum error for '{file}': {msg}")]
    Checksum { file: String, msg: String },
}

/// Errors surfaced while reconstructing a tick from the delta journal.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(
        "Scenario hash mismatch: manifest has {manifest} but scenario.json hashes to {recomputed}"
    )]
    ScenarioHashMismatch { manifest: String, recomputed: String },

    #[error("Delta journal missing from run directory: {0}")]
    JournalMissing(String),

    #[error("Malformed delta record at row {row}: {msg}")]
    MalformedDelta { row: usize, msg: String },
}

/// Precondition violations on caller-facing accessors.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No tick loaded: call load_tick() before reading the view")]
    TickNotLoaded,

    #[error("Unknown field: '{0}'")]
    UnknownField(String),

    #[error("Cell ({x}, {y}) outside world extent {width}x{height}")]
    CellOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Fatal simulation bugs. These abort the run with diagnostics; they are
/// never swallowed or retried.
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("Field '{field}' out of bounds at ({x}, {y}): {value} not in [{lo}, {hi}]")]
    OutOfBounds {
        field: String,
        x: usize,
        y: usize,
        value: f32,
        lo: f32,
        hi: f32,
    },

    #[error("Non-finite value in field '{field}' at ({x}, {y})")]
    NonFinite { field: String, x: usize, y: usize },

    #[error("Delta magnitude {delta} exceeds bound 10 for clamped field '{field}'")]
    OversizedDelta { field: String, delta: f32 },

    #[error("Agent {0} stepped while dead")]
    DeadAgentStepped(u64),
}

/// Agent-scope faults. Contained where possible: the arbiter falls back to
/// `Stay` on an empty proposal set rather than surfacing an error.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent logic error: {0}")]
    Logic(String),

    #[error("Invalid perception input: {0}")]
    InvalidPerception(String),
}
