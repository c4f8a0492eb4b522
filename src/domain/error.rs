use std::fmt;

/// Pipeline failure, tagged with the stage that produced it.
///
/// Every kind is fatal; the binaries map the kind to a process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EtlError {
    Config(String),
    Fetch(String),
    Transform(String),
    Load(String),
}

impl EtlError {
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::Config(_) => 2,
            EtlError::Fetch(_) => 3,
            EtlError::Transform(_) => 4,
            EtlError::Load(_) => 5,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            EtlError::Config(_) => "config",
            EtlError::Fetch(_) => "fetch",
            EtlError::Transform(_) => "transform",
            EtlError::Load(_) => "load",
        }
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtlError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EtlError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            EtlError::Transform(msg) => write!(f, "Transform error: {}", msg),
            EtlError::Load(msg) => write!(f, "Load error: {}", msg),
        }
    }
}

impl std::error::Error for EtlError {}

pub type Result<T> = std::result::Result<T, EtlError>;
