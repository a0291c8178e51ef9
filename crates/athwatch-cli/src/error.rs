use athwatch_core::CoreError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] athwatch_core::ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Core(CoreError::Validation(_)) => 2,
            Self::Core(CoreError::ProviderUnavailable { .. }) => 3,
            Self::Core(CoreError::Serialization(_)) => 4,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_outage_exits_with_three() {
        let error = CliError::from(CoreError::provider_unavailable("down"));
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn bad_input_exits_with_two() {
        let error = CliError::from(athwatch_core::ValidationError::EmptySymbol);
        assert_eq!(error.exit_code(), 2);
    }
}
