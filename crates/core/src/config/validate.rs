use super::{types::BatchConfig, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Worker command names a program
/// - Timeout is not 0
pub fn validate_config(config: &BatchConfig) -> Result<(), ConfigError> {
    match config.worker_command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::ValidationError(
                "worker_command cannot be empty".to_string(),
            ))
        }
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
