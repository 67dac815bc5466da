use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Timeouts are not 0
/// - Tool paths are not empty
/// - Every configured ladder has at least one step
/// - Thumbnail bounds are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let converter = &config.converter;

    if converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }
    if converter.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.probe_timeout_secs cannot be 0".to_string(),
        ));
    }
    if converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }
    if converter.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffprobe_path cannot be empty".to_string(),
        ));
    }
    if converter.thumbnail_size.width == 0 || converter.thumbnail_size.height == 0 {
        return Err(ConfigError::ValidationError(
            "converter.thumbnail_size dimensions cannot be 0".to_string(),
        ));
    }

    for (format, ladder) in &config.compression.ladders {
        if ladder.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "compression.ladders.{} cannot be empty",
                format
            )));
        }
    }

    Ok(())
}
