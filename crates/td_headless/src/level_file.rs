//! Level file loading.
//!
//! Hosts may ship levels as RON files alongside the three built-ins.
//! The session validates the geometry itself; this module only gets the
//! value off disk.

use std::path::Path;

use thiserror::Error;

use td_core::level::LevelSpec;

/// Error type for level file operations.
#[derive(Error, Debug)]
pub enum LevelFileError {
    /// File not found.
    #[error("Level file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read level file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse level: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Load a level from a RON file.
pub fn load_level<P: AsRef<Path>>(path: P) -> Result<LevelSpec, LevelFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LevelFileError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let level: LevelSpec = ron::from_str(&contents)?;
    Ok(level)
}

/// Load a level from a RON string (useful for embedded levels).
pub fn level_from_ron_str(ron: &str) -> Result<LevelSpec, LevelFileError> {
    let level: LevelSpec = ron::from_str(ron)?;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            LevelSpec(
                id: 9,
                name: "Custom Loop",
                path_grid: [(0, 1), (6, 1), (6, 8), (12, 8)],
                campaign_waves: 4,
            )
        "#;
        let level = level_from_ron_str(ron).unwrap();
        assert_eq!(level.id, 9);
        assert_eq!(level.name, "Custom Loop");
        assert_eq!(level.path_grid.len(), 4);
        assert_eq!(level.campaign_waves, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = load_level("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, LevelFileError::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            level_from_ron_str("LevelSpec(id: )"),
            Err(LevelFileError::ParseError(_))
        ));
    }
}
