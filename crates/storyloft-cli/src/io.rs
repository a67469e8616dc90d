use std::fs;
use std::path::PathBuf;

use crate::error::ClientError;

/// Returns the file contents when a path is given, otherwise the inline value.
pub fn read_opt_value(
    val: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<String>, ClientError> {
    if let Some(path) = file {
        let data = fs::read_to_string(&path).map_err(|source| ClientError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(Some(data));
    }
    Ok(val)
}
