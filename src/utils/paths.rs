use std::path::PathBuf;

/// Returns the directory holding history, the vector index and cached models.
/// Uses `./.tmp` when the working directory is known, otherwise
/// `dirs::data_dir()` + "parley" (e.g. ~/.local/share/parley).
pub fn default_state_dir() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(".tmp"),
        Err(_) => dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("parley"),
    }
}
