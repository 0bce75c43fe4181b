use thiserror::Error;

/// Errors raised while running an external conversion tool
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool binary could not be started (not installed, not executable)
    #[error("Failed to start {tool}: {message}")]
    Spawn { tool: String, message: String },

    /// The tool ran but exited with a nonzero status
    #[error("{tool} exited with {status}, output: {output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },

    /// The tool reported success but the expected file is not there
    #[error("{tool} did not produce the expected output: {path}")]
    MissingOutput { tool: String, path: String },
}

/// Errors that can occur while converting a single source file
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Source file does not exist (should map to HTTP 404)
    #[error("Source file not found: {path}")]
    SourceNotFound { path: String },

    /// Source path exists but is not a regular file
    #[error("Source is not a regular file: {path}")]
    NotAFile { path: String },

    /// Extension is not handled by any converter (should map to HTTP 400)
    #[error("Unsupported file extension: {extension}")]
    UnsupportedExtension { extension: String },

    /// Output directory could not be created
    #[error("Failed to create output directory {path}: {message}")]
    CreateDir { path: String, message: String },

    /// External tool failure
    #[error("Conversion tool error: {0}")]
    Tool(#[from] ToolError),

    /// Temp output could not be enumerated
    #[error("Failed to discover converted pages with {pattern}: {message}")]
    Discover { pattern: String, message: String },

    /// The tool succeeded but produced no pages at all
    #[error("No converted pages found for {source_path}")]
    NoPages { source_path: String },

    /// A blocking filesystem step panicked or was cancelled
    #[error("Background task failed: {0}")]
    Background(String),

    /// Renaming a temp output to its final name failed
    #[error("Failed to rename {from} -> {to}: {message}")]
    Rename {
        from: String,
        to: String,
        message: String,
    },
}

/// Errors from the rename and file-info operations on the converted tree
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// File does not exist under the converted root
    #[error("File not found: {0}")]
    NotFound(String),

    /// Path exists but is not a regular file
    #[error("Not a regular file: {0}")]
    NotRegularFile(String),

    /// Requested name would escape its directory
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Any other filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Reading, writing or parsing the configuration file failed
    #[error("Failed to load configuration from {path}: {message}")]
    Load { path: String, message: String },

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
