use std::fmt;
use std::path::PathBuf;

/// Fatal problems found while loading a level, its resources or the content
/// catalog. Nothing in the per-tick simulation returns an error.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    /// A tile dictionary key that is not of the form `"(x, y)"`.
    BadTileKey(String),
    /// A resource property line that could not be parsed.
    BadResourceInfo { resource: String, line: String },
    /// A tile references a resource folder that was never registered.
    UnknownResource(String),
    VariantOutOfRange {
        resource: String,
        variant: usize,
        variants: usize,
    },
    /// A non-positive tile size in the level document.
    BadTileSize { base: f32, target: f32 },
    UnknownCharacter(String),
    UnknownEffect(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            LoadError::Json {
                path: Some(path),
                source,
            } => write!(f, "malformed JSON in {}: {}", path.display(), source),
            LoadError::Json { path: None, source } => write!(f, "malformed JSON: {}", source),
            LoadError::BadTileKey(key) => {
                write!(f, "tile key {:?} is not a \"(x, y)\" coordinate", key)
            }
            LoadError::BadResourceInfo { resource, line } => {
                write!(f, "resource {:?}: cannot parse property line {:?}", resource, line)
            }
            LoadError::UnknownResource(name) => write!(f, "unknown resource {:?}", name),
            LoadError::VariantOutOfRange {
                resource,
                variant,
                variants,
            } => write!(
                f,
                "resource {:?} has {} variants, tile uses variant {}",
                resource, variants, variant
            ),
            LoadError::BadTileSize { base, target } => write!(
                f,
                "tile sizes must be positive (base {}, target {})",
                base, target
            ),
            LoadError::UnknownCharacter(name) => write!(f, "unknown character {:?}", name),
            LoadError::UnknownEffect(name) => write!(f, "unknown effect template {:?}", name),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
