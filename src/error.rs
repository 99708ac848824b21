use std::path::PathBuf;

#[derive(Debug)]
pub enum IconError {
    /// The source image is missing, unreadable or not decodable.
    Load { path: PathBuf, source: image::ImageError },
    /// A resized icon could not be written to its destination.
    Write { path: PathBuf, source: image::ImageError },
}

impl IconError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            IconError::Load { path, .. } | IconError::Write { path, .. } => path,
        }
    }
}

impl std::fmt::Display for IconError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IconError::Load { path, .. } => {
                write!(f, "Failed to load source image: {}", path.display())
            }
            IconError::Write { path, .. } => write!(f, "Failed to write icon: {}", path.display()),
        }
    }
}

impl std::error::Error for IconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IconError::Load { source, .. } | IconError::Write { source, .. } => Some(source),
        }
    }
}
