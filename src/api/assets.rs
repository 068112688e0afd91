//! Image asset enumeration
//!
//! Lists image files under an operator-configured root so tooling can browse
//! them. Request paths are validated component-by-component; anything that
//! would escape the root is rejected before touching the filesystem.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

/// Failures while listing assets.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("path escapes the asset root")]
    Traversal,
    #[error("directory not found")]
    NotFound,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One entry visible to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Path relative to the asset root.
    pub path: String,
    pub is_dir: bool,
}

/// List image files and subdirectories directly under `root`/`sub`.
pub async fn list_assets(root: &Path, sub: &str) -> Result<Vec<AssetEntry>, AssetError> {
    let clean = sanitize(sub)?;
    let dir = root.join(&clean);

    let mut reader = tokio::fs::read_dir(&dir).await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            AssetError::NotFound
        } else {
            AssetError::Io(e)
        }
    })?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if clean.as_os_str().is_empty() {
            name.clone()
        } else {
            format!("{}/{}", clean.display(), name)
        };

        if file_type.is_dir() {
            entries.push(AssetEntry {
                path: rel,
                is_dir: true,
            });
        } else if is_image(&name) {
            entries.push(AssetEntry {
                path: rel,
                is_dir: false,
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Keep only normal components: no parents, no absolute paths, no prefixes.
fn sanitize(sub: &str) -> Result<PathBuf, AssetError> {
    let mut clean = PathBuf::new();
    for component in Path::new(sub).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(AssetError::Traversal),
        }
    }
    Ok(clean)
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
