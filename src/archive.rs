use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use tempdir::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::ArchiveError;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const LABEL_EXTENSION: &str = "txt";

/// An image and the label file sharing its base name.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLabelPair {
    pub base: String,
    pub image: PathBuf,
    pub label: PathBuf,
}

/// A ZIP archive unpacked into a temporary directory.
///
/// The directory and everything written into it are removed when this value is dropped.
#[derive(Debug)]
pub struct ExtractedArchive {
    source: PathBuf,
    working_dir: TempDir,
}

impl ExtractedArchive {
    pub fn extract<P: AsRef<Path>>(zip_path: P) -> Result<Self, ArchiveError> {
        let zip_path = zip_path.as_ref();
        if !zip_path.is_file() {
            return Err(ArchiveError::NotFound(zip_path.to_path_buf()));
        }

        let zip_err = |source| ArchiveError::Zip {
            path: zip_path.to_path_buf(),
            source,
        };

        let working_dir = TempDir::new("boxcheck")?;
        let mut archive = ZipArchive::new(File::open(zip_path)?).map_err(zip_err)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(zip_err)?;
            let Some(relative) = entry.enclosed_name() else {
                warn!("Skipping archive entry with unsafe path: {}", entry.name());
                continue;
            };
            let dest = working_dir.path().join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest)?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)?;
            std::io::copy(&mut entry, &mut out)?;
            debug!("Extracted {}", dest.display());
        }

        Ok(Self {
            source: zip_path.to_path_buf(),
            working_dir,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn path(&self) -> &Path {
        self.working_dir.path()
    }

    /// Path of an extracted file, if `name` exists inside the archive.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return None;
        }
        let path = self.path().join(relative);
        path.is_file().then_some(path)
    }

    /// Top-level image files, sorted by name.
    pub fn image_files(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        self.files_matching(is_image)
    }

    /// Top-level label files, sorted by name.
    pub fn label_files(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        self.files_matching(is_label)
    }

    /// Images that have a same-named `.txt` label next to them.
    pub fn pairs(&self) -> Result<Vec<ImageLabelPair>, ArchiveError> {
        let mut pairs = Vec::new();
        for image in self.image_files()? {
            let Some(base) = image.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let label = self.path().join(format!("{}.{}", base, LABEL_EXTENSION));
            if !label.is_file() {
                debug!("No label file for {}", image.display());
                continue;
            }
            pairs.push(ImageLabelPair {
                base: base.to_string(),
                image,
                label,
            });
        }
        Ok(pairs)
    }

    fn files_matching(&self, keep: fn(&Path) -> bool) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.path())? {
            let path = entry?.path();
            if path.is_file() && keep(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_image(path: &Path) -> bool {
    extension_lowercase(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_label(path: &Path) -> bool {
    extension_lowercase(path).is_some_and(|ext| ext == LABEL_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image(Path::new("a.png")));
        assert!(is_image(Path::new("a.JPG")));
        assert!(is_image(Path::new("dir/a.Jpeg")));
        assert!(!is_image(Path::new("a.gif")));
        assert!(!is_image(Path::new("png")));
    }

    #[test]
    fn recognizes_label_extension() {
        assert!(is_label(Path::new("a.txt")));
        assert!(is_label(Path::new("a.TXT")));
        assert!(!is_label(Path::new("a.txt.bak")));
    }

    #[test]
    fn missing_archive_is_reported() {
        let err = ExtractedArchive::extract("/definitely/not/here.zip").unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }
}
