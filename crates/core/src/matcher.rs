use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Indexes every file under a root by `(relative directory, lowercase
/// stem)` so that sidecar files can be found for a given primary file in
/// O(1) instead of re-scanning a directory per file. Backs
/// `RelatedFileMode::SameStem`: any file sharing a primary's stem and
/// directory is treated as a sidecar, regardless of extension.
#[derive(Debug, Clone)]
pub struct SidecarIndex {
    root: PathBuf,
    recursive: bool,
    files_by_rel_dir: HashMap<PathBuf, HashMap<String, Vec<PathBuf>>>,
}

pub fn build_sidecar_index(root: &Path, recursive: bool) -> SidecarIndex {
    let mut files_by_rel_dir = HashMap::<PathBuf, HashMap<String, Vec<PathBuf>>>::new();

    let mut push = |path: &Path| {
        let stem = match path.file_stem().and_then(|v| v.to_str()) {
            Some(stem) if !stem.is_empty() => stem,
            _ => return,
        };
        let rel_dir = if recursive {
            path.parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .map(PathBuf::from)
                .unwrap_or_default()
        } else {
            PathBuf::new()
        };
        files_by_rel_dir
            .entry(rel_dir)
            .or_default()
            .entry(stem.to_ascii_lowercase())
            .or_default()
            .push(path.to_path_buf());
    };

    if recursive {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_file() {
                push(entry.path());
            }
        }
    } else if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                push(&path);
            }
        }
    }

    for stem_map in files_by_rel_dir.values_mut() {
        for candidates in stem_map.values_mut() {
            candidates.sort();
        }
    }

    SidecarIndex {
        root: root.to_path_buf(),
        recursive,
        files_by_rel_dir,
    }
}

impl SidecarIndex {
    /// Every file sharing `primary`'s directory and stem, excluding
    /// `primary` itself.
    pub fn find_related(&self, primary: &Path) -> Vec<PathBuf> {
        let rel_dir = if self.recursive {
            primary
                .strip_prefix(&self.root)
                .ok()
                .and_then(|rel| rel.parent().map(PathBuf::from))
                .unwrap_or_default()
        } else {
            PathBuf::new()
        };

        let Some(stem) = primary.file_stem().and_then(|v| v.to_str()) else {
            return Vec::new();
        };
        let stem_key = stem.to_ascii_lowercase();

        self.files_by_rel_dir
            .get(&rel_dir)
            .and_then(|stems| stems.get(&stem_key))
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|candidate| candidate.as_path() != primary)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::build_sidecar_index;
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs must be creatable");
        }
        File::create(path).expect("file must be creatable");
    }

    #[test]
    fn finds_same_stem_sidecars_non_recursive() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("in");
        fs::create_dir_all(&root).expect("root");

        let primary = root.join("DSC00001.JPG");
        let sidecar = root.join("DSC00001.xmp");
        touch(&primary);
        touch(&sidecar);

        let index = build_sidecar_index(&root, false);
        let related = index.find_related(&primary);
        assert_eq!(related, vec![sidecar]);
    }

    #[test]
    fn resolves_recursive_relative_directory() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("in");
        let primary = root.join("day1/DSC00003.JPG");
        let sidecar = root.join("day1/DSC00003.RAF");
        touch(&primary);
        touch(&sidecar);

        let index = build_sidecar_index(&root, true);
        let related = index.find_related(&primary);
        assert_eq!(related, vec![sidecar]);
    }

    #[test]
    fn excludes_primary_from_its_own_related_set() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("in");
        fs::create_dir_all(&root).expect("root");
        let primary = root.join("DSC00002.JPG");
        touch(&primary);

        let index = build_sidecar_index(&root, false);
        assert!(index.find_related(&primary).is_empty());
    }
}
