use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::naming::{IMAGE_EXTENSIONS, VOICE_EXTENSIONS, display_name_for_key, extension_lowercase};
use crate::types::{TargetId, TargetIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GallerySummary {
    pub total: usize,
    pub with_voice: usize,
}

impl GallerySummary {
    pub fn missing_voice(&self) -> usize {
        self.total - self.with_voice
    }
}

/// In-memory roster of target identities, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    targets: Vec<TargetIdentity>,
}

impl Gallery {
    /// Scans `images_dir` for supported images and pairs each with a voice clip in `voices_dir`.
    ///
    /// Never fails as a whole: an unreadable directory yields an empty roster and a bad entry
    /// is logged and skipped.
    pub fn scan(images_dir: &Path, voices_dir: &Path) -> Self {
        let entries = match fs::read_dir(images_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot read images dir {}: {e}", images_dir.display());
                return Self::default();
            }
        };

        // key -> (extension priority, image path)
        let mut images: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping unreadable entry in {}: {e}", images_dir.display());
                    continue;
                }
            };
            let path = entry.path();

            let Some(priority) = extension_lowercase(&path)
                .and_then(|ext| IMAGE_EXTENSIONS.iter().position(|e| *e == ext))
            else {
                continue;
            };

            // Follows symlinks, so a link to a directory named like an image is skipped.
            if !path.is_file() {
                continue;
            }

            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                log::warn!("skipping image with non UTF-8 name: {}", path.display());
                continue;
            };
            if key.trim().is_empty() {
                log::warn!("skipping image with empty name: {}", path.display());
                continue;
            }

            match images.get(&key) {
                Some((existing, kept)) if *existing <= priority => {
                    log::warn!(
                        "duplicate image for '{key}': keeping {}, skipping {}",
                        kept.display(),
                        path.display()
                    );
                }
                _ => {
                    images.insert(key, (priority, path));
                }
            }
        }

        let targets = images
            .into_iter()
            .map(|(key, (_, image_path))| {
                let voice_path = find_voice(voices_dir, &key);
                let display_name = display_name_for_key(&key);
                TargetIdentity::new(TargetId::new(key), display_name, image_path, voice_path)
            })
            .collect::<Vec<_>>();

        log::debug!("gallery scan found {} target(s)", targets.len());
        Self { targets }
    }

    pub fn targets(&self) -> &[TargetIdentity] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Looks a target up by key first, then by display name.
    pub fn find(&self, needle: &str) -> Option<&TargetIdentity> {
        let needle = needle.trim();
        self.targets
            .iter()
            .find(|t| t.id.as_str() == needle)
            .or_else(|| self.targets.iter().find(|t| t.matches(needle)))
    }

    pub fn summary(&self) -> GallerySummary {
        GallerySummary {
            total: self.targets.len(),
            with_voice: self.targets.iter().filter(|t| t.has_voice()).count(),
        }
    }
}

fn find_voice(voices_dir: &Path, key: &str) -> Option<PathBuf> {
    VOICE_EXTENSIONS
        .iter()
        .map(|ext| voices_dir.join(format!("{key}.{ext}")))
        .find(|p| p.is_file())
}
