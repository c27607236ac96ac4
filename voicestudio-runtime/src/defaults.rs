use std::path::Path;

use anyhow::Context;
use voicestudio_core::config::StudioConfig;
use voicestudio_core::fsutil::ensure_dir;

pub const CONFIG_FILE_NAME: &str = "voicestudio.json";

pub fn default_studio_config(root: &Path) -> StudioConfig {
    StudioConfig::rooted_at(root)
}

/// Creates the recordings, converted, images and voices directories if absent.
pub fn ensure_layout(cfg: &StudioConfig) -> anyhow::Result<()> {
    for dir in cfg.managed_dirs() {
        ensure_dir(dir).with_context(|| format!("prepare directory layout at {}", dir.display()))?;
    }
    Ok(())
}
