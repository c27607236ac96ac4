use anyhow::Context;
use std::path::{Path, PathBuf};
use voicestudio_core::config::StudioConfig;
use voicestudio_core::fsutil::replace_file;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<StudioConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: StudioConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }

    /// Like [`ConfigStore::load`], but a missing file means "use defaults".
    ///
    /// Relative directories in the defaults resolve against the config file's parent.
    pub fn load_or_default(&self) -> anyhow::Result<StudioConfig> {
        if !self.path.exists() {
            log::info!(
                "no config at {}, using defaults",
                self.path.display()
            );
            let root = self.path.parent().unwrap_or_else(|| Path::new("."));
            return Ok(crate::defaults::default_studio_config(root));
        }
        self.load()
    }

    pub fn save(&self, cfg: &StudioConfig) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(cfg).context("encode config JSON")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config directory: {}", parent.display()))?;
        }

        // Write temp then replace.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
        replace_file(&tmp, &self.path)
            .with_context(|| format!("replace file: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicestudio_core::config::CaptureConfig;

    #[test]
    fn round_trips_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("nested/voicestudio.json"));

        let mut cfg = StudioConfig::rooted_at(dir.path());
        cfg.capture = CaptureConfig {
            sample_rate_hz: 48_000,
            channels: 1,
            block_frames: 512,
        };
        cfg.input_device = Some("USB Mic".into());

        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, cfg);

        // Saving again replaces the file in place.
        cfg.input_device = None;
        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap().input_device, None);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("voicestudio.json"));

        assert!(store.load().is_err());
        let cfg = store.load_or_default().unwrap();
        assert_eq!(cfg.recordings_dir, dir.path().join("recordings"));
        assert_eq!(cfg.capture, CaptureConfig::default());
    }

    #[test]
    fn partial_config_keeps_capture_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicestudio.json");
        std::fs::write(
            &path,
            r#"{
                "recordings_dir": "r",
                "converted_dir": "c",
                "images_dir": "i",
                "voices_dir": "v"
            }"#,
        )
        .unwrap();

        let cfg = ConfigStore::at_path(&path).load_or_default().unwrap();
        assert_eq!(cfg.images_dir, PathBuf::from("i"));
        assert_eq!(cfg.capture, CaptureConfig::default());
        assert_eq!(cfg.input_device, None);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicestudio.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = ConfigStore::at_path(&path).load_or_default().unwrap_err();
        assert!(err.to_string().contains("decode config JSON"));
    }
}
