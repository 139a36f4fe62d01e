use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    #[serde(default)]
    pub(crate) sound: bool,
    #[serde(default = "default_true")]
    pub(crate) color: bool,
    #[serde(default = "default_fps")]
    pub(crate) fps_cap: u32,
}

fn default_true() -> bool {
    true
}

fn default_fps() -> u32 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: false,
            color: true,
            fps_cap: default_fps(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) save_path: PathBuf,
    /// Prior-schema save, read once for migration, removed on reset.
    pub(crate) legacy_save_path: PathBuf,
    pub(crate) settings_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "pocketpet", "Pocketpet")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        save_path: dir.join("save_v3.json"),
        legacy_save_path: dir.join("save_v2.json"),
        settings_path: dir.join("settings.json"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // Best-effort atomic replace on same filesystem.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}
