//! Asset presence checks for a deployed experience

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use lomundou_core::{ExperienceConfig, MarkerIndex};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Target,
    Model,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Present,
    Missing,
    /// Served from another origin, not checked
    Remote,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetCheck {
    pub marker: Option<MarkerIndex>,
    pub kind: AssetKind,
    pub path: String,
    pub resolved: Option<PathBuf>,
    pub status: AssetStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub checks: Vec<AssetCheck>,
}

impl CheckReport {
    pub fn missing(&self) -> impl Iterator<Item = &AssetCheck> {
        self.checks.iter().filter(|c| c.status == AssetStatus::Missing)
    }

    pub fn is_complete(&self) -> bool {
        self.missing().next().is_none()
    }
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}

/// Map a page-relative asset path onto the deployment root
pub fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
    if is_remote(path) {
        return None;
    }
    let relative = path.trim_start_matches("./").trim_start_matches('/');
    Some(root.join(relative))
}

async fn check_one(root: &Path, marker: Option<MarkerIndex>, kind: AssetKind, path: &str) -> AssetCheck {
    let resolved = resolve(root, path);
    let status = match &resolved {
        None => AssetStatus::Remote,
        Some(file) => match tokio::fs::metadata(file).await {
            Ok(meta) if meta.is_file() => AssetStatus::Present,
            _ => AssetStatus::Missing,
        },
    };
    debug!(path, ?status, "Checked asset");

    AssetCheck {
        marker,
        kind,
        path: path.to_string(),
        resolved,
        status,
    }
}

/// Check the target descriptor and every marker's model and audio clip
pub async fn check_assets(config: &ExperienceConfig, root: &Path) -> CheckReport {
    let mut report = CheckReport::default();
    report
        .checks
        .push(check_one(root, None, AssetKind::Target, &config.experience.target).await);

    for spec in config.markers() {
        report
            .checks
            .push(check_one(root, Some(spec.index), AssetKind::Model, &spec.model_path).await);
        report
            .checks
            .push(check_one(root, Some(spec.index), AssetKind::Audio, &spec.audio_path).await);
    }

    report
}

/// Human readable marker table
pub fn marker_table(config: &ExperienceConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Target:  {}", config.experience.target);
    let _ = writeln!(out, "Variant: {}", config.experience.audio_variant);
    let _ = writeln!(out, "{:<6} {:<5} {:<36} {:<36} {:<18} {}", "MARKER", "PAGE", "MODEL", "AUDIO", "SCALE", "POSITION");

    for spec in config.markers() {
        let _ = writeln!(
            out,
            "{:<6} {:<5} {:<36} {:<36} {:<18} {}",
            spec.index,
            spec.index.page(),
            spec.model_path,
            spec.audio_path,
            format!("{}, {}, {}", spec.scale.x, spec.scale.y, spec.scale.z),
            format!("{}, {}, {}", spec.position.x, spec.position.y, spec.position.z),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn complete_deployment(config: &ExperienceConfig) -> TempDir {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "assets/targets/Lomundou.mind");
        for spec in config.markers() {
            touch(dir.path(), spec.model_path.trim_start_matches("./"));
            touch(dir.path(), spec.audio_path.trim_start_matches("./"));
        }
        dir
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/srv/book");
        assert_eq!(
            resolve(root, "./assets/models/scene1.glb"),
            Some(PathBuf::from("/srv/book/assets/models/scene1.glb"))
        );
        assert_eq!(
            resolve(root, "/assets/audio/dusun/page1.mp3"),
            Some(PathBuf::from("/srv/book/assets/audio/dusun/page1.mp3"))
        );
        assert_eq!(resolve(root, "https://cdn.example.com/scene1.glb"), None);
    }

    #[tokio::test]
    async fn test_complete_deployment() {
        let config = ExperienceConfig::default();
        let dir = complete_deployment(&config);

        let report = check_assets(&config, dir.path()).await;
        assert_eq!(report.checks.len(), 21);
        assert!(report.is_complete());
        assert_eq!(report.checks[0].kind, AssetKind::Target);
    }

    #[tokio::test]
    async fn test_missing_files_are_reported() {
        let config = ExperienceConfig::default();
        let dir = complete_deployment(&config);
        fs::remove_file(dir.path().join("assets/models/scene3.glb")).unwrap();
        fs::remove_file(dir.path().join("assets/audio/dusun/page10.mp3")).unwrap();

        let report = check_assets(&config, dir.path()).await;
        let missing: Vec<_> = report.missing().map(|c| (c.marker, c.kind)).collect();
        assert_eq!(
            missing,
            vec![
                (Some(MarkerIndex(2)), AssetKind::Model),
                (Some(MarkerIndex(9)), AssetKind::Audio),
            ]
        );
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_variant_changes_audio_paths() {
        let config = ExperienceConfig::default();
        let dir = complete_deployment(&config);

        let english = config.with_audio_variant("english");
        let report = check_assets(&english, dir.path()).await;
        assert_eq!(report.missing().count(), 10);
        assert!(report.missing().all(|c| c.kind == AssetKind::Audio && c.path.contains("/english/")));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let config = ExperienceConfig::default();
        let dir = complete_deployment(&config);
        fs::remove_file(dir.path().join("assets/targets/Lomundou.mind")).unwrap();
        fs::create_dir_all(dir.path().join("assets/targets/Lomundou.mind")).unwrap();

        let report = check_assets(&config, dir.path()).await;
        assert_eq!(report.checks[0].status, AssetStatus::Missing);
    }

    #[test]
    fn test_marker_table_lists_every_page() {
        let table = marker_table(&ExperienceConfig::default());
        assert!(table.contains("Variant: dusun"));
        assert!(table.contains("./assets/models/scene1.glb"));
        assert!(table.contains("./assets/audio/dusun/page10.mp3"));
        // header, target and variant lines plus one row per marker
        assert_eq!(table.lines().count(), 13);
    }

    #[test]
    fn test_report_serializes() {
        let report = CheckReport {
            checks: vec![AssetCheck {
                marker: Some(MarkerIndex(0)),
                kind: AssetKind::Model,
                path: "./assets/models/scene1.glb".to_string(),
                resolved: None,
                status: AssetStatus::Remote,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checks"][0]["marker"], 0);
        assert_eq!(json["checks"][0]["kind"], "model");
        assert_eq!(json["checks"][0]["status"], "remote");
    }
}
