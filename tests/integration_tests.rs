use chrono::{DateTime, Local, TimeDelta, TimeZone};
use dorg::cli::load_organizer;
/// Integration tests for dorg
///
/// These tests build a throwaway watch directory, write a configuration for
/// it and run whole passes, checking what ends up where on disk.
///
/// Test categories:
/// 1. Rule-driven file moves
/// 2. Dry-run mode verification
/// 3. Candidate filtering
/// 4. Unmanaged folder collection
/// 5. Configuration loading
use dorg::{Organizer, OrganizerConfig, RuleConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// The instant every pass in this file pretends to run at.
fn pass_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
}

/// An mtime comfortably older than the default minimum age.
fn settled() -> SystemTime {
    SystemTime::from(pass_time() - TimeDelta::hours(1))
}

/// An mtime too recent to touch.
fn fresh() -> SystemTime {
    SystemTime::from(pass_time() - TimeDelta::seconds(2))
}

/// A test fixture holding a temporary watch directory.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with a temporary directory.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    /// Get the path to the watch directory.
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file with content and the given modification time.
    fn create_file_at(&self, name: &str, content: &[u8], mtime: SystemTime) {
        let file_path = self.path().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
        file.set_modified(mtime).expect("Failed to set mtime");
    }

    /// Create a settled file.
    fn create_file(&self, name: &str, content: &str) {
        self.create_file_at(name, content.as_bytes(), settled());
    }

    /// Create a settled subdirectory, optionally with a file inside.
    fn create_subdir(&self, name: &str, inner_file: Option<&str>) {
        let dir_path = self.path().join(name);
        fs::create_dir_all(&dir_path).expect("Failed to create subdirectory");
        if let Some(inner) = inner_file {
            fs::write(dir_path.join(inner), "inner").expect("Failed to write inner file");
        }
        File::open(&dir_path)
            .and_then(|dir| dir.set_modified(settled()))
            .expect("Failed to set directory mtime");
    }

    /// Base configuration: default ages, everything else empty.
    fn config(&self) -> OrganizerConfig {
        OrganizerConfig::new(self.path().display().to_string())
    }

    /// Run one pass at `pass_time()` and return the processed count.
    fn run(&self, config: OrganizerConfig, dry_run: bool) -> usize {
        let organizer = Organizer::new(config).expect("Configuration should compile");
        organizer
            .run_pass_at(pass_time(), dry_run)
            .expect("Pass should succeed")
            .processed()
    }

    /// Assert that a file exists at the given relative path.
    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    /// Assert that a directory exists at the given relative path.
    fn assert_dir_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_dir(), "Directory should exist: {}", path.display());
    }

    /// Assert that nothing exists at the given relative path.
    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    /// Every path under the watch directory, sorted.
    fn snapshot(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(self.path())
            .into_iter()
            .flatten()
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        paths
    }
}

fn rule(name: &str, to_dir: &str) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        to_dir: Some(to_dir.to_string()),
        ..Default::default()
    }
}

fn pdf_rule() -> RuleConfig {
    RuleConfig {
        match_ext: vec!["pdf".to_string()],
        rename: Some("{stem}_{date}".to_string()),
        ..rule("pdf", "out/{YYYY}")
    }
}

// ============================================================================
// Test Suite 1: Rule-Driven Moves
// ============================================================================

#[test]
fn test_pdf_moved_renamed_and_marked() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "%PDF-1.4");

    let mut config = fixture.config();
    config.rules = vec![pdf_rule()];

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_file_exists("out/2024/report_20240309.pdf");
    fixture.assert_file_exists("out/2024/.dorg_managed");
    fixture.assert_not_exists("report.pdf");
}

#[test]
fn test_unmatched_files_stay_put() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", "hello");
    fixture.create_file("report.pdf", "%PDF-1.4");

    let mut config = fixture.config();
    config.rules = vec![pdf_rule()];

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_file_exists("notes.txt");
}

#[test]
fn test_first_matching_rule_wins() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.JPG", "jpeg");
    fixture.create_file("clip.mp4", "video");

    let mut config = fixture.config();
    config.rules = vec![
        RuleConfig {
            match_mime: vec!["image/".to_string()],
            ..rule("images", "Images")
        },
        RuleConfig {
            match_all: true,
            ..rule("everything", "Other")
        },
    ];

    assert_eq!(fixture.run(config, false), 2);
    fixture.assert_file_exists("Images/photo.jpg");
    fixture.assert_file_exists("Other/clip.mp4");
    fixture.assert_not_exists("Other/photo.jpg");
}

#[test]
fn test_glob_rule_with_rename() {
    let fixture = TestFixture::new();
    fixture.create_file("Invoice-March.pdf", "a");

    let mut config = fixture.config();
    config.rules = vec![RuleConfig {
        match_glob: vec!["Invoice-*".to_string()],
        rename: Some("{date}_{stem}{counter}".to_string()),
        ..rule("invoices", "Invoices/{YYYY}-{MM}")
    }];

    assert_eq!(fixture.run(config, false), 1);
    // {counter} is empty at zero
    fixture.assert_file_exists("Invoices/2024-03/20240309_Invoice-March.pdf");
}

#[test]
fn test_name_collision_gets_numbered_suffix() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "first");
    fixture.create_file("b.pdf", "second");

    let mut config = fixture.config();
    config.rules = vec![RuleConfig {
        match_ext: vec!["pdf".to_string()],
        rename: Some("doc".to_string()),
        ..rule("pdf", "out")
    }];

    assert_eq!(fixture.run(config, false), 2);
    // a.pdf sorts first, so it takes the plain name
    assert_eq!(fs::read_to_string(fixture.path().join("out/doc.pdf")).unwrap(), "first");
    assert_eq!(fs::read_to_string(fixture.path().join("out/doc_1.pdf")).unwrap(), "second");
}

#[test]
fn test_collision_without_ensure_unique_is_isolated_failure() {
    let fixture = TestFixture::new();
    fs::create_dir(fixture.path().join("out")).unwrap();
    fs::write(fixture.path().join("out/a.pdf"), "existing").unwrap();
    fixture.create_file("a.pdf", "incoming");
    fixture.create_file("b.pdf", "other");

    let mut config = fixture.config();
    config.rules = vec![RuleConfig {
        match_ext: vec!["pdf".to_string()],
        ensure_unique: false,
        ..rule("pdf", "out")
    }];

    let organizer = Organizer::new(config).unwrap();
    let report = organizer.run_pass_at(pass_time(), false).unwrap();

    // Replace-or-fail is platform dependent; either way b.pdf still moves.
    fixture.assert_file_exists("out/b.pdf");
    assert_eq!(report.files_moved + report.failures.len(), 2);
}

#[test]
fn test_second_pass_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "%PDF-1.4");

    let mut config = fixture.config();
    config.rules = vec![pdf_rule()];

    assert_eq!(fixture.run(config.clone(), false), 1);
    let after_first = fixture.snapshot();
    assert_eq!(fixture.run(config, false), 0);
    assert_eq!(fixture.snapshot(), after_first);
}

// ============================================================================
// Test Suite 2: Dry-Run Mode
// ============================================================================

#[test]
fn test_dry_run_changes_nothing_and_counts_the_same() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "%PDF-1.4");
    fixture.create_file("song.mp3", "audio");
    fixture.create_subdir("misc", Some("readme.txt"));

    let mut config = fixture.config();
    config.collect_unmanaged_dirs = true;
    config.unmanaged_dir_target = "_Folders/{YYYY}-{MM}".to_string();
    config.rules = vec![pdf_rule()];

    let before = fixture.snapshot();
    let dry_count = fixture.run(config.clone(), true);
    assert_eq!(fixture.snapshot(), before, "Dry run must not touch the disk");

    let real_count = fixture.run(config, false);
    assert_eq!(dry_count, real_count);
    assert_eq!(real_count, 2);
}

// ============================================================================
// Test Suite 3: Candidate Filtering
// ============================================================================

#[test]
fn test_young_files_are_skipped() {
    let fixture = TestFixture::new();
    fixture.create_file_at("new.pdf", b"fresh", fresh());
    fixture.create_file("old.pdf", "settled");

    let mut config = fixture.config();
    config.rules = vec![RuleConfig {
        match_ext: vec!["pdf".to_string()],
        ..rule("pdf", "out")
    }];

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_file_exists("new.pdf");
    fixture.assert_file_exists("out/old.pdf");
}

#[test]
fn test_ignore_lists() {
    let fixture = TestFixture::new();
    fixture.create_file("movie.mkv.part", "partial");
    fixture.create_file("desktop.ini", "ini");
    fixture.create_file("kept.txt", "text");

    let mut config = fixture.config();
    config.ignore_ext = vec![".part".to_string()];
    config.ignore_names = vec!["desktop.ini".to_string()];
    config.rules = vec![RuleConfig {
        match_all: true,
        ..rule("all", "Sorted")
    }];

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_file_exists("movie.mkv.part");
    fixture.assert_file_exists("desktop.ini");
    fixture.assert_file_exists("Sorted/kept.txt");
}

#[test]
fn test_missing_watch_dir_processes_nothing() {
    let fixture = TestFixture::new();
    let mut config = OrganizerConfig::new(fixture.path().join("gone").display().to_string());
    config.rules = vec![pdf_rule()];

    assert_eq!(fixture.run(config, false), 0);
}

// ============================================================================
// Test Suite 4: Unmanaged Folder Collection
// ============================================================================

#[test]
fn test_unmanaged_folder_collected_rule_destination_kept() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "%PDF-1.4");
    fixture.create_subdir("misc", Some("readme.txt"));
    fixture.create_subdir("out", None);
    fixture.create_subdir("Projects", None);
    fixture.create_subdir(".git", None);

    let mut config = fixture.config();
    config.collect_unmanaged_dirs = true;
    config.unmanaged_dir_target = "_Folders/{YYYY}-{MM}".to_string();
    config.unmanaged_dirs_exclude = vec!["Projects".to_string()];
    config.rules = vec![pdf_rule()];

    assert_eq!(fixture.run(config, false), 2);
    fixture.assert_file_exists("_Folders/2024-03/misc/readme.txt");
    fixture.assert_not_exists("misc");
    fixture.assert_dir_exists("out/2024");
    fixture.assert_dir_exists("Projects");
    fixture.assert_dir_exists(".git");
}

#[test]
fn test_managed_folder_is_never_collected() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Sorted", Some(".dorg_managed"));
    fixture.create_subdir("stray", None);

    let mut config = fixture.config();
    config.collect_unmanaged_dirs = true;
    config.unmanaged_dir_target = "_Folders".to_string();

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_dir_exists("Sorted");
    fixture.assert_dir_exists("_Folders/stray");
}

#[test]
fn test_collected_folder_name_collision() {
    let fixture = TestFixture::new();
    fs::create_dir_all(fixture.path().join("_Folders/misc")).unwrap();
    fixture.create_subdir("misc", Some("new.txt"));

    let mut config = fixture.config();
    config.collect_unmanaged_dirs = true;
    config.unmanaged_dir_target = "_Folders".to_string();

    assert_eq!(fixture.run(config, false), 1);
    fixture.assert_file_exists("_Folders/misc_1/new.txt");
}

#[test]
fn test_collection_disabled_by_default() {
    let fixture = TestFixture::new();
    fixture.create_subdir("misc", None);

    assert_eq!(fixture.run(fixture.config(), false), 0);
    fixture.assert_dir_exists("misc");
}

// ============================================================================
// Test Suite 5: Configuration Loading
// ============================================================================

#[test]
fn test_load_json_with_comments_and_trailing_commas() {
    let fixture = TestFixture::new();
    let config_dir = TempDir::new().unwrap();
    let watch = serde_json::to_string(&fixture.path().display().to_string()).unwrap();
    let text = format!(
        r#"{{
  // where downloads land
  "watch_dir": {watch},
  "min_age_sec": 10,
  /* rules run top to bottom */
  "rules": [
    {{ "name": "pdf", "match_ext": ["pdf"], "to_dir": "Docs", }},
  ],
}}"#
    );
    let config_path = config_dir.path().join("config.json");
    fs::write(&config_path, text).unwrap();
    fixture.create_file("manual.pdf", "%PDF");

    let organizer = load_organizer(&config_path).expect("Config should load");
    let report = organizer.run_pass_at(pass_time(), false).unwrap();

    assert_eq!(report.files_moved, 1);
    fixture.assert_file_exists("Docs/manual.pdf");
}

#[test]
fn test_load_toml_config() {
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("dorg.toml");
    fs::write(
        &config_path,
        r#"
watch_dir = "/tmp/downloads"
interval_sec = 0

[[rules]]
name = "images"
match_mime = ["image/"]
to_dir = "Images"
"#,
    )
    .unwrap();

    let organizer = load_organizer(&config_path).expect("TOML config should load");
    assert_eq!(organizer.config().rules.len(), 1);
    assert_eq!(organizer.config().interval().as_secs(), 1);
}

#[test]
fn test_unterminated_bracket_glob_matches_literally() {
    let fixture = TestFixture::new();
    fixture.create_file("[oops] notes.txt", "text");
    fixture.create_file("oops.txt", "text");

    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.json");
    let watch = serde_json::to_string(&fixture.path().display().to_string()).unwrap();
    fs::write(
        &config_path,
        format!(
            r#"{{ "watch_dir": {watch}, "rules": [ {{ "name": "odd", "match_glob": ["[oops*"], "to_dir": "Odd" }} ] }}"#
        ),
    )
    .unwrap();

    let organizer = load_organizer(&config_path).expect("Bracket glob should load");
    let report = organizer.run_pass_at(pass_time(), false).unwrap();

    assert_eq!(report.files_moved, 1);
    fixture.assert_file_exists("Odd/[oops] notes.txt");
    fixture.assert_file_exists("oops.txt");
}
