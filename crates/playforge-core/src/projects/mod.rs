//! Folder-backed project repository
//!
//! A project is a directory under the projects root, copied from a template and
//! described by its `manifest.json`. The folder name is the project id.

pub mod export;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::manifest;
use crate::paths;
use crate::templates::{EditorKind, TemplateCatalog};

/// File every game starts from
pub const ENTRY_FILE: &str = "index.html";

/// Template-specific structured content
pub const DATA_FILE: &str = "data.json";

/// Extensions editable from the code editor
pub const EDITABLE_EXTENSIONS: [&str; 4] = ["html", "css", "js", "json"];

/// Project listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Folder name
    pub id: String,
    /// Display name from the manifest, or the folder name
    pub name: String,
    pub template_id: Option<String>,
}

/// Outcome of resolving a project's visual editor
#[derive(Debug, Clone, PartialEq)]
pub enum VisualEditor {
    Available { kind: EditorKind, data: Value },
    Unavailable(EditorUnavailable),
}

/// Why a project has no visual editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorUnavailable {
    MissingManifest,
    UnspecifiedTemplate,
    UnsupportedTemplate(String),
}

impl fmt::Display for EditorUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingManifest => {
                write!(f, "Visual editor not available: manifest.json not found.")
            }
            Self::UnspecifiedTemplate => {
                write!(f, "Visual editor not available: template type not specified.")
            }
            Self::UnsupportedTemplate(id) => {
                write!(f, "No visual editor available for game type \"{}\".", id)
            }
        }
    }
}

/// Project repository over the filesystem
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    root: PathBuf,
    templates: TemplateCatalog,
}

impl ProjectRepository {
    /// Create a repository from the storage configuration
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            root: storage.projects_dir.clone(),
            templates: TemplateCatalog::new(storage.templates_dir.clone()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    /// Make sure the projects root exists
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Resolve an existing project folder
    pub fn project_dir(&self, project: &str) -> Result<PathBuf> {
        if project.trim().is_empty() {
            return Err(Error::ProjectNotFound(project.to_string()));
        }
        let dir = paths::resolve_child(&self.root, project)?;
        if !dir.is_dir() {
            return Err(Error::ProjectNotFound(project.to_string()));
        }
        Ok(dir)
    }

    /// Whether a project folder exists
    pub fn exists(&self, project: &str) -> Result<bool> {
        match self.project_dir(project) {
            Ok(_) => Ok(true),
            Err(Error::ProjectNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List all projects, ordered by id
    pub fn list(&self) -> Result<Vec<ProjectSummary>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let manifest = manifest::read(&entry.path());
            projects.push(ProjectSummary {
                id: entry.file_name().to_string_lossy().into_owned(),
                name: manifest.name,
                template_id: manifest.template_id,
            });
        }
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    /// Create a project by copying a template
    ///
    /// Returns the new project's id (the sanitized folder name).
    pub fn create(&self, project_name: &str, template_id: &str) -> Result<String> {
        let project_name = project_name.trim();
        let template_id = template_id.trim();
        if project_name.is_empty() || template_id.is_empty() {
            return Err(Error::Validation(
                "Project name and template cannot be empty".to_string(),
            ));
        }

        let id = paths::sanitize_name(project_name);
        if id.is_empty() {
            return Err(Error::Validation(format!(
                "Project name '{}' must contain letters or digits",
                project_name
            )));
        }

        let target = paths::resolve_child(&self.root, &id)?;
        if target.exists() {
            return Err(Error::Conflict(id));
        }
        let source = self.templates.path_of(template_id)?;

        self.ensure_root()?;
        copy_tree(&source, &target)?;

        let result = manifest::update(&target, |doc| {
            doc.insert("name".into(), Value::from(project_name));
            doc.insert("template_id".into(), Value::from(template_id));
        });
        if let Err(e) = result {
            warn!(project = %id, error = %e, "Could not update manifest of new project");
        }

        info!(project = %id, template = %template_id, "Project created");
        Ok(id)
    }

    /// Copy a project under the first free `<id>_copy_<n>` name
    pub fn duplicate(&self, project_name: &str) -> Result<String> {
        let id = paths::sanitize_name(project_name);
        let source = self.project_dir(&id)?;
        let display_name = manifest::read(&source).name;

        let mut copy_number = 1u32;
        let (new_id, target) = loop {
            let candidate = format!("{}_copy_{}", id, copy_number);
            let path = paths::resolve_child(&self.root, &candidate)?;
            if !path.exists() {
                break (candidate, path);
            }
            copy_number += 1;
        };

        copy_tree(&source, &target)?;

        let new_name = format!("{} Copy {}", display_name, copy_number);
        if let Err(e) = manifest::update(&target, |doc| {
            doc.insert("name".into(), Value::from(new_name));
        }) {
            warn!(project = %new_id, error = %e, "Could not update manifest of duplicated project");
        }

        info!(source = %id, project = %new_id, "Project duplicated");
        Ok(new_id)
    }

    /// Recursively delete a project folder
    pub fn delete(&self, project_name: &str) -> Result<String> {
        let id = paths::sanitize_name(project_name);
        let dir = self.project_dir(&id)?;
        fs::remove_dir_all(&dir)?;
        info!(project = %id, "Project deleted");
        Ok(id)
    }

    /// Zip a project in memory
    pub fn export(&self, project: &str) -> Result<Vec<u8>> {
        let dir = self.project_dir(project)?;
        export::zip_directory(&dir)
    }

    /// Top-level files editable from the code editor, sorted
    pub fn list_editable_files(&self, project: &str) -> Result<Vec<String>> {
        let dir = self.project_dir(project)?;
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let editable = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EDITABLE_EXTENSIONS.contains(&ext));
            if editable {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read a text file from a project
    pub fn read_file(&self, project: &str, file_name: &str) -> Result<String> {
        let dir = self.project_dir(project)?;
        let path = paths::resolve(&dir, file_name)?;
        if !path.is_file() {
            return Err(Error::FileNotFound(file_name.to_string()));
        }
        Ok(fs::read_to_string(&path)?)
    }

    /// Create or fully replace a text file in a project
    pub fn write_file(&self, project: &str, file_name: &str, content: &str) -> Result<()> {
        let dir = self.project_dir(project)?;
        let path = paths::resolve(&dir, file_name)?;
        if path.is_dir() {
            return Err(Error::Validation(format!("'{}' is a directory", file_name)));
        }
        manifest::write_atomic(&path, content.as_bytes())?;
        debug!(project, file = file_name, bytes = content.len(), "File saved");
        Ok(())
    }

    /// Path of a static asset inside a project, for preview serving
    pub fn asset_path(&self, project: &str, file_name: &str) -> Result<PathBuf> {
        let dir = self.project_dir(project)?;
        let path = paths::resolve(&dir, file_name)?;
        if !path.is_file() {
            return Err(Error::FileNotFound(file_name.to_string()));
        }
        Ok(path)
    }

    /// Read the structured data document, `[]` when absent
    pub fn read_data_document(&self, project: &str) -> Result<Value> {
        let dir = self.project_dir(project)?;
        let path = dir.join(DATA_FILE);
        if !path.is_file() {
            return Ok(Value::Array(Vec::new()));
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::invalid_data(format!("malformed {}: {}", DATA_FILE, e)))
    }

    /// Replace the structured data document
    pub fn write_data_document(&self, project: &str, value: &Value) -> Result<()> {
        let dir = self.project_dir(project)?;
        manifest::write_json_atomic(&dir.join(DATA_FILE), value)?;
        info!(project, "Game data saved");
        Ok(())
    }

    /// Resolve the structured editor for a project's template
    pub fn visual_editor(&self, project: &str) -> Result<VisualEditor> {
        let dir = self.project_dir(project)?;
        let manifest = manifest::read(&dir);
        if !manifest.from_file {
            return Ok(VisualEditor::Unavailable(EditorUnavailable::MissingManifest));
        }
        let Some(template_id) = manifest.template_id else {
            return Ok(VisualEditor::Unavailable(EditorUnavailable::UnspecifiedTemplate));
        };
        let Some(kind) = EditorKind::for_template(&template_id) else {
            return Ok(VisualEditor::Unavailable(
                EditorUnavailable::UnsupportedTemplate(template_id),
            ));
        };

        let data = self.read_data_document(project)?;
        Ok(VisualEditor::Available { kind, data })
    }
}

/// Recursively copy `source` to `target`; symlinks are skipped
fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Other(e.to_string()))?;
        let dest = target.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest)?;
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular file while copying");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_FILE;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        repo: ProjectRepository,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig::rooted_at(dir.path());
        fs::create_dir_all(&storage.projects_dir).unwrap();

        let quiz = storage.templates_dir.join("quiz");
        fs::create_dir_all(quiz.join("assets")).unwrap();
        fs::write(quiz.join(ENTRY_FILE), "<html>quiz</html>").unwrap();
        fs::write(quiz.join("style.css"), "body {}").unwrap();
        fs::write(quiz.join("script.js"), "console.log('quiz');").unwrap();
        fs::write(quiz.join("assets").join("logo.svg"), "<svg/>").unwrap();
        fs::write(
            quiz.join(MANIFEST_FILE),
            r#"{"name": "Quiz", "description": "Questions", "entry": "index.html"}"#,
        )
        .unwrap();

        let bare = storage.templates_dir.join("bare");
        fs::create_dir_all(&bare).unwrap();
        fs::write(bare.join(ENTRY_FILE), "<html></html>").unwrap();

        Fixture {
            repo: ProjectRepository::new(&storage),
            _dir: dir,
        }
    }

    #[test]
    fn test_create_then_list_shows_display_name() {
        let f = fixture();
        let id = f
            .repo
            .create("  Quiz della città!  ", "quiz")
            .expect("Failed to create project");
        assert_eq!(id, "Quiz_della_città");

        let projects = f.repo.list().expect("Failed to list projects");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "Quiz_della_città");
        assert_eq!(projects[0].name, "Quiz della città!");
        assert_eq!(projects[0].template_id.as_deref(), Some("quiz"));

        // Extra manifest fields survive the patch
        let manifest = fs::read_to_string(f.repo.root().join(&id).join(MANIFEST_FILE)).unwrap();
        let doc: Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(doc["entry"], "index.html");
        assert!(f.repo.root().join(&id).join("assets").join("logo.svg").is_file());
    }

    #[test]
    fn test_create_validation() {
        let f = fixture();
        assert!(matches!(f.repo.create("", "quiz"), Err(Error::Validation(_))));
        assert!(matches!(f.repo.create("Name", "  "), Err(Error::Validation(_))));
        assert!(matches!(f.repo.create("???", "quiz"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_conflict_on_sanitized_name() {
        let f = fixture();
        f.repo.create("My Quiz", "quiz").unwrap();
        match f.repo.create("My Quiz?", "quiz") {
            Err(Error::Conflict(id)) => assert_eq!(id, "My_Quiz"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_create_unknown_template() {
        let f = fixture();
        assert!(matches!(
            f.repo.create("Maze", "logic_maze"),
            Err(Error::TemplateNotFound(_))
        ));
        assert!(!f.repo.root().join("Maze").exists());
    }

    #[test]
    fn test_create_without_template_manifest_keeps_copy() {
        let f = fixture();
        let id = f.repo.create("Plain Game", "bare").unwrap();
        let projects = f.repo.list().unwrap();
        assert_eq!(projects[0].id, id);
        // No manifest to patch: display name degrades to the folder name
        assert_eq!(projects[0].name, "Plain_Game");
        assert!(f.repo.root().join(&id).join(ENTRY_FILE).is_file());
    }

    #[test]
    fn test_list_skips_files_and_tolerates_corrupt_manifest() {
        let f = fixture();
        fs::write(f.repo.root().join("stray.txt"), "x").unwrap();
        let broken = f.repo.root().join("Broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(MANIFEST_FILE), "{oops").unwrap();

        let projects = f.repo.list().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Broken");
    }

    #[test]
    fn test_duplicate_twice() {
        let f = fixture();
        let id = f.repo.create("Memory Fun", "quiz").unwrap();

        let first = f.repo.duplicate(&id).expect("Failed to duplicate");
        let second = f.repo.duplicate(&id).expect("Failed to duplicate again");
        assert_eq!(first, "Memory_Fun_copy_1");
        assert_eq!(second, "Memory_Fun_copy_2");

        let projects = f.repo.list().unwrap();
        let names: Vec<(&str, &str)> = projects
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();
        assert!(names.contains(&("Memory_Fun_copy_1", "Memory Fun Copy 1")));
        assert!(names.contains(&("Memory_Fun_copy_2", "Memory Fun Copy 2")));

        f.repo.delete(&first).unwrap();
        assert!(!f.repo.exists(&first).unwrap());
        assert!(f.repo.exists(&second).unwrap());
        assert!(f.repo.exists(&id).unwrap());
    }

    #[test]
    fn test_duplicate_missing_project() {
        let f = fixture();
        assert!(matches!(
            f.repo.duplicate("Ghost"),
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_delete_sanitizes_and_reports_missing() {
        let f = fixture();
        f.repo.create("Old Game", "quiz").unwrap();

        assert!(matches!(
            f.repo.delete("Older Game"),
            Err(Error::ProjectNotFound(_))
        ));
        assert!(f.repo.exists("Old_Game").unwrap());

        // Traversal characters are stripped before the lookup
        assert_eq!(f.repo.delete("../Old Game/..").unwrap(), "Old_Game");
        assert!(f.repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_file_round_trip_with_unicode() {
        let f = fixture();
        let id = f.repo.create("Story", "quiz").unwrap();
        let text = "<p>Perché no? ☀️ — ünïcödé</p>\n";

        f.repo.write_file(&id, "x.html", text).unwrap();
        assert_eq!(f.repo.read_file(&id, "x.html").unwrap(), text);

        f.repo.write_file(&id, "x.html", "short").unwrap();
        assert_eq!(f.repo.read_file(&id, "x.html").unwrap(), "short");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_files_keep_their_mode() {
        use std::os::unix::fs::PermissionsExt;

        let mode_of = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        let f = fixture();
        let id = f.repo.create("Story", "quiz").unwrap();
        let dir = f.repo.root().join(&id);
        let template_manifest = f.repo.templates().root().join("quiz").join(MANIFEST_FILE);
        assert_eq!(mode_of(&dir.join(MANIFEST_FILE)), mode_of(&template_manifest));

        fs::set_permissions(dir.join(ENTRY_FILE), fs::Permissions::from_mode(0o644)).unwrap();
        f.repo.write_file(&id, ENTRY_FILE, "y").unwrap();
        assert_eq!(mode_of(&dir.join(ENTRY_FILE)), 0o644);

        f.repo.write_file(&id, "extra.js", "let x = 1;").unwrap();
        assert_eq!(mode_of(&dir.join("extra.js")), 0o644);

        f.repo.write_data_document(&id, &json!([])).unwrap();
        assert_eq!(mode_of(&dir.join(DATA_FILE)), 0o644);
    }

    #[test]
    fn test_file_access_errors() {
        let f = fixture();
        let id = f.repo.create("Story", "quiz").unwrap();

        assert!(matches!(
            f.repo.read_file(&id, "missing.js"),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(
            f.repo.read_file(&id, "../../secret"),
            Err(Error::PathTraversal(_))
        ));
        assert!(matches!(
            f.repo.write_file(&id, "/etc/evil", "x"),
            Err(Error::PathTraversal(_))
        ));
        assert!(matches!(
            f.repo.read_file("Nope", "index.html"),
            Err(Error::ProjectNotFound(_))
        ));
        assert!(matches!(
            f.repo.read_file("../Story", "index.html"),
            Err(Error::PathTraversal(_))
        ));
    }

    #[test]
    fn test_list_editable_files() {
        let f = fixture();
        let id = f.repo.create("Story", "quiz").unwrap();
        fs::write(f.repo.root().join(&id).join("notes.txt"), "x").unwrap();

        let files = f.repo.list_editable_files(&id).unwrap();
        assert_eq!(files, ["index.html", "manifest.json", "script.js", "style.css"]);
    }

    #[test]
    fn test_data_document() {
        let f = fixture();
        let id = f.repo.create("Quiz", "quiz").unwrap();

        assert_eq!(f.repo.read_data_document(&id).unwrap(), json!([]));

        let data = json!([{"question": "Capitale d'Italia?", "answers": ["Roma", "Milano"]}]);
        f.repo.write_data_document(&id, &data).unwrap();
        assert_eq!(f.repo.read_data_document(&id).unwrap(), data);

        fs::write(f.repo.root().join(&id).join(DATA_FILE), "{broken").unwrap();
        assert!(matches!(
            f.repo.read_data_document(&id),
            Err(Error::Storage(_))
        ));

        assert!(matches!(
            f.repo.write_data_document("Ghost", &data),
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_visual_editor_resolution() {
        let f = fixture();
        let quiz = f.repo.create("Quiz", "quiz").unwrap();
        match f.repo.visual_editor(&quiz).unwrap() {
            VisualEditor::Available { kind, data } => {
                assert_eq!(kind, EditorKind::Quiz);
                assert_eq!(data, json!([]));
            }
            other => panic!("expected editor, got {other:?}"),
        }

        let bare = f.repo.create("Bare", "bare").unwrap();
        assert_eq!(
            f.repo.visual_editor(&bare).unwrap(),
            VisualEditor::Unavailable(EditorUnavailable::MissingManifest)
        );

        manifest::write_json_atomic(
            &f.repo.root().join(&bare).join(MANIFEST_FILE),
            &json!({"name": "Bare"}),
        )
        .unwrap();
        assert_eq!(
            f.repo.visual_editor(&bare).unwrap(),
            VisualEditor::Unavailable(EditorUnavailable::UnspecifiedTemplate)
        );

        manifest::update(&f.repo.root().join(&bare), |doc| {
            doc.insert("template_id".into(), json!("pong"));
        })
        .unwrap();
        let unavailable = f.repo.visual_editor(&bare).unwrap();
        assert_eq!(
            unavailable,
            VisualEditor::Unavailable(EditorUnavailable::UnsupportedTemplate("pong".into()))
        );
    }

    #[test]
    fn test_export_missing_project() {
        let f = fixture();
        assert!(matches!(f.repo.export("Ghost"), Err(Error::ProjectNotFound(_))));
    }

    #[test]
    fn test_asset_path() {
        let f = fixture();
        let id = f.repo.create("Quiz", "quiz").unwrap();
        assert!(f.repo.asset_path(&id, "assets/logo.svg").unwrap().is_file());
        assert!(matches!(
            f.repo.asset_path(&id, "assets"),
            Err(Error::FileNotFound(_))
        ));
    }
}
