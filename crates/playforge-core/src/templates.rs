//! Template catalog and visual editor mapping

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::{self, MANIFEST_FILE};
use crate::paths;

/// Description shown for templates whose manifest has none
pub const DEFAULT_DESCRIPTION: &str = "No description.";

/// A template offered on the create page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Structured editors available for known templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorKind {
    MatchingGame,
    LogicMaze,
    DragAndDrop,
    SequenceCompletion,
    InteractiveStory,
    MemoryGame,
    OddOneOut,
    Quiz,
}

impl EditorKind {
    pub const ALL: [EditorKind; 8] = [
        EditorKind::MatchingGame,
        EditorKind::LogicMaze,
        EditorKind::DragAndDrop,
        EditorKind::SequenceCompletion,
        EditorKind::InteractiveStory,
        EditorKind::MemoryGame,
        EditorKind::OddOneOut,
        EditorKind::Quiz,
    ];

    /// Look up the editor for a template id
    pub fn for_template(template_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.template_id() == template_id)
    }

    pub fn template_id(&self) -> &'static str {
        match self {
            EditorKind::MatchingGame => "matching_game",
            EditorKind::LogicMaze => "logic_maze",
            EditorKind::DragAndDrop => "drag_and_drop",
            EditorKind::SequenceCompletion => "sequence_completion",
            EditorKind::InteractiveStory => "interactive_story",
            EditorKind::MemoryGame => "memory_game",
            EditorKind::OddOneOut => "odd_one_out",
            EditorKind::Quiz => "quiz",
        }
    }

    /// Human-readable editor title
    pub fn title(&self) -> &'static str {
        match self {
            EditorKind::MatchingGame => "Matching game",
            EditorKind::LogicMaze => "Logic maze",
            EditorKind::DragAndDrop => "Drag and drop",
            EditorKind::SequenceCompletion => "Sequence completion",
            EditorKind::InteractiveStory => "Interactive story",
            EditorKind::MemoryGame => "Memory game",
            EditorKind::OddOneOut => "Odd one out",
            EditorKind::Quiz => "Quiz",
        }
    }
}

/// Read-only view over the template root
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    root: PathBuf,
}

impl TemplateCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Templates that carry a readable manifest, sorted by id
    pub fn list(&self) -> Result<Vec<TemplateInfo>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            let manifest = manifest::read(&path);
            if !manifest.from_file {
                tracing::warn!(template = %path.display(), "Skipping template with corrupt manifest");
                continue;
            }
            templates.push(TemplateInfo {
                id: entry.file_name().to_string_lossy().into_owned(),
                name: manifest.name,
                description: manifest
                    .description
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            });
        }
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    /// Resolve a template folder, failing if it does not exist
    pub fn path_of(&self, template_id: &str) -> Result<PathBuf> {
        let path = paths::resolve_child(&self.root, template_id)?;
        if !path.is_dir() {
            return Err(Error::TemplateNotFound(template_id.to_string()));
        }
        Ok(path)
    }
}
