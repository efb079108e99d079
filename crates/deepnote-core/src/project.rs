//! `.deepnote` project files.
//!
//! Only the parts the integration pipeline reads are modelled: the declared
//! integration list and each block's integration reference. Unknown fields
//! are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Block metadata field holding the id of the integration a SQL block runs against.
pub const SQL_INTEGRATION_ID_FIELD: &str = "sql_integration_id";

/// Top-level document of a `.deepnote` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepnoteFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub metadata: FileMetadata,
    pub project: DeepnoteProject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepnoteProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Declared integrations. `None` when the file carries no list at all,
    /// which is different from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<ProjectIntegration>>,
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
}

/// An integration reference as declared by the project.
///
/// `integration_type` is the dialect tag (`pgsql`, `big-query`, ...) and is
/// kept as a raw string so that files naming types we do not know still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIntegration {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Block {
    /// Integration referenced by this block, if any.
    pub fn sql_integration_id(&self) -> Option<&str> {
        self.metadata
            .get(SQL_INTEGRATION_ID_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl DeepnoteFile {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }
}

impl DeepnoteProject {
    /// Parse a whole `.deepnote` document and return its project.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(DeepnoteFile::from_yaml_str(source)?.project)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(DeepnoteFile::from_path(path)?.project)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.notebooks.iter().flat_map(|notebook| notebook.blocks.iter())
    }

    /// Integration ids referenced by blocks, deduplicated, in first-seen order.
    pub fn referenced_integration_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.blocks()
            .filter_map(Block::sql_integration_id)
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Integration ids this project needs: the declared list when present,
    /// otherwise whatever its blocks reference.
    pub fn integration_ids(&self) -> Vec<String> {
        match &self.integrations {
            Some(declared) => declared.iter().map(|integration| integration.id.clone()).collect(),
            None => self.referenced_integration_ids(),
        }
    }
}

/// Lookup of loaded projects by id.
pub trait ProjectProvider: Send + Sync {
    fn project(&self, project_id: &str) -> Option<DeepnoteProject>;
}

/// [`ProjectProvider`] over a fixed set of loaded projects.
#[derive(Debug, Default)]
pub struct InMemoryProjects {
    projects: BTreeMap<String, DeepnoteProject>,
}

impl FromIterator<DeepnoteProject> for InMemoryProjects {
    fn from_iter<I: IntoIterator<Item = DeepnoteProject>>(iter: I) -> Self {
        let projects = iter
            .into_iter()
            .map(|project| (project.id.clone(), project))
            .collect();
        Self { projects }
    }
}

impl ProjectProvider for InMemoryProjects {
    fn project(&self, project_id: &str) -> Option<DeepnoteProject> {
        self.projects.get(project_id).cloned()
    }
}
