//! Tree definition files
//!
//! A tree is described in TOML:
//!
//! ```toml
//! name = "demo"
//!
//! [[nodes]]
//! id = 1
//! name = "Strike"
//! max_points = 2
//! kind = "active"          # "passive" | { switch = ["Left", "Right"] }
//!
//! [[nodes]]
//! id = 2
//! name = "Follow Through"
//! prerequisites = [1]
//! points_required = 2
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{Node, NodeId, NodeKind, Tree, TreeBuilder};
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDef {
    #[default]
    Active,
    Passive,
    Switch([String; 2]),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    pub id: NodeId,
    pub name: String,
    #[serde(default = "default_max_points")]
    pub max_points: u8,
    #[serde(default)]
    pub points_required: u32,
    #[serde(default)]
    pub prerequisites: Vec<NodeId>,
    #[serde(default)]
    pub kind: KindDef,
    #[serde(default)]
    pub pre_filled: bool,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub column: u32,
}

fn default_max_points() -> u8 {
    1
}

/// On-disk shape of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeFile {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

impl From<NodeDef> for Node {
    fn from(def: NodeDef) -> Self {
        let kind = match def.kind {
            KindDef::Active => NodeKind::Active,
            KindDef::Passive => NodeKind::Passive,
            KindDef::Switch(variants) => NodeKind::Switch { variants },
        };
        Node {
            kind,
            max_points: def.max_points,
            points_required: def.points_required,
            prerequisites: def.prerequisites,
            pre_filled: def.pre_filled,
            ..Node::new(def.id, def.name).at(def.row, def.column)
        }
    }
}

impl TreeFile {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate the definition into a tree.
    pub fn into_tree(self) -> InfraResult<Tree> {
        let tree = TreeBuilder::new(self.name)
            .nodes(self.nodes.into_iter().map(Node::from))
            .build()?;
        Ok(tree)
    }
}

/// Read and validate a tree definition file.
#[instrument(level = "debug", skip(fs))]
pub fn load_tree(fs: &dyn FileSystem, path: &Path) -> InfraResult<Tree> {
    if !fs.is_file(path) {
        return Err(InfraError::TreeFile {
            path: path.to_path_buf(),
            message: "not a file".to_string(),
        });
    }
    let content = fs
        .read_to_string(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
    let file = TreeFile::parse(&content).map_err(|e| InfraError::TreeFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let tree = file.into_tree()?;
    debug!("load_tree: '{}' with {} nodes", tree.name(), tree.len());
    Ok(tree)
}
