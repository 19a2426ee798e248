//! Attack tree documents: load, check, convert, lay out and save
//!
//! Saving is gated on the same checks the editor runs before writing a
//! file, in this order:
//!
//! ```text
//! 1. no cycle                 -> CycleDetected(id)
//! 2. title, author and root   -> MissingMeta
//! 3. every threat and
//!    countermeasure titled    -> EmptyTitle(ids)
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, CodecResultExt, IoResultExt};
use crate::config::Settings;
use crate::domain::{AttackTree, DomainError, Meta, Node, NodeId};
use crate::infrastructure::traits::{FileSystem, TreeCodec};
use crate::layout::{AbortSignal, LayoutEngine, LayoutReport};

/// Outcome of the save-time checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Node closing a cycle, if any
    pub cycle: Option<NodeId>,
    pub meta_complete: bool,
    /// Threats and countermeasures without title
    pub untitled: Vec<NodeId>,
    /// Tree needs the extended schema
    pub extended: bool,
}

impl ValidationReport {
    /// First failing save gate.
    pub fn first_error(&self) -> Option<DomainError> {
        if let Some(id) = &self.cycle {
            return Some(DomainError::CycleDetected(id.clone()));
        }
        if !self.meta_complete {
            return Some(DomainError::MissingMeta);
        }
        if !self.untitled.is_empty() {
            return Some(DomainError::EmptyTitle(self.untitled.clone()));
        }
        None
    }

    pub fn is_saveable(&self) -> bool {
        self.first_error().is_none()
    }
}

/// Document use cases over a file system and a codec.
pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn TreeCodec>,
    settings: Arc<Settings>,
}

impl DocumentService {
    pub fn new(fs: Arc<dyn FileSystem>, codec: Arc<dyn TreeCodec>, settings: Arc<Settings>) -> Self {
        Self {
            fs,
            codec,
            settings,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<AttackTree> {
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read document", path)?;
        let tree = self.codec.decode(&text).for_document(path)?;
        info!("loaded {} ({} nodes)", path.display(), tree.len());
        Ok(tree)
    }

    /// Runs every save gate without stopping at the first failure.
    pub fn validate(&self, tree: &mut AttackTree) -> ValidationReport {
        let cycle = match tree.check_cycle() {
            Err(DomainError::CycleDetected(id)) => Some(id),
            _ => None,
        };
        let meta_complete = tree.check_meta();
        tree.check_nodes();
        let untitled = tree.false_nodes().to_vec();
        let extended = tree.is_extended() || tree.check_extended();
        ValidationReport {
            cycle,
            meta_complete,
            untitled,
            extended,
        }
    }

    /// Writes `tree` to `path` once every save gate passes.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, tree: &mut AttackTree, path: &Path) -> ApplicationResult<()> {
        if let Some(err) = self.validate(tree).first_error() {
            debug!("save refused: {}", err);
            return Err(err.into());
        }
        let text = self.codec.encode(tree).for_document(path)?;
        self.fs
            .replace(path, &text)
            .with_path_context("write document", path)?;
        info!("saved {}", path.display());
        Ok(())
    }

    /// Converts `tree` to simple form; returns the number of duplicated nodes.
    #[instrument(level = "debug", skip_all)]
    pub fn simplify(&self, tree: &mut AttackTree) -> ApplicationResult<usize> {
        Ok(tree.make_simple()?)
    }

    #[instrument(level = "debug", skip_all)]
    pub fn layout(
        &self,
        tree: &mut AttackTree,
        abort: &dyn AbortSignal,
    ) -> ApplicationResult<LayoutReport> {
        let engine = LayoutEngine::new(&self.settings.layout);
        Ok(engine.run(tree, abort)?)
    }

    /// Fresh document with a single root threat, dated today.
    pub fn new_document(
        &self,
        title: &str,
        author: &str,
        root_title: &str,
    ) -> ApplicationResult<AttackTree> {
        let meta = Meta {
            title: title.to_string(),
            author: author.to_string(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            description: String::new(),
        };
        let mut tree = AttackTree::with_meta(meta);
        tree.add_node(Node::threat(root_title).as_root())?;
        Ok(tree)
    }
}
