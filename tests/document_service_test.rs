//! DocumentService: load, validate, save gates, simplify, layout, new documents.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use atdraw::application::services::DocumentService;
use atdraw::application::ApplicationError;
use atdraw::config::Settings;
use atdraw::domain::{AttackTree, DomainError, Meta, Node, NodeId, NodeKind};
use atdraw::infrastructure::traits::{FileSystem, RealFileSystem};
use atdraw::infrastructure::xml::{CodecError, XmlCodec};
use atdraw::infrastructure::di::ServiceContainer;
use atdraw::layout::NeverAbort;
use atdraw::util::testing;

/// In-memory file system recording writes and renames.
struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    renames: Mutex<Vec<(PathBuf, PathBuf)>>,
    fail_writes: bool,
}

impl MockFileSystem {
    fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            renames: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    fn content(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut files = self.files.lock().unwrap();
        let content = files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        files.insert(to.to_path_buf(), content);
        self.renames
            .lock()
            .unwrap()
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }
}

fn service_with(fs: Arc<MockFileSystem>) -> DocumentService {
    testing::init_test_setup();
    DocumentService::new(fs, Arc::new(XmlCodec), Arc::new(Settings::default()))
}

fn valid_tree() -> AttackTree {
    let mut tree = AttackTree::with_meta(Meta {
        title: "Web shop".into(),
        author: "Blue team".into(),
        ..Meta::default()
    });
    let root = tree.add_node(Node::threat("Steal money").as_root()).unwrap();
    let fix = tree.add_node(Node::countermeasure("Fraud checks")).unwrap();
    tree.add_edge(&root, &fix).unwrap();
    tree
}

// ============================================================
// validate / save gates
// ============================================================

#[test]
fn given_valid_tree_when_validating_then_report_is_clean() {
    let service = service_with(Arc::new(MockFileSystem::new()));
    let mut tree = valid_tree();

    let report = service.validate(&mut tree);

    assert!(report.is_saveable());
    assert_eq!(report.cycle, None);
    assert!(report.meta_complete);
    assert!(report.untitled.is_empty());
    assert!(!report.extended);
}

#[test]
fn given_several_problems_when_validating_then_reports_all_and_cycle_comes_first() {
    // Arrange
    let service = service_with(Arc::new(MockFileSystem::new()));
    let mut tree = AttackTree::new();
    let a = tree.add_node(Node::threat("a").as_root()).unwrap();
    let b = tree.add_node(Node::threat("")).unwrap();
    tree.add_edge(&a, &b).unwrap();
    tree.add_edge(&b, &a).unwrap();

    // Act
    let report = service.validate(&mut tree);

    // Assert
    assert!(report.cycle.is_some());
    assert!(!report.meta_complete);
    assert_eq!(report.untitled, vec![b]);
    assert!(matches!(
        report.first_error(),
        Some(DomainError::CycleDetected(_))
    ));
}

#[test]
fn given_missing_author_and_untitled_node_when_saving_then_missing_meta_wins() {
    let fs = Arc::new(MockFileSystem::new());
    let service = service_with(fs.clone());
    let mut tree = valid_tree();
    tree.meta.author.clear();
    tree.add_node(Node::new(NodeKind::Countermeasure)).unwrap();

    let result = service.save(&mut tree, Path::new("/docs/shop.xml"));

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::MissingMeta))
    ));
    assert!(fs.files.lock().unwrap().is_empty());
}

#[test]
fn given_untitled_countermeasure_when_saving_then_empty_title_names_it() {
    let fs = Arc::new(MockFileSystem::new());
    let service = service_with(fs.clone());
    let mut tree = valid_tree();
    let untitled = tree.add_node(Node::new(NodeKind::Countermeasure)).unwrap();

    let result = service.save(&mut tree, Path::new("/docs/shop.xml"));

    match result {
        Err(ApplicationError::Domain(DomainError::EmptyTitle(ids))) => {
            assert_eq!(ids, vec![untitled])
        }
        other => panic!("expected EmptyTitle, got {other:?}"),
    }
    assert_eq!(fs.content("/docs/shop.xml"), None);
}

#[test]
fn given_valid_tree_when_saving_then_writes_staging_file_and_renames() {
    let fs = Arc::new(MockFileSystem::new());
    let service = service_with(fs.clone());
    let mut tree = valid_tree();

    service.save(&mut tree, Path::new("/docs/shop.xml")).unwrap();

    let content = fs.content("/docs/shop.xml").unwrap();
    assert!(content.starts_with("<?xml"));
    assert!(content.contains("<title>Fraud checks</title>"));
    assert_eq!(fs.content("/docs/shop.xml.tmp"), None);
    assert_eq!(
        fs.renames.lock().unwrap().as_slice(),
        &[(
            PathBuf::from("/docs/shop.xml.tmp"),
            PathBuf::from("/docs/shop.xml")
        )]
    );
}

#[test]
fn given_failing_file_system_when_saving_then_operation_failed_and_target_untouched() {
    let fs = Arc::new(MockFileSystem::failing());
    fs.files
        .lock()
        .unwrap()
        .insert(PathBuf::from("/docs/shop.xml"), "previous".to_string());
    let service = service_with(fs.clone());
    let mut tree = valid_tree();

    let result = service.save(&mut tree, Path::new("/docs/shop.xml"));

    match result {
        Err(ApplicationError::OperationFailed { context, .. }) => {
            assert_eq!(context, "write document: /docs/shop.xml")
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
    assert_eq!(fs.content("/docs/shop.xml").as_deref(), Some("previous"));
}

// ============================================================
// load
// ============================================================

#[test]
fn given_missing_file_when_loading_then_operation_failed_with_path() {
    let service = service_with(Arc::new(MockFileSystem::new()));

    let result = service.load(Path::new("/docs/none.xml"));

    let err = result.unwrap_err();
    assert!(err.to_string().contains("read document: /docs/none.xml"));
}

#[test]
fn given_foreign_document_when_loading_then_document_error_names_path() {
    let fs = Arc::new(MockFileSystem::new());
    fs.write(Path::new("/docs/pom.xml"), "<project/>").unwrap();
    let service = service_with(fs);

    let result = service.load(Path::new("/docs/pom.xml"));

    match result {
        Err(ApplicationError::Document { path, source }) => {
            assert_eq!(path, PathBuf::from("/docs/pom.xml"));
            assert!(matches!(source, CodecError::SchemaMismatch(_)));
        }
        other => panic!("expected Document error, got {other:?}"),
    }
}

// ============================================================
// Real file system
// ============================================================

#[test]
fn given_fixture_when_saved_to_new_directory_and_reloaded_then_tree_is_equal() {
    // Arrange
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("nested/dir/copy.xml");
    let container = ServiceContainer::new(Settings::default());
    let service = container.document_service();
    let mut tree = service
        .load(&testing::fixture_path("simple_five.xml"))
        .unwrap();

    // Act
    service.save(&mut tree, &target).unwrap();
    let reloaded = service.load(&target).unwrap();

    // Assert
    assert!(target.is_file());
    assert!(!temp.path().join("nested/dir/copy.xml.tmp").exists());
    assert_eq!(reloaded.len(), tree.len());
    assert_eq!(reloaded.edges(), tree.edges());
    assert_eq!(reloaded.meta, tree.meta);
}

#[test]
fn given_real_file_system_when_ensuring_parent_then_creates_directories() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a/b/c.xml");

    RealFileSystem.ensure_parent(&file).unwrap();
    RealFileSystem.write(&file, "x").unwrap();

    assert!(file.is_file());
    assert_eq!(fs::read_to_string(&file).unwrap(), "x");
}

// ============================================================
// simplify / layout / new
// ============================================================

#[test]
fn given_extended_document_when_simplifying_then_saved_in_simple_schema() {
    let fs = Arc::new(MockFileSystem::new());
    let xml = testing::read_fixture("extended_shared.xml");
    fs.write(Path::new("/docs/shared.xml"), &xml).unwrap();
    let service = service_with(fs.clone());
    let mut tree = service.load(Path::new("/docs/shared.xml")).unwrap();

    let clones = service.simplify(&mut tree).unwrap();
    service.save(&mut tree, Path::new("/docs/simple.xml")).unwrap();

    assert_eq!(clones, 1);
    let content = fs.content("/docs/simple.xml").unwrap();
    assert!(content.contains("<tree>"));
    assert!(!content.contains("<connections>"));
}

#[test]
fn given_loaded_tree_when_laying_out_then_every_node_is_positioned() {
    let service = service_with(Arc::new(MockFileSystem::new()));
    let mut tree = valid_tree();

    let report = service.layout(&mut tree, &NeverAbort).unwrap();

    assert_eq!(report.components, 1);
    assert!(tree.nodes().all(|(_, n)| n.position.is_some()));
}

#[test]
fn given_titles_when_creating_new_document_then_has_dated_meta_and_root() {
    let service = service_with(Arc::new(MockFileSystem::new()));

    let mut tree = service
        .new_document("Office", "IT", "Break in")
        .unwrap();

    assert_eq!(tree.len(), 1);
    assert_eq!(tree.root(), Some(&NodeId::from("N0000")));
    assert_eq!(tree.meta.date.len(), "2024-01-01".len());
    assert!(service.validate(&mut tree).is_saveable());
}
