//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::DocumentService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, TreeCodec};
use crate::infrastructure::xml::XmlCodec;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Document format
    pub codec: Arc<dyn TreeCodec>,

    document: DocumentService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(XmlCodec))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        codec: Arc<dyn TreeCodec>,
    ) -> Self {
        let settings = Arc::new(settings);
        let document = DocumentService::new(fs.clone(), codec.clone(), settings.clone());

        Self {
            settings,
            fs,
            codec,
            document,
        }
    }

    pub fn document_service(&self) -> &DocumentService {
        &self.document
    }
}
