//! Application state shared across request handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use uid_template::Configuration;

use crate::generator::ExternalIdGenerator;
use crate::store::Store;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Upper bound on any requested page size.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Tunables that are not collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    pub page_size: u64,
    /// Request-template descriptor served under `/v1/template`.
    pub templates: Option<Arc<Configuration>>,
    /// Accept role lists carried in Bearer tokens.
    pub dev_mode: bool,
    /// Principals holding the `administrator` role.
    pub administrators: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            templates: None,
            dev_mode: false,
            administrators: BTreeSet::new(),
        }
    }
}

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    generator: Arc<dyn ExternalIdGenerator>,
    settings: Settings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn ExternalIdGenerator>) -> Self {
        Self::with_settings(store, generator, Settings::default())
    }

    pub fn with_settings(
        store: Arc<dyn Store>,
        generator: Arc<dyn ExternalIdGenerator>,
        settings: Settings,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                generator,
                settings,
            }),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn generator(&self) -> &dyn ExternalIdGenerator {
        self.inner.generator.as_ref()
    }

    /// Page size used when a listing does not ask for one.
    pub fn page_size(&self) -> u64 {
        self.inner.settings.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn templates(&self) -> Option<&Configuration> {
        self.inner.settings.templates.as_deref()
    }

    pub fn dev_mode(&self) -> bool {
        self.inner.settings.dev_mode
    }

    pub fn is_administrator(&self, principal: &str) -> bool {
        self.inner.settings.administrators.contains(principal)
    }
}
