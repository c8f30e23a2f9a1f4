//! API v1 routes.

mod claims;
mod reference;
mod template;
mod uid;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::model::{Page, ReferenceKind, Window};
use crate::state::{AppState, MAX_PAGE_SIZE};

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    let mut router = Router::new().nest("/uid", uid::routes());

    for kind in ReferenceKind::ALL {
        router = router.nest(&format!("/{}", kind.path()), reference::routes(kind));
    }

    router
        // Claims are nested under tenants: /v1/tenant/{id}/claim
        .nest("/tenant/{id}/claim", claims::routes())
        .nest("/template", template::routes())
}

/// Paging parameters, SCIM style.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based index of the first result.
    pub start_index: Option<u64>,
    pub count: Option<u64>,
}

impl PageQuery {
    fn window(&self, state: &AppState) -> Window {
        Window {
            start_index: self.start_index.unwrap_or(1).max(1),
            count: self.count.unwrap_or(state.page_size()).min(MAX_PAGE_SIZE),
        }
    }
}

/// Response for a listing.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,

    /// Matches across all pages.
    pub total: u64,

    pub start_index: u64,

    /// Number of items in this page.
    pub count: usize,
}

impl<T> ListResponse<T> {
    fn from_page<U>(page: Page<U>, map: impl FnMut(U) -> T) -> Self {
        let items: Vec<T> = page.items.into_iter().map(map).collect();
        Self {
            count: items.len(),
            items,
            total: page.total,
            start_index: page.start_index,
        }
    }
}
