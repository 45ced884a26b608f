use axum::response::Html;

use crate::services::chart::render_index_page;

/// Handler for GET /
pub async fn index_page() -> Html<String> {
    Html(render_index_page())
}
