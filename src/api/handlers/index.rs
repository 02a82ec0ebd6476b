use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../../static/index.html");

/// Drag-and-drop upload page that posts to `/api/image`.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
