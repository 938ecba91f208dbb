//! The three UI pages plus their shared stylesheet and script, compiled into
//! the binary.

use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const SCENARIOS_HTML: &str = include_str!("../assets/scenarios.html");
const GALLERY_HTML: &str = include_str!("../assets/gallery.html");
const APP_CSS: &str = include_str!("../assets/app.css");
const APP_JS: &str = include_str!("../assets/app.js");

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn scenarios_page() -> Html<&'static str> {
    Html(SCENARIOS_HTML)
}

pub async fn gallery_page() -> Html<&'static str> {
    Html(GALLERY_HTML)
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], APP_CSS)
}

pub async fn app_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        APP_JS,
    )
}
