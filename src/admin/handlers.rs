use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Serialize;
use std::fmt::Write;

use crate::admin::AdminState;
use crate::ratelimit::LimiterOccupancy;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_limiters(State(state): State<AdminState>) -> Json<Vec<LimiterOccupancy>> {
    Json(state.registry.occupancy())
}

/// Plain-text dump of one named limiter.
pub async fn ratelimit_dump(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<String, StatusCode> {
    state
        .registry
        .get(&name)
        .map(|l| l.debug_text())
        .ok_or(StatusCode::NOT_FOUND)
}

/// HTML page with every named limiter's state.
pub async fn ratelimit_page(State(state): State<AdminState>) -> Html<String> {
    let mut page = String::from(
        r#"<!DOCTYPE html>
<html>

<head>
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ratelimit</title>
<style type="text/css">
  body {
    font-family: sans-serif;
  }
  @media (prefers-color-scheme: dark) {
    body {
      background: #121212;
      color: #c9d1d9;
    }
    a { color: #44b4ec; }
  }
  table {
    text-align: right;
  }
  th {
    text-align: center;
  }
  td, th {
    padding: 0.15em 0.5em;
  }
  td.ip {
    min-width: 10em;
    text-align: left;
    font-family: monospace;
  }
</style>
</head>

<body>
"#,
    );

    for (name, limiter) in state.registry.iter() {
        let _ = write!(page, "<h1>{}</h1>\n\n{}\n\n", name, limiter.debug_html());
    }

    page.push_str("</body>\n</html>\n");
    Html(page)
}
