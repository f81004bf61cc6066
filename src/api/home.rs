// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GET / - upload form for manual testing

use axum::response::Html;

const HOME_PAGE: &str = r#"<h2>NSFW Detector API</h2>
<p>Upload an image to detect NSFW content</p>
<form action="/detect" method="post" enctype="multipart/form-data">
    <input type="file" name="image" accept="image/*" required>
    <button type="submit">Detect NSFW</button>
</form>
<p>Or use POST /detect with 'image' file in form-data</p>
"#;

pub async fn home_handler() -> Html<&'static str> {
    Html(HOME_PAGE)
}
