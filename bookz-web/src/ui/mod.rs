//! Server-rendered HTML pages
//!
//! Forms post back to the server, which redirects to a page with an
//! optional `?msg=` or `?err=` flash message (Post/Redirect/Get).

use axum::response::{Html, Redirect};
use bookz_common::db::models::User;
use serde::Deserialize;

pub mod auth;
pub mod books;
pub mod chart;
pub mod reviews;

/// Flash message carried in the query string
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    pub msg: Option<String>,
    pub err: Option<String>,
}

/// Redirect to `path` with one percent-encoded query parameter
pub fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    let mut url = match reqwest::Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return Redirect::to(path),
    };
    url.query_pairs_mut().append_pair(key, message);

    match url.query() {
        Some(query) => Redirect::to(&format!("{}?{}", path, query)),
        None => Redirect::to(path),
    }
}

/// Escape text for use in HTML content and attribute values
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const STYLE: &str = r#"
    * { box-sizing: border-box; }
    body {
        font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
        background-color: #1a1a1a;
        color: #e0e0e0;
        line-height: 1.5;
        margin: 0;
    }
    header {
        background-color: #2a2a2a;
        border-bottom: 1px solid #3a3a3a;
        padding: 16px 24px;
        display: flex;
        justify-content: space-between;
        align-items: center;
    }
    header h1 { margin: 0; font-size: 24px; color: #4a9eff; }
    header nav a, header nav button {
        color: #e0e0e0; margin-left: 16px; text-decoration: none;
        background: none; border: none; font: inherit; cursor: pointer;
    }
    main { padding: 24px; max-width: 1100px; }
    section { background: #242424; border: 1px solid #3a3a3a; border-radius: 6px; padding: 16px; margin-bottom: 24px; }
    h2 { margin-top: 0; font-size: 18px; }
    label { display: block; margin: 8px 0 4px; color: #aaa; font-size: 14px; }
    input, select, textarea {
        background: #1a1a1a; color: #e0e0e0; border: 1px solid #3a3a3a;
        border-radius: 4px; padding: 6px 8px; font: inherit;
    }
    button { background: #4a9eff; color: #fff; border: none; border-radius: 4px; padding: 6px 14px; cursor: pointer; }
    button.danger { background: #b94a48; }
    table { width: 100%; border-collapse: collapse; }
    th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #333; }
    .flash { padding: 10px 14px; border-radius: 4px; margin-bottom: 16px; }
    .flash.msg { background: #1e3a24; color: #8fd19e; }
    .flash.err { background: #3a1e1e; color: #f19a9a; }
    .build-info { color: #666; font-size: 12px; font-family: 'Courier New', monospace; }
    .row { display: flex; gap: 16px; flex-wrap: wrap; align-items: flex-end; }
    form.dates { display: flex; gap: 6px; align-items: center; }
"#;

/// Wrap page content in the common layout
pub fn layout(title: &str, user: Option<&User>, flash: &Flash, content: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<nav>
                <a href="/">Books</a>
                <a href="/reviews">Reviews</a>
                <form method="post" action="/logout" style="display:inline">
                    <button type="submit">Log out {}</button>
                </form>
            </nav>"#,
            html_escape(&user.username)
        ),
        None => r#"<nav><a href="/login">Log in</a><a href="/register">Register</a></nav>"#.to_string(),
    };

    let mut messages = String::new();
    if let Some(msg) = &flash.msg {
        messages.push_str(&format!(r#"<div class="flash msg">{}</div>"#, html_escape(msg)));
    }
    if let Some(err) = &flash.err {
        messages.push_str(&format!(r#"<div class="flash err">{}</div>"#, html_escape(err)));
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - bookz</title>
    <style>{style}</style>
</head>
<body>
    <header>
        <div>
            <h1>bookz</h1>
            <div class="build-info">v{version} [{git_hash}]</div>
        </div>
        {nav}
    </header>
    <main>
        {messages}
        {content}
    </main>
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        nav = nav,
        messages = messages,
        content = content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        let response = redirect_with("/login", "err", "Invalid username & password").into_response();
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/login?err=Invalid+username+%26+password");
    }

    #[test]
    fn test_layout_escapes_flash() {
        let flash = Flash {
            msg: None,
            err: Some("<script>".to_string()),
        };
        let Html(page) = layout("Books", None, &flash, "<p>body</p>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("<p>body</p>"));
    }
}
