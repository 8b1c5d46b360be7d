//! Login and registration pages

use axum::extract::Query;
use axum::response::Html;

use super::{layout, Flash};

fn credentials_form(action: &str, button: &str) -> String {
    format!(
        r#"<section>
            <form method="post" action="{action}">
                <label for="username">Username</label>
                <input id="username" name="username" autocomplete="username" required>
                <label for="password">Password</label>
                <input id="password" name="password" type="password" required>
                <p><button type="submit">{button}</button></p>
            </form>
        </section>"#,
        action = action,
        button = button,
    )
}

/// GET /login
pub async fn login_page(Query(flash): Query<Flash>) -> Html<String> {
    let content = format!(
        r#"<h2>Log in</h2>{}<p>No account yet? <a href="/register">Register</a></p>"#,
        credentials_form("/login", "Log in")
    );
    layout("Log in", None, &flash, &content)
}

/// GET /register
pub async fn register_page(Query(flash): Query<Flash>) -> Html<String> {
    let content = format!(
        r#"<h2>Create an account</h2>{}<p>Passwords need at least 8 characters.</p>"#,
        credentials_form("/register", "Register")
    );
    layout("Register", None, &flash, &content)
}
