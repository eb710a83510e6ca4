//! Built-in error pages.

use maud::{html, Markup, DOCTYPE};

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body { (body) }
        }
    }
}

/// 404 page naming the requested path, with a link back home.
pub fn not_found(path: &str, context_path: &str) -> String {
    layout(
        "404 - Not Found",
        html! {
            h1 { "404" }
            p { "The requested URL was not found." }
            pre { (path) }
            p { a href={ (context_path) "/" } { "Back to home" } }
        },
    )
    .into_string()
}

/// 405 page listing the accepted methods.
pub fn method_not_allowed(path: &str, method: &str, allowed: &[&str]) -> String {
    layout(
        "405 - Method Not Allowed",
        html! {
            h1 { "405" }
            p { "Method " code { (method) } " is not allowed for " code { (path) } "." }
            p { "Accepted: " (allowed.join(", ")) }
        },
    )
    .into_string()
}

/// 500 page with the failure message.
pub fn internal_error(path: &str, message: &str) -> String {
    layout(
        "500 - Internal Server Error",
        html! {
            h1 { "500 - Internal Server Error" }
            p { "An error occurred while processing the request." }
            pre { "URL: " (path) }
            pre { "Error: " (message) }
        },
    )
    .into_string()
}

/// 400 page for requests missing required data.
pub fn bad_request(path: &str, message: &str) -> String {
    layout(
        "400 - Bad Request",
        html! {
            h1 { "400 - Bad Request" }
            pre { "URL: " (path) }
            pre { "Error: " (message) }
        },
    )
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_escape_input() {
        let page = not_found("/<script>", "/app");
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains(r#"href="/app/""#));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let page = method_not_allowed("/submit", "GET", &["POST"]);
        assert!(page.contains("POST"));
        assert!(page.contains("<code>GET</code>"));
    }

    #[test]
    fn test_internal_error_includes_message() {
        let page = internal_error("/x", "missing required parameter 'id'");
        assert!(page.contains("missing required parameter &#39;id&#39;") || page.contains("missing required parameter 'id'"));
    }
}
