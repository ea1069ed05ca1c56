//! HTML pages for every unsubscribe outcome.
//!
//! Rendering is pure: an `Outcome` plus link settings in, a `Page` out.
//! All interpolated values are escaped.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::config::PageConfig;
use crate::token::TokenError;
use crate::workflow::Outcome;

const ICON_WARNING: &str = "&#9888;";
const ICON_CHECK: &str = "&#10003;";

const COLOR_WARNING: &str = "#f39c12";
const COLOR_OK: &str = "#27ae60";
const COLOR_ERROR: &str = "#e74c3c";

const STYLE: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; background-color: #1a1a1a; margin: 0; padding: 20px; }
    .container { max-width: 600px; margin: 50px auto; background: #2c2c2c; padding: 40px; border-radius: 8px; box-shadow: 0 4px 16px rgba(0,0,0,0.3); text-align: center; }
    .icon { font-size: 64px; margin-bottom: 20px; }
    h1 { color: #ffffff; font-size: 28px; margin-bottom: 16px; }
    p { color: #b8b8b8; font-size: 16px; line-height: 1.6; margin-bottom: 12px; }
    .email { color: #CE9EFF; font-weight: 600; }
    .note { margin-top: 30px; font-size: 14px; }
    .button-container { margin-top: 30px; display: flex; gap: 16px; justify-content: center; flex-wrap: wrap; }
    .btn { padding: 14px 32px; font-size: 16px; font-weight: 600; border-radius: 6px; text-decoration: none; display: inline-block; }
    .btn-yes { background-color: #e74c3c; color: #ffffff; }
    .btn-no, .btn-link { background-color: #CE9EFF; color: #1a1a1a; }
    .contact-link { display: inline-block; margin-top: 20px; color: #CE9EFF; text-decoration: none; font-weight: 600; }
"#;

/// A rendered response page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: StatusCode,
    pub title: String,
    pub html: String,
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.html)).into_response()
    }
}

/// Render the page for a workflow outcome.
pub fn render(outcome: &Outcome, links: &PageConfig) -> Page {
    let status = outcome.status();
    match outcome {
        Outcome::NoToken => error_page(status, "Invalid Request", "No unsubscribe token provided.", links),
        Outcome::Invalid(err) => error_page(status, "Invalid Token", &invalid_reason(err), links),
        Outcome::Expired => error_page(status, "Invalid Token", "Token expired", links),
        Outcome::UserNotFound => error_page(status, "User Not Found", "We could not find your account.", links),
        Outcome::AwaitingConfirmation { email, token } => confirmation_page(email, token),
        Outcome::Declined { email } => stay_subscribed_page(email),
        Outcome::Confirmed { email } => success_page(email, false, links),
        Outcome::AlreadyUnsubscribed { email } => success_page(email, true, links),
    }
}

/// Generic page for storage failures.
pub fn server_error(links: &PageConfig) -> Page {
    error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Server Error",
        "An error occurred while processing your request. Please try again later.",
        links,
    )
}

/// Page returned by the rate limiter.
pub fn too_many_requests() -> Page {
    let body = "<h1>Too Many Requests</h1>\n<p>Please wait a moment before trying again.</p>".to_string();
    layout(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", ICON_WARNING, COLOR_ERROR, &body)
}

fn invalid_reason(err: &TokenError) -> String {
    match err {
        TokenError::Malformed | TokenError::BadSignature | TokenError::Expired => err.to_string(),
        _ => "The unsubscribe link is invalid or has expired.".to_string(),
    }
}

fn confirmation_page(email: &str, token: &str) -> Page {
    let token = urlencoding::encode(token);
    let body = format!(
        r#"<h1>Are you sure you want to unsubscribe?</h1>
<p>Email address: <span class="email">{email}</span></p>
<p>If you unsubscribe, you will no longer receive marketing emails from us.</p>
<p>You can always resubscribe later if you change your mind.</p>
<div class="button-container">
  <a href="/unsubscribe?token={token}&amp;confirm=yes" class="btn btn-yes">Yes, Unsubscribe</a>
  <a href="/unsubscribe?token={token}&amp;confirm=no" class="btn btn-no">No, Stay Subscribed</a>
</div>"#,
        email = escape_html(email),
        token = escape_html(&token),
    );
    layout(StatusCode::OK, "Confirm Unsubscribe", ICON_WARNING, COLOR_WARNING, &body)
}

fn stay_subscribed_page(email: &str) -> Page {
    let body = format!(
        r#"<h1>Great! You're Still Subscribed</h1>
<p>The email address <span class="email">{}</span> will continue to receive our newsletters.</p>
<p>Thank you for staying with us!</p>
<p class="note">You can unsubscribe at any time by clicking the unsubscribe link in any of our emails.</p>"#,
        escape_html(email)
    );
    layout(StatusCode::OK, "Still Subscribed", ICON_CHECK, COLOR_OK, &body)
}

fn success_page(email: &str, already: bool, links: &PageConfig) -> Page {
    let (heading, adverb) = if already {
        ("Already Unsubscribed", "already")
    } else {
        ("Successfully Unsubscribed", "successfully")
    };
    let no_more = if already {
        ""
    } else {
        "<p>You will no longer receive marketing emails from us.</p>\n"
    };
    let body = format!(
        r#"<h1>{heading}</h1>
<p>The email address <span class="email">{email}</span> has been {adverb} removed from our mailing list.</p>
{no_more}<p>If you change your mind, you can always resubscribe.</p>
<a href="{resubscribe}" class="btn btn-link">Resubscribe</a>
<p class="note">Note: It may take up to 48 hours for this change to take effect.</p>"#,
        email = escape_html(email),
        resubscribe = escape_html(&links.resubscribe_url),
    );
    layout(StatusCode::OK, heading, ICON_CHECK, COLOR_OK, &body)
}

fn error_page(status: StatusCode, title: &str, message: &str, links: &PageConfig) -> Page {
    let body = format!(
        r#"<h1>{title}</h1>
<p>{message}</p>
<a href="mailto:{support}" class="contact-link">Contact Support</a>"#,
        title = escape_html(title),
        message = escape_html(message),
        support = escape_html(&links.support_email),
    );
    layout(status, title, ICON_WARNING, COLOR_ERROR, &body)
}

fn layout(status: StatusCode, title: &str, icon: &str, icon_color: &str, body: &str) -> Page {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<div class="icon" style="color: {icon_color};">{icon}</div>
{body}
</div>
</body>
</html>
"#,
        title = escape_html(title),
    );
    Page {
        status,
        title: title.to_string(),
        html,
    }
}

fn escape_html(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> PageConfig {
        PageConfig::default()
    }

    #[test]
    fn test_every_outcome_renders() {
        let outcomes = [
            Outcome::NoToken,
            Outcome::Invalid(TokenError::Malformed),
            Outcome::Invalid(TokenError::BadSignature),
            Outcome::Expired,
            Outcome::UserNotFound,
            Outcome::AlreadyUnsubscribed { email: "a@b.c".into() },
            Outcome::AwaitingConfirmation { email: "a@b.c".into(), token: "tok".into() },
            Outcome::Declined { email: "a@b.c".into() },
            Outcome::Confirmed { email: "a@b.c".into() },
        ];
        for outcome in outcomes {
            let page = render(&outcome, &links());
            assert_eq!(page.status, outcome.status());
            assert!(page.html.starts_with("<!DOCTYPE html>"));
            assert!(page.html.contains(&format!("<title>{}</title>", page.title)));
        }
    }

    #[test]
    fn test_confirmation_links_carry_token() {
        let page = render(
            &Outcome::AwaitingConfirmation { email: "test@example.com".into(), token: "abc_-123".into() },
            &links(),
        );
        assert!(page.html.contains("Are you sure you want to unsubscribe?"));
        assert!(page.html.contains("/unsubscribe?token=abc_-123&amp;confirm=yes"));
        assert!(page.html.contains("/unsubscribe?token=abc_-123&amp;confirm=no"));
    }

    #[test]
    fn test_success_variants() {
        let done = render(&Outcome::Confirmed { email: "a@b.c".into() }, &links());
        assert!(done.html.contains("Successfully Unsubscribed"));
        assert!(done.html.contains("You will no longer receive marketing emails"));
        assert!(done.html.contains("https://example.com/resubscribe"));

        let again = render(&Outcome::AlreadyUnsubscribed { email: "a@b.c".into() }, &links());
        assert!(again.html.contains("Already Unsubscribed"));
        assert!(!again.html.contains("You will no longer receive marketing emails"));
    }

    #[test]
    fn test_declined_page() {
        let page = render(&Outcome::Declined { email: "a@b.c".into() }, &links());
        assert!(page.html.contains("You're Still Subscribed"));
    }

    #[test]
    fn test_error_messages() {
        assert!(render(&Outcome::Expired, &links()).html.contains("Token expired"));
        assert!(render(&Outcome::Invalid(TokenError::BadSignature), &links())
            .html
            .contains("Invalid signature"));
        assert!(render(&Outcome::NoToken, &links()).html.contains("No unsubscribe token provided."));

        let error = server_error(&links());
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.html.contains("mailto:support@example.com"));

        assert_eq!(too_many_requests().status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_values_are_escaped() {
        let page = render(&Outcome::Declined { email: "<script>x</script>@b.c".into() }, &links());
        assert!(!page.html.contains("<script>"));
        assert!(page.html.contains("&lt;script&gt;"));
    }
}
