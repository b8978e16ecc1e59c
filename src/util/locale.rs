//! Locale-prefixed route helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages live under `/{locale}/...`. The HTTP client derives its
//! `Accept-Language` header from the current path, and the refresh-failure
//! redirect and route guards build locale-aware login URLs from it.

#[cfg(test)]
#[path = "locale_test.rs"]
mod locale_test;

pub const SUPPORTED_LOCALES: &[&str] = &["en", "fr", "es", "de", "ar"];
pub const DEFAULT_LOCALE: &str = "en";

const LOGIN_PAGE: &str = "/login";
const DASHBOARD_PAGE: &str = "/dashboard";

/// Locale encoded in the first path segment, or the default locale.
#[must_use]
pub fn locale_from_path(location: &str) -> &'static str {
    let path = strip_query(location);
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(first))
        .unwrap_or(DEFAULT_LOCALE)
}

/// Path with any leading locale segment and query string removed.
#[must_use]
pub fn page_path(location: &str) -> &str {
    let path = strip_query(location);
    let trimmed = path.trim_start_matches('/');
    let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    if SUPPORTED_LOCALES.iter().any(|l| l.eq_ignore_ascii_case(first)) {
        // Keep the leading slash of the remainder.
        let offset = path.len() - rest.len();
        if rest.is_empty() { "/" } else { &path[offset - 1..] }
    } else {
        path
    }
}

#[must_use]
pub fn is_login_path(location: &str) -> bool {
    let page = page_path(location);
    page == LOGIN_PAGE || page.starts_with("/login/")
}

/// Login page for the locale of `location`, carrying `redirect=<location>`.
#[must_use]
pub fn login_redirect(location: &str) -> String {
    let login = format!("/{}{LOGIN_PAGE}", locale_from_path(location));
    match reqwest::Url::parse_with_params(&format!("http://localhost{login}"), &[("redirect", location)]) {
        Ok(url) => match url.query() {
            Some(query) => format!("{login}?{query}"),
            None => login,
        },
        Err(_) => login,
    }
}

/// Default landing page after login for the locale of `location`.
#[must_use]
pub fn dashboard_path(location: &str) -> String {
    format!("/{}{DASHBOARD_PAGE}", locale_from_path(location))
}

fn strip_query(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or_default()
}
