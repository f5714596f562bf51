use std::sync::OnceLock;

use regex::Regex;

static CHECKOUT_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();

fn checkout_token_pattern() -> Option<&'static Regex> {
    CHECKOUT_TOKEN.get_or_init(|| Regex::new(r"/checkouts/cn/([^/?#]+)/processing").ok()).as_ref()
}

/// Extracts the checkout token from a marketplace cancel URL, e.g.
/// `https://shop.example/checkouts/cn/Z2NwLWV1/processing` yields `Z2NwLWV1`.
pub fn extract_checkout_token(cancel_url: &str) -> Option<String> {
    checkout_token_pattern()?.captures(cancel_url).and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}
