//! Classification of a probed candidate
//!
//! The HTTP heuristics here are deliberately coarse: keyword matching over
//! the first few kilobytes of the landing page, not content understanding.

use std::fmt;

/// Phrases that mark a parking page or a placeholder
pub const PARKING_KEYWORDS: &[&str] = &[
    "domain is for sale",
    "this domain may be for sale",
    "buy this domain",
    "domain for sale",
    "parked free",
    "parkingcrew",
    "sedoparking",
    "hugedomains",
    "afternic",
    "coming soon",
    "under construction",
    "future home of",
    "default web page",
];

/// Phrases that suggest an operating commercial product
pub const COMMERCIAL_KEYWORDS: &[&str] = &[
    "add to cart",
    "checkout",
    "pricing",
    "buy now",
    "free trial",
    "subscribe",
    "sign up",
    "shop now",
    "our customers",
];

/// HTTP statuses treated as a redirect away from the domain
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// How a registered domain is being used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsageState {
    /// Nothing answered, or the answer was an error or not a page
    #[default]
    NoWebsite,

    /// Parking page, placeholder, or redirect elsewhere
    ParkedOrPlaceholder,

    /// Serves a non-empty HTML page
    ActiveSite,
}

impl UsageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoWebsite => "no_website",
            Self::ParkedOrPlaceholder => "parked_or_placeholder",
            Self::ActiveSite => "active_site",
        }
    }

    /// Registered but not meaningfully used
    pub fn is_unused(&self) -> bool {
        matches!(self, Self::NoWebsite | Self::ParkedOrPlaceholder)
    }
}

impl fmt::Display for UsageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the site looks like a live commercial product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductState {
    ActiveProduct,
    #[default]
    Unknown,
}

impl ProductState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveProduct => "active_product",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of probing one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Classification {
    pub registered: bool,
    pub has_dns: bool,
    /// Every resolver failed; `registered` is a conservative guess
    pub resolver_error: bool,
    pub usage_state: UsageState,
    pub product_state: ProductState,
}

impl Classification {
    /// A well-formed DNS answer without records
    pub fn unregistered() -> Self {
        Self::default()
    }

    /// No resolver produced a usable answer
    pub fn resolver_failure() -> Self {
        Self {
            resolver_error: true,
            ..Self::default()
        }
    }

    /// A registered domain with the outcome of its HTTP phase
    pub fn registered(usage_state: UsageState, product_state: ProductState) -> Self {
        Self {
            registered: true,
            has_dns: true,
            resolver_error: false,
            usage_state,
            product_state,
        }
    }
}

/// Classifies a landing page response
///
/// Usage precedence: server error, parking keywords, redirect, non-empty
/// HTML, otherwise no website. The product state is decided independently
/// from commercial keywords. `body` must already be lowercased.
pub fn classify_site(status: u16, content_type: &str, body: &str) -> (UsageState, ProductState) {
    let usage = if status >= 500 {
        UsageState::NoWebsite
    } else if contains_any(body, PARKING_KEYWORDS) {
        UsageState::ParkedOrPlaceholder
    } else if REDIRECT_STATUSES.contains(&status) {
        UsageState::ParkedOrPlaceholder
    } else if content_type.to_ascii_lowercase().contains("html") && !body.trim().is_empty() {
        UsageState::ActiveSite
    } else {
        UsageState::NoWebsite
    };

    let product = if contains_any(body, COMMERCIAL_KEYWORDS) {
        ProductState::ActiveProduct
    } else {
        ProductState::Unknown
    };

    (usage, product)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_is_no_website_even_when_parked() {
        let (usage, _) = classify_site(503, "text/html", "this domain is for sale");
        assert_eq!(usage, UsageState::NoWebsite);
    }

    #[test]
    fn test_parking_keywords() {
        let (usage, _) = classify_site(200, "text/html", "<h1>buy this domain</h1>");
        assert_eq!(usage, UsageState::ParkedOrPlaceholder);
    }

    #[test]
    fn test_redirect_is_parked_regardless_of_body() {
        for status in REDIRECT_STATUSES {
            let (usage, _) = classify_site(status, "text/html", "<html>real content</html>");
            assert_eq!(usage, UsageState::ParkedOrPlaceholder);
            let (usage, _) = classify_site(status, "", "");
            assert_eq!(usage, UsageState::ParkedOrPlaceholder);
        }
    }

    #[test]
    fn test_active_site_needs_html_and_body() {
        let (usage, _) = classify_site(200, "text/html; charset=utf-8", "<html>hi</html>");
        assert_eq!(usage, UsageState::ActiveSite);

        let (usage, _) = classify_site(200, "TEXT/HTML", "<p>x</p>");
        assert_eq!(usage, UsageState::ActiveSite);

        let (usage, _) = classify_site(200, "text/html", "   \n ");
        assert_eq!(usage, UsageState::NoWebsite);

        let (usage, _) = classify_site(200, "application/json", "{\"ok\":true}");
        assert_eq!(usage, UsageState::NoWebsite);
    }

    #[test]
    fn test_client_error_with_html_counts_as_active() {
        let (usage, _) = classify_site(404, "text/html", "<html>not found</html>");
        assert_eq!(usage, UsageState::ActiveSite);
    }

    #[test]
    fn test_product_state_is_independent() {
        let (usage, product) = classify_site(200, "text/html", "<a>add to cart</a>");
        assert_eq!(usage, UsageState::ActiveSite);
        assert_eq!(product, ProductState::ActiveProduct);

        let (usage, product) = classify_site(301, "", "see our pricing");
        assert_eq!(usage, UsageState::ParkedOrPlaceholder);
        assert_eq!(product, ProductState::ActiveProduct);

        let (_, product) = classify_site(200, "text/html", "<p>hello</p>");
        assert_eq!(product, ProductState::Unknown);
    }

    #[test]
    fn test_constructors() {
        let c = Classification::unregistered();
        assert!(!c.registered && !c.has_dns && !c.resolver_error);
        assert_eq!(c.usage_state, UsageState::NoWebsite);
        assert_eq!(c.product_state, ProductState::Unknown);

        let c = Classification::resolver_failure();
        assert!(!c.registered && c.resolver_error);

        let c = Classification::registered(UsageState::ActiveSite, ProductState::Unknown);
        assert!(c.registered && c.has_dns);
    }

    #[test]
    fn test_unused_states() {
        assert!(UsageState::NoWebsite.is_unused());
        assert!(UsageState::ParkedOrPlaceholder.is_unused());
        assert!(!UsageState::ActiveSite.is_unused());
    }
}
