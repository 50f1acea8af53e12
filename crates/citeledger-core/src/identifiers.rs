//! Identifier URL templates and extraction
//!
//! Canonical URLs are derived from identifiers, never the other way round,
//! except when reading BibTeX written by other tools.

use lazy_static::lazy_static;
use regex::Regex;

pub const ADS_ABS_PREFIX: &str = "https://ui.adsabs.harvard.edu/abs/";
pub const DOI_RESOLVER_PREFIX: &str = "https://doi.org/";

lazy_static! {
    // Bare DOI, a `doi:` prefix, or a resolver URL
    static ref DOI_REGEX: Regex = Regex::new(
        r#"(?i)^\s*(?:doi:\s*)?(?:https?://(?:dx\.)?doi\.org/)?(?P<doi>10\.\d{4,}/\S+?)\s*$"#
    ).unwrap();

    // Any ADS host; the bibcode is the first path segment after /abs/
    static ref ADS_ABS_REGEX: Regex = Regex::new(
        r"(?i)^https?://[^/]*adsabs\.harvard\.edu/(?:#)?abs/(?P<bibcode>[^/?#\s]+)"
    ).unwrap();
}

/// `https://ui.adsabs.harvard.edu/abs/{bibcode}`
pub fn ads_abs_url(bibcode: &str) -> String {
    format!("{}{}", ADS_ABS_PREFIX, bibcode)
}

/// `https://doi.org/{doi}`
pub fn doi_url(doi: &str) -> String {
    format!("{}{}", DOI_RESOLVER_PREFIX, doi)
}

/// Reduce a DOI in any common spelling to its bare `10.xxxx/...` form
pub fn clean_doi(raw: &str) -> Option<String> {
    let caps = DOI_REGEX.captures(raw)?;
    let mut doi = caps.name("doi")?.as_str().to_string();
    while doi.ends_with(['.', ',', ';']) {
        doi.pop();
    }
    Some(doi)
}

/// Recover a bibcode from an ADS abstract URL (percent-encoded or not)
pub fn bibcode_from_ads_url(url: &str) -> Option<String> {
    let caps = ADS_ABS_REGEX.captures(url.trim())?;
    let raw = caps.name("bibcode")?.as_str();
    let decoded = urlencoding::decode(raw).ok()?;
    Some(decoded.into_owned())
}

/// Treat blank strings as absent
pub fn populated(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10.1051/0004-6361/201322068", "10.1051/0004-6361/201322068")]
    #[case("doi:10.1086/155215", "10.1086/155215")]
    #[case("https://doi.org/10.1086/155215", "10.1086/155215")]
    #[case("http://dx.doi.org/10.1086/155215.", "10.1086/155215")]
    fn test_clean_doi(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_doi(raw).as_deref(), Some(expected));
    }

    #[test]
    fn test_clean_doi_rejects_non_doi() {
        assert_eq!(clean_doi("not a doi"), None);
    }

    #[rstest]
    #[case("https://ui.adsabs.harvard.edu/abs/1977A&A....54..661T")]
    #[case("https://ui.adsabs.harvard.edu/abs/1977A%26A....54..661T/abstract")]
    #[case("http://adsabs.harvard.edu/abs/1977A&A....54..661T")]
    fn test_bibcode_from_ads_url(#[case] url: &str) {
        assert_eq!(
            bibcode_from_ads_url(url).as_deref(),
            Some("1977A&A....54..661T")
        );
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            ads_abs_url("1977A&A....54..661T"),
            "https://ui.adsabs.harvard.edu/abs/1977A&A....54..661T"
        );
        assert_eq!(doi_url("10.1086/155215"), "https://doi.org/10.1086/155215");
    }

    #[test]
    fn test_populated() {
        assert_eq!(populated(&Some("  ".to_string())), None);
        assert_eq!(populated(&Some(" x ".to_string())), Some("x"));
        assert_eq!(populated(&None), None);
    }
}
