//! Recipient syntax validation and HTML to plain-text conversion

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DeliveryError;

// Single shared pattern: local part, "@", domain, ".", tld, no whitespace.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br pattern"));
static PARAGRAPH_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p>").expect("p pattern"));
static DIV_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</div>").expect("div pattern"));
static HEADING_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</h[1-6]>").expect("heading pattern"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").expect("newline pattern"));

/// Validates recipient address syntax before any network call is made.
pub fn validate_email(address: &str) -> Result<(), DeliveryError> {
    if EMAIL_PATTERN.is_match(address) {
        Ok(())
    } else {
        Err(DeliveryError::Validation(format!(
            "invalid recipient address: {address}"
        )))
    }
}

/// Derives a deterministic plain-text body from HTML content.
///
/// `<br>` becomes a newline, closing paragraphs and headings a blank line,
/// closing divs a newline; remaining tags are stripped, the common named
/// entities decoded, and runs of three or more newlines collapsed to two.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = BR_TAG.replace_all(html, "\n");
    let text = PARAGRAPH_CLOSE.replace_all(&text, "\n\n");
    let text = DIV_CLOSE.replace_all(&text, "\n");
    let text = HEADING_CLOSE.replace_all(&text, "\n\n");
    let mut text = ANY_TAG.replace_all(&text, "").into_owned();

    for (entity, replacement) in [
        ("&nbsp;", " "),
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
    ] {
        text = text.replace(entity, replacement);
    }

    while EXCESS_NEWLINES.is_match(&text) {
        text = EXCESS_NEWLINES.replace_all(&text, "\n\n").into_owned();
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for address in [
            "test@example.com",
            "user.name+tag@domain.co.uk",
            "x@example.com",
        ] {
            assert!(validate_email(address).is_ok(), "{address} should be valid");
        }
    }

    #[test]
    fn test_invalid_addresses() {
        for address in ["", "invalid-email", "@domain.com", "user@", "user@domain"] {
            assert!(
                validate_email(address).is_err(),
                "{address} should be invalid"
            );
        }
    }

    #[test]
    fn test_invalid_address_is_a_validation_error() {
        assert!(matches!(
            validate_email("not-an-address"),
            Err(DeliveryError::Validation(_))
        ));
    }

    #[test]
    fn test_whitespace_in_address_rejected() {
        assert!(validate_email("user name@example.com").is_err());
        assert!(validate_email("user@exam ple.com").is_err());
    }

    #[test]
    fn test_paragraphs_become_blank_lines() {
        assert_eq!(html_to_text("<p>A</p><p>B</p>"), "A\n\nB");
    }

    #[test]
    fn test_no_residual_markup() {
        let text = html_to_text("<div class=\"wrap\"><p>A</p><h2>B</h2><span>C</span></div>");
        assert!(!text.contains('<'));
        assert!(!text.contains('>'));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_br_variants() {
        assert_eq!(html_to_text("one<br>two<br/>three<BR />four"), "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            html_to_text("Tom&nbsp;&amp;&nbsp;Jerry &lt;duo&gt; &quot;stars&quot; &#39;live&#39;"),
            "Tom & Jerry <duo> \"stars\" 'live'"
        );
    }

    #[test]
    fn test_newline_runs_collapse_to_two() {
        let text = html_to_text("<p>A</p><br><br><br><p>B</p>");
        assert!(!text.contains("\n\n\n"));
        assert_eq!(text, "A\n\nB");
    }

    #[test]
    fn test_headings_and_divs() {
        assert_eq!(html_to_text("<h1>Title</h1><div>Body</div>"), "Title\n\nBody");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(html_to_text("already plain"), "already plain");
    }
}
