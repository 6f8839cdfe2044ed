//! Payload sanitization and exhaustive validation.
//!
//! Validators collect every violated rule instead of stopping at the first,
//! so a client can fix a payload in one round trip.

use std::sync::OnceLock;

use regex::Regex;

use crate::limits::Limits;
use crate::models::{ArticleDraft, Identity};

/// Maximum length, in characters, of any sanitized text field.
pub const MAX_SANITIZED_LEN: usize = 10_000;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://.+").expect("static regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

/// Trim, drop `<`/`>` and cap at [`MAX_SANITIZED_LEN`] characters.
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_SANITIZED_LEN)
        .collect()
}

/// Sanitize the plain-text fields of a draft. Content is HTML and is kept as-is.
pub fn sanitize_draft(draft: ArticleDraft) -> ArticleDraft {
    ArticleDraft {
        title: sanitize_input(&draft.title),
        url: sanitize_input(&draft.url),
        website: sanitize_input(&draft.website),
        summary: draft.summary.as_deref().map(sanitize_input),
        byline: draft.byline.as_deref().map(sanitize_input),
        ..draft
    }
}

/// Check an article draft against `limits`. Returns every violation.
pub fn validate_article(draft: &ArticleDraft, limits: &Limits) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if draft.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if draft.title.chars().count() > limits.max_title_length {
        errors.push(format!(
            "Title too long (max {} characters)",
            limits.max_title_length
        ));
    }
    if !url_re().is_match(&draft.url) {
        errors.push("Valid URL is required".to_string());
    }
    if draft.content.trim().chars().count() < limits.min_content_length {
        errors.push(format!(
            "Article content is required (minimum {} characters)",
            limits.min_content_length
        ));
    }
    if draft.content.chars().count() > limits.max_article_size {
        errors.push("Article content too large".to_string());
    }
    if draft.website.trim().is_empty() {
        errors.push("Website name is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a verified identity tuple before it becomes a user record.
pub fn validate_identity(identity: &Identity) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if !email_re().is_match(&identity.email) {
        errors.push("Valid email is required".to_string());
    }
    if identity.name.trim().is_empty() {
        errors.push("Name is required".to_string());
    }
    if identity.external_id.trim().is_empty() {
        errors.push("External ID is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> ArticleDraft {
        ArticleDraft {
            title: "Rust ownership explained".into(),
            url: "https://blog.example/ownership".into(),
            website: "blog.example".into(),
            content: "x".repeat(150),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(validate_article(&valid_draft(), &Limits::default()).is_ok());
    }

    #[test]
    fn test_collects_all_violations() {
        let draft = ArticleDraft {
            url: "ftp://nope".into(),
            content: "short".into(),
            ..Default::default()
        };
        let errors = validate_article(&draft, &Limits::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Title is required".to_string(),
                "Valid URL is required".to_string(),
                "Article content is required (minimum 100 characters)".to_string(),
                "Website name is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_size_bounds() {
        let limits = Limits::default();
        let mut draft = valid_draft();
        draft.title = "t".repeat(limits.max_title_length + 1);
        draft.content = "c".repeat(limits.max_article_size + 1);
        let errors = validate_article(&draft, &limits).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Title too long"));
        assert_eq!(errors[1], "Article content too large");
    }

    #[test]
    fn test_content_minimum_is_trimmed() {
        let mut draft = valid_draft();
        draft.content = format!("   {}   ", "y".repeat(99));
        assert!(validate_article(&draft, &Limits::default()).is_err());
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  <b>Hello</b>  "), "bHello/b");
        assert_eq!(sanitize_input(&"a".repeat(20_000)).len(), MAX_SANITIZED_LEN);
    }

    #[test]
    fn test_sanitize_draft_keeps_content() {
        let mut draft = valid_draft();
        draft.content = "<p>html</p>".into();
        draft.title = " <Title> ".into();
        let clean = sanitize_draft(draft);
        assert_eq!(clean.content, "<p>html</p>");
        assert_eq!(clean.title, "Title");
    }

    #[test]
    fn test_identity_validation() {
        let ok = Identity {
            external_id: "1234".into(),
            email: "reader@example.com".into(),
            name: "Reader".into(),
            picture: None,
        };
        assert!(validate_identity(&ok).is_ok());

        let bad = Identity {
            external_id: " ".into(),
            email: "not-an-email".into(),
            name: "".into(),
            picture: None,
        };
        assert_eq!(validate_identity(&bad).unwrap_err().len(), 3);
    }
}
