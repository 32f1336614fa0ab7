//! URL classification for image links
//!
//! Pure functions: no I/O, same input always gives the same answer.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::config::EligibilityPolicy;

const PLATFORM_HOSTS: [&str; 2] = ["instagram.com", "www.instagram.com"];

#[allow(clippy::unwrap_used)]
static STORY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(stories|highlights)/").unwrap());

#[allow(clippy::unwrap_used)]
static POST_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/.+").unwrap());

/// Path of `url` when it is on the platform's domain, with or without a scheme
fn platform_path(url: &str) -> Option<String> {
    let parsed = parse_lenient(url)?;
    let host = parsed.host_str()?;
    PLATFORM_HOSTS
        .contains(&host)
        .then(|| parsed.path().to_string())
}

/// True if the URL points at a story or highlight rather than a post
pub fn is_story_url(url: &str) -> bool {
    platform_path(url).is_some_and(|path| STORY_PATH.is_match(&path))
}

/// True if the URL is a post URL eligible for download under `policy`
///
/// Stories and highlights are never eligible. With
/// [`EligibilityPolicy::MultiImageOnly`] the URL must also carry an
/// `img_index` greater than one.
pub fn is_eligible_post_url(url: &str, policy: EligibilityPolicy) -> bool {
    let Some(path) = platform_path(url) else {
        return false;
    };
    if STORY_PATH.is_match(&path) || !POST_PATH.is_match(&path) {
        return false;
    }

    match policy {
        EligibilityPolicy::AnyPost => true,
        EligibilityPolicy::MultiImageOnly => image_index(url).is_some_and(|i| i > 1),
    }
}

/// The `img_index` query parameter, if present and a non-negative integer.
///
/// The value is not clamped; range checking happens once the post's media
/// count is known.
pub fn image_index(url: &str) -> Option<u32> {
    let parsed = parse_lenient(url)?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "img_index")
        .and_then(|(_, value)| value.trim().parse::<u32>().ok())
}

/// Parse a URL, assuming `https://` when the scheme is missing
pub(crate) fn parse_lenient(url: &str) -> Option<Url> {
    Url::parse(url)
        .ok()
        .or_else(|| Url::parse(&format!("https://{}", url.trim_start_matches('/'))).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stories_and_highlights_are_detected() {
        assert!(is_story_url("https://instagram.com/stories/someone/123/"));
        assert!(is_story_url("https://www.instagram.com/highlights/456/"));
        assert!(is_story_url("http://instagram.com/stories/x/"));
        assert!(is_story_url("instagram.com/stories/someone/123/"));
        assert!(is_story_url("www.instagram.com/highlights/456/"));
        assert!(!is_story_url("https://instagram.com/p/ABC/"));
        assert!(!is_story_url("https://example.com/stories/x/"));
    }

    #[test]
    fn stories_are_never_eligible() {
        for policy in [EligibilityPolicy::AnyPost, EligibilityPolicy::MultiImageOnly] {
            for url in [
                "https://instagram.com/stories/x/1/?img_index=3",
                "instagram.com/stories/someone/123/?img_index=2",
                "www.instagram.com/highlights/456/?img_index=2",
                "HTTPS://WWW.INSTAGRAM.COM/stories/x/1/?img_index=2",
            ] {
                assert!(!is_eligible_post_url(url, policy), "{url}");
            }
        }
    }

    #[test]
    fn any_post_policy_accepts_plain_posts() {
        let policy = EligibilityPolicy::AnyPost;
        assert!(is_eligible_post_url("https://instagram.com/p/ABC/", policy));
        assert!(is_eligible_post_url(
            "https://www.instagram.com/p/ABC/?img_index=1",
            policy
        ));
        assert!(is_eligible_post_url("instagram.com/p/ABC/", policy));
        assert!(!is_eligible_post_url("https://example.com/p/ABC/", policy));
        assert!(!is_eligible_post_url("https://instagram.com/", policy));
    }

    #[test]
    fn multi_image_policy_requires_index_above_one() {
        let policy = EligibilityPolicy::MultiImageOnly;
        assert!(is_eligible_post_url(
            "https://instagram.com/p/ABC/?img_index=2",
            policy
        ));
        assert!(!is_eligible_post_url(
            "https://instagram.com/p/ABC/?img_index=1",
            policy
        ));
        assert!(!is_eligible_post_url("https://instagram.com/p/ABC/", policy));
    }

    #[test]
    fn image_index_is_not_clamped() {
        assert_eq!(image_index("https://instagram.com/p/A/?img_index=0"), Some(0));
        assert_eq!(
            image_index("https://instagram.com/p/A/?img_index=400"),
            Some(400)
        );
        assert_eq!(
            image_index("https://instagram.com/p/A/?utm=x&img_index=3"),
            Some(3)
        );
    }

    #[test]
    fn image_index_absent_or_unparseable_is_none() {
        assert_eq!(image_index("https://instagram.com/p/A/"), None);
        assert_eq!(image_index("https://instagram.com/p/A/?img_index=two"), None);
        assert_eq!(image_index("https://instagram.com/p/A/?img_index=-1"), None);
        assert_eq!(image_index("instagram.com/p/A/?img_index=2"), Some(2));
    }

    #[test]
    fn classification_is_stable() {
        let url = "https://instagram.com/p/ABC/?img_index=2";
        let first = is_eligible_post_url(url, EligibilityPolicy::MultiImageOnly);
        for _ in 0..10 {
            assert_eq!(
                is_eligible_post_url(url, EligibilityPolicy::MultiImageOnly),
                first
            );
        }
    }
}
