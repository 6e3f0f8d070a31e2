//! Launch URL matching.
//!
//! A launch URL is reduced to a thumbprint (host without `www.`, path and
//! query, lower-cased) and compared against the thumbprint of every candidate
//! tool's base URL.

use ltix_core::{CourseId, RegistryError, ToolRegistry, ToolState, ToolType};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Score of an exact thumbprint match.
pub const SCORE_EXACT: i32 = 100;

/// Score when the launch URL starts with the tool's thumbprint.
pub const SCORE_PREFIX: i32 = 50;

/// Penalty for a tool owned by another course than the requesting one.
pub const PENALTY_OTHER_COURSE: i32 = 10;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?([^/]+)(?:/|$)").expect("valid domain regex")
});

/// A candidate tool together with its match score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTool {
    pub tool: ToolType,
    pub score: i32,
}

/// Comparison subject for a URL. Never fails; missing parts are empty.
pub fn url_thumbprint(url: &str) -> String {
    let mut lower = url.trim().to_lowercase();
    if !lower.contains("http://") && !lower.contains("https://") {
        lower = format!("http://{lower}");
    }

    let (host, path, query) = match Url::parse(&lower) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or_default().to_string(),
            parsed.path().trim_start_matches('/').to_string(),
            parsed.query().unwrap_or_default().to_string(),
        ),
        Err(_) => split_loosely(&lower),
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut thumbprint = format!("{host}/{path}");
    if !query.is_empty() {
        thumbprint.push('?');
        thumbprint.push_str(&query);
    }
    thumbprint
}

// Fallback for strings the URL parser rejects (bad ports, stray characters).
fn split_loosely(url: &str) -> (String, String, String) {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split('#').next().unwrap_or_default();
    let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    (host.to_string(), path.to_string(), query.to_string())
}

/// Lower-cased domain of a launch URL, used to shortlist candidate tools.
pub fn domain_from_url(url: &str) -> Option<String> {
    DOMAIN_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Best scoring tool for `url`, or `None` when no tool scores above zero.
///
/// Ties go to the first tool in `tools`.
pub fn find_best_match(
    url: &str,
    tools: &[ToolType],
    course_id: Option<CourseId>,
) -> Option<ScoredTool> {
    let wanted = url_thumbprint(url);
    let mut best: Option<ScoredTool> = None;

    for tool in tools {
        let base = url_thumbprint(&tool.base_url);
        let mut score = if wanted == base {
            SCORE_EXACT
        } else if wanted.starts_with(&base) {
            SCORE_PREFIX
        } else {
            0
        };
        if course_id.is_some_and(|course| tool.course_id != course) {
            score -= PENALTY_OTHER_COURSE;
        }
        tracing::debug!(tool_id = %tool.id, score, "Scored tool for launch URL");

        let best_score = best.as_ref().map_or(-1, |b| b.score);
        if score > best_score {
            best = Some(ScoredTool {
                tool: tool.clone(),
                score,
            });
        }
    }

    best.filter(|b| b.score > 0)
}

/// Matches `url` against the configured tools registered for its domain.
pub async fn tool_by_url_match(
    registry: &dyn ToolRegistry,
    url: &str,
    course_id: Option<CourseId>,
) -> Result<Option<ScoredTool>, RegistryError> {
    let Some(domain) = domain_from_url(url) else {
        return Ok(None);
    };
    let tools = registry
        .find_tools_by_domain(&domain, Some(ToolState::Configured), course_id)
        .await?;
    Ok(find_best_match(url, &tools, course_id))
}

/// Configured tools offered in a course: preconfigured or chooser-visible,
/// site-wide or owned by that course.
pub async fn tools_for_course(
    registry: &dyn ToolRegistry,
    course_id: CourseId,
) -> Result<Vec<ToolType>, RegistryError> {
    let tools = registry.tools_in_course(course_id).await?;
    Ok(tools
        .into_iter()
        .filter(|tool| {
            tool.state == ToolState::Configured
                && tool.course_visible.is_offered()
                && tool.is_allowed_in(course_id)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltix_core::ToolTypeId;

    fn tool(id: i64, base_url: &str, course: i64) -> ToolType {
        let mut tool = ToolType::new(ToolTypeId::new(id), format!("Tool {id}"), base_url);
        tool.course_id = CourseId::new(course);
        tool.state = ToolState::Configured;
        tool
    }

    #[test]
    fn test_thumbprint_normalizes_scheme_and_www() {
        assert_eq!(
            url_thumbprint("https://www.example.com/lti/launch"),
            url_thumbprint("example.com/lti/launch")
        );
        assert_eq!(url_thumbprint("HTTP://Example.COM/LTI"), "example.com/lti");
    }

    #[test]
    fn test_thumbprint_keeps_query() {
        assert_eq!(
            url_thumbprint("http://tool.example/launch?x=1"),
            "tool.example/launch?x=1"
        );
    }

    #[test]
    fn test_thumbprint_never_fails() {
        assert_eq!(url_thumbprint(""), "/");
        assert_eq!(url_thumbprint("http://host:99999/a?b"), "host/a?b");
        let _ = url_thumbprint("::::/???");
    }

    #[test]
    fn test_domain_from_url() {
        assert_eq!(
            domain_from_url("https://www.Tool.example/launch").as_deref(),
            Some("tool.example")
        );
        assert_eq!(domain_from_url("tool.example").as_deref(), Some("tool.example"));
        assert_eq!(domain_from_url(""), None);
    }

    #[test]
    fn test_exact_match_scores_100() {
        let tools = vec![tool(1, "example.com/lti/launch", 1)];
        let best = find_best_match("https://www.example.com/lti/launch", &tools, None).unwrap();
        assert_eq!(best.score, SCORE_EXACT);
    }

    #[test]
    fn test_exact_beats_prefix() {
        let tools = vec![
            tool(1, "http://tool.example/", 1),
            tool(2, "http://tool.example/launch", 1),
        ];
        let best = find_best_match("http://tool.example/launch", &tools, None).unwrap();
        assert_eq!(best.tool.id, ToolTypeId::new(2));
        assert_eq!(best.score, 100);
    }

    #[test]
    fn test_course_tool_preferred_over_site_tool() {
        let tools = vec![
            tool(1, "http://tool.example/launch", 1),
            tool(2, "http://tool.example/launch", 5),
        ];
        let best = find_best_match("http://tool.example/launch", &tools, Some(CourseId::new(5)))
            .unwrap();
        assert_eq!(best.tool.id, ToolTypeId::new(2));
        assert_eq!(best.score, 100);
    }

    #[test]
    fn test_tie_goes_to_first() {
        let tools = vec![
            tool(1, "http://tool.example/launch", 1),
            tool(2, "http://tool.example/launch", 1),
        ];
        let best = find_best_match("http://tool.example/launch", &tools, None).unwrap();
        assert_eq!(best.tool.id, ToolTypeId::new(1));
    }

    #[test]
    fn test_no_positive_score_is_no_match() {
        let tools = vec![tool(1, "http://other.example/", 1)];
        assert!(find_best_match("http://tool.example/launch", &tools, None).is_none());
        assert!(find_best_match("http://tool.example/launch", &[], None).is_none());
    }

    #[test]
    fn test_matching_is_deterministic() {
        let tools = vec![
            tool(1, "http://tool.example/", 1),
            tool(2, "http://tool.example/launch", 3),
        ];
        let first = find_best_match("http://tool.example/launch?a=1", &tools, Some(CourseId::new(3)));
        for _ in 0..5 {
            assert_eq!(
                find_best_match("http://tool.example/launch?a=1", &tools, Some(CourseId::new(3))),
                first
            );
        }
    }
}
