//! Community selection, including deep links.
//!
//! A requested name may come straight from a URL query parameter, so it is
//! HTML-unescaped and upper-cased before lookup. Unknown names never fail
//! the request: they fall back to the default community and carry a
//! warning for the user.

use community_map_geography_models::{CommunityPolygon, CommunitySelection};
use scraper::Html;

/// Normalizes a free-text community name for lookup.
///
/// Returns `None` for empty or whitespace-only input.
#[must_use]
pub fn normalize_community_name(raw: &str) -> Option<String> {
    let unescaped = unescape_html(raw);
    let trimmed = unescaped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Decodes HTML character references (`&amp;`, `&#39;`, ...). Angle
/// brackets are literal text, not markup.
fn unescape_html(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let escaped = raw.replace('<', "&lt;").replace('>', "&gt;");
    Html::parse_fragment(&escaped).root_element().text().collect()
}

/// Finds a community by its normalized name.
#[must_use]
pub fn find_community<'a>(
    communities: &'a [CommunityPolygon],
    name: &str,
) -> Option<&'a CommunityPolygon> {
    communities.iter().find(|c| c.name == name)
}

/// Resolves the community a request should show.
///
/// With no request the default community is selected silently. A request
/// that does not match any known community falls back to `default` with a
/// warning.
#[must_use]
pub fn resolve_community(
    communities: &[CommunityPolygon],
    requested: Option<&str>,
    default: &str,
) -> CommunitySelection {
    let Some(requested) = requested.and_then(normalize_community_name) else {
        return CommunitySelection {
            name: default.to_string(),
            requested: None,
            warning: None,
        };
    };

    if find_community(communities, &requested).is_some() {
        return CommunitySelection {
            name: requested.clone(),
            requested: Some(requested),
            warning: None,
        };
    }

    let warning = format!("Community \"{requested}\" was not found, showing {default} instead");
    log::warn!("{warning}");

    CommunitySelection {
        name: default.to_string(),
        requested: Some(requested),
        warning: Some(warning),
    }
}
