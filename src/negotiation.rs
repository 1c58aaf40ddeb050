//! `Accept` header parsing and media-type selection.

/// One media range from an `Accept` header.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaRange<'a> {
    /// `type/subtype` without parameters, e.g. `text/csv` or `*/*`.
    pub essence: &'a str,
    pub q: f32,
}

impl MediaRange<'_> {
    fn is_wildcard(&self) -> bool {
        self.essence == "*" || self.essence == "*/*"
    }

    /// `text` for a `text/*` range.
    fn major_wildcard(&self) -> Option<&str> {
        self.essence.strip_suffix("/*")
    }
}

/// Parses an `Accept` header into ranges in client-preference order.
///
/// Ranges are ordered by descending `q`; equal weights keep header order.
/// `q=0` ranges are dropped. A malformed weight counts as `1`.
pub fn parse_accept(header: &str) -> Vec<MediaRange<'_>> {
    let mut ranges: Vec<MediaRange<'_>> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let essence = pieces.next()?.trim();
            if essence.is_empty() {
                return None;
            }
            let q = pieces
                .filter_map(|p| {
                    let (name, value) = p.split_once('=')?;
                    name.trim().eq_ignore_ascii_case("q").then_some(value)
                })
                .next()
                .map(|w| w.trim().parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0))
                .unwrap_or(1.0);
            Some(MediaRange { essence, q })
        })
        .filter(|r| r.q > 0.0)
        .collect();
    // `sort_by` is stable, which keeps header order among equal weights.
    ranges.sort_by(|a, b| b.q.total_cmp(&a.q));
    ranges
}

/// Picks the media type to answer with.
///
/// Walks the client's ranges in preference order; the first one naming an
/// `available` type wins. `type/*` matches the first available type with
/// that major type. `*/*`, a missing header, or no match at all give
/// `default`.
pub fn best_match<'a>(
    accept: Option<&str>,
    available: &[&'a str],
    default: Option<&'a str>,
) -> Option<&'a str> {
    let Some(header) = accept.filter(|h| !h.trim().is_empty()) else {
        return default;
    };

    for range in parse_accept(header) {
        if range.is_wildcard() {
            return default;
        }
        let found = match range.major_wildcard() {
            Some(major) => available.iter().find(|m| {
                m.split_once('/')
                    .is_some_and(|(t, _)| t.eq_ignore_ascii_case(major))
            }),
            None => available.iter().find(|m| m.eq_ignore_ascii_case(range.essence)),
        };
        if let Some(media) = found {
            return Some(*media);
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_ONLY: &[&str] = &["application/json"];
    const JSON_CSV: &[&str] = &["application/json", "text/csv"];

    #[test]
    fn orders_by_weight_then_position() {
        let ranges = parse_accept("text/html;q=0.5, text/csv, application/json;q=0.9, */*;q=0.1");
        let order: Vec<_> = ranges.iter().map(|r| r.essence).collect();
        assert_eq!(order, vec!["text/csv", "application/json", "text/html", "*/*"]);
    }

    #[test]
    fn zero_weight_is_refused() {
        let ranges = parse_accept("text/csv;q=0, application/json");
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].essence, "application/json");
    }

    #[test]
    fn weight_parameter_name_ignores_case() {
        let ranges = parse_accept("text/csv;Q=0.5, application/json; charset=utf-8 ;q=0.8");
        let order: Vec<_> = ranges.iter().map(|r| (r.essence, r.q)).collect();
        assert_eq!(order, vec![("application/json", 0.8), ("text/csv", 0.5)]);
    }

    #[test]
    fn unknown_type_falls_back_to_default() {
        let picked = best_match(Some("application/xml"), JSON_ONLY, Some("application/json"));
        assert_eq!(picked, Some("application/json"));
    }

    #[test]
    fn first_registered_preference_wins() {
        assert_eq!(
            best_match(Some("application/xml, text/csv, application/json"), JSON_CSV, Some("application/json")),
            Some("text/csv")
        );
        assert_eq!(
            best_match(Some("text/csv;q=0.2, application/json"), JSON_CSV, Some("application/json")),
            Some("application/json")
        );
    }

    #[test]
    fn wildcards() {
        assert_eq!(best_match(Some("*/*"), JSON_CSV, Some("application/json")), Some("application/json"));
        assert_eq!(best_match(Some("text/*"), JSON_CSV, Some("application/json")), Some("text/csv"));
    }

    #[test]
    fn missing_header_and_no_default() {
        assert_eq!(best_match(None, JSON_CSV, Some("text/csv")), Some("text/csv"));
        assert_eq!(best_match(Some("   "), JSON_CSV, None), None);
        assert_eq!(best_match(Some("image/png"), JSON_CSV, None), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(best_match(Some("Text/CSV"), JSON_CSV, None), Some("text/csv"));
    }
}
