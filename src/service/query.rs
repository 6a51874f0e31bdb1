//! Event search: tag membership, free-text / hashtag search and date bounds,
//! applied in memory over the active events.

use chrono::{DateTime, Utc};

use crate::{
    dto::{parse_date_bound, EventFilterQuery},
    errors::ApiError,
    models::Event,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Lower-cased; an event matches if it carries any of them.
    pub tags: Vec<String>,
    /// Lower-cased, `#` stripped.
    pub search: Option<String>,
    pub start_date_after: Option<DateTime<Utc>>,
    pub end_date_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_query(query: EventFilterQuery) -> Result<Self, ApiError> {
        let mut filter = match query.tags {
            Some(raw) => Self::with_tags(raw.split(',')),
            None => Self::default(),
        };
        filter.search = query.search.as_deref().and_then(search_term);
        filter.start_date_after = query
            .start_date_after
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_date_bound("start_date_after", raw, false))
            .transpose()?;
        filter.end_date_before = query
            .end_date_before
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_date_bound("end_date_before", raw, true))
            .transpose()?;
        Ok(filter)
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.is_active
            && self.matches_tags(event)
            && self.matches_search(event)
            && self.matches_dates(event)
    }

    fn matches_tags(&self, event: &Event) -> bool {
        self.tags.is_empty()
            || event
                .tags
                .iter()
                .any(|tag| self.tags.contains(&tag.to_lowercase()))
    }

    fn matches_search(&self, event: &Event) -> bool {
        let Some(term) = &self.search else {
            return true;
        };
        event.title.to_lowercase().contains(term)
            || event.description.to_lowercase().contains(term)
            || event.tags.iter().any(|tag| tag.to_lowercase().contains(term))
    }

    fn matches_dates(&self, event: &Event) -> bool {
        self.start_date_after.map_or(true, |after| event.start_date >= after)
            && self.end_date_before.map_or(true, |before| event.end_date <= before)
    }
}

/// Normalises a search string; `None` when nothing is left to match on.
pub fn search_term(raw: &str) -> Option<String> {
    let term = raw.trim();
    let term = term.strip_prefix('#').unwrap_or(term).trim();
    (!term.is_empty()).then(|| term.to_lowercase())
}

/// Keeps the events `filter` accepts, ordered by start date. Each event is
/// tested once, so title and tag hits can never produce duplicates.
pub fn apply(events: Vec<Event>, filter: &EventFilter) -> Vec<Event> {
    let mut matched: Vec<Event> = events.into_iter().filter(|e| filter.matches(e)).collect();
    matched.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::event;
    use chrono::Duration;

    fn tagged(title: &str, tags: &[&str], starts_in_days: i64) -> Event {
        let mut e = event(10, 0);
        e.title = title.to_string();
        e.description = format!("{title} for everyone on campus");
        e.tags = tags.iter().map(|t| t.to_string()).collect();
        e.start_date = Utc::now() + Duration::days(starts_in_days);
        e.end_date = e.start_date + Duration::hours(2);
        e
    }

    fn titles(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn tag_filter_is_case_insensitive_exact_match() {
        let events = vec![
            tagged("Open mic", &["Music", "poetry"], 3),
            tagged("Orchestra", &["music"], 1),
            tagged("Musical theatre", &["musical"], 2),
            tagged("Hackathon", &["tech"], 4),
        ];
        let found = apply(events, &EventFilter::with_tags(["MUSIC"]));
        assert_eq!(titles(&found), vec!["Orchestra", "Open mic"]);
    }

    #[test]
    fn any_requested_tag_qualifies() {
        let events = vec![
            tagged("Hackathon", &["tech"], 2),
            tagged("Open mic", &["music"], 1),
            tagged("Bake sale", &["food"], 3),
        ];
        let found = apply(events, &EventFilter::with_tags(["tech", "music"]));
        assert_eq!(titles(&found), vec!["Open mic", "Hackathon"]);
    }

    #[test]
    fn hashtag_search_matches_tag_substrings() {
        let events = vec![
            tagged("Resume clinic", &["CareerDevelopment"], 1),
            tagged("Open mic", &["music"], 2),
        ];
        let filter = EventFilter {
            search: search_term("#career"),
            ..Default::default()
        };
        assert_eq!(titles(&apply(events, &filter)), vec!["Resume clinic"]);
    }

    #[test]
    fn search_hits_title_or_description_once() {
        let mut both = tagged("Chess club", &["chess"], 1);
        both.description = "Weekly chess for all levels".into();
        let events = vec![both, tagged("Bake sale", &["food"], 2)];
        let filter = EventFilter {
            search: search_term("CHESS"),
            ..Default::default()
        };
        let found = apply(events, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Chess club");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term("  # "), None);
        assert_eq!(search_term("#AI "), Some("ai".to_string()));
    }

    #[test]
    fn inactive_events_never_match() {
        let mut gone = tagged("Cancelled gig", &["music"], 1);
        gone.is_active = false;
        let found = apply(vec![gone], &EventFilter::default());
        assert!(found.is_empty());
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let a = tagged("A", &["x"], 1);
        let b = tagged("B", &["x"], 5);
        let filter = EventFilter {
            start_date_after: Some(b.start_date),
            end_date_before: Some(b.end_date),
            ..Default::default()
        };
        assert_eq!(titles(&apply(vec![a, b], &filter)), vec!["B"]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let found = apply(vec![tagged("A", &["x"], 1)], &EventFilter::with_tags(["nope"]));
        assert!(found.is_empty());
    }

    #[test]
    fn query_parsing() {
        let filter = EventFilter::from_query(EventFilterQuery {
            tags: Some("Music, ,Art".into()),
            search: Some("#jazz".into()),
            start_date_after: Some("2030-01-01".into()),
            end_date_before: Some("".into()),
        })
        .unwrap();
        assert_eq!(filter.tags, vec!["music", "art"]);
        assert_eq!(filter.search.as_deref(), Some("jazz"));
        assert!(filter.start_date_after.is_some());
        assert!(filter.end_date_before.is_none());

        let err = EventFilter::from_query(EventFilterQuery {
            end_date_before: Some("soon".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ApiError::InvalidDateFormat("end_date_before".into()));
    }
}
