//! Recently viewed cities (bounded, most-recent-first).

use airdash_core::models::{CityRef, RecentCity};
use airdash_core::relative_time::format_relative;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::effects::SessionEffect;
use crate::state::SessionState;

/// Moves `city` to the front, dropping duplicates and anything past `capacity`.
pub fn push_front(list: &mut Vec<RecentCity>, city: RecentCity, capacity: usize) {
    list.retain(|existing| existing.id != city.id);
    list.insert(0, city);
    list.truncate(capacity);
}

/// Recomputes `formatted_time` for every entry.
pub fn refresh_formatting(list: &mut [RecentCity], now: DateTime<Utc>) {
    for city in list {
        city.formatted_time = format_relative(city.viewed_at, now);
    }
}

pub fn add(state: &mut SessionState, city: CityRef, at: DateTime<Utc>) -> Vec<SessionEffect> {
    if !state.is_authenticated() {
        debug!(city = %city.id, "not recording city view without a session");
        return vec![];
    }

    let mut entry = RecentCity::viewed(city, at);
    entry.formatted_time = format_relative(at, at);
    push_front(&mut state.recent, entry, state.settings.recent_capacity);
    vec![SessionEffect::PersistRecent {
        cities: state.recent.clone(),
    }]
}

pub fn clear(state: &mut SessionState) -> Vec<SessionEffect> {
    state.recent.clear();
    vec![SessionEffect::ClearRecent]
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn city(id: &str, at: DateTime<Utc>) -> RecentCity {
        RecentCity::viewed(CityRef::new(id, id.to_uppercase(), id), at)
    }

    fn ids(list: &[RecentCity]) -> Vec<&str> {
        list.iter().map(|city| city.id.as_str()).collect()
    }

    #[test]
    fn test_revisit_moves_to_front() {
        let now = Utc::now();
        let mut list = vec![city("a", now), city("b", now), city("c", now)];

        push_front(&mut list, city("b", now), 10);

        assert_eq!(ids(&list), ["b", "a", "c"]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let now = Utc::now();
        let mut list = Vec::new();
        for i in 0..12 {
            push_front(&mut list, city(&format!("city-{i}"), now), 10);
        }

        assert_eq!(list.len(), 10);
        assert_eq!(list[0].id, "city-11");
        assert_eq!(list[9].id, "city-2");
    }

    #[test]
    fn test_refresh_formatting() {
        let now = Utc::now();
        let mut list = vec![
            city("a", now - Duration::seconds(20)),
            city("b", now - Duration::minutes(5)),
            city("c", now - Duration::hours(3)),
        ];

        refresh_formatting(&mut list, now);

        let formatted: Vec<_> = list.iter().map(|c| c.formatted_time.as_str()).collect();
        assert_eq!(formatted, ["Vừa xong", "5 phút trước", "3 giờ trước"]);
    }
}
