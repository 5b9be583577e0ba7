use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{AlignedPoint, DateWindow, RawObservation};

/// Left-join one store's observations onto every day of the window.
///
/// The first observation for a day decides its value. A count of zero is
/// reported the same as a missing row, since the cameras record zero when
/// they are offline.
pub fn align(observations: &[RawObservation], store: &str, window: &DateWindow) -> Vec<AlignedPoint> {
    let mut by_date: HashMap<NaiveDate, Option<u32>> = HashMap::new();
    for obs in observations {
        if obs.store == store && obs.date >= window.start() && obs.date <= window.end() {
            by_date.entry(obs.date).or_insert(obs.count);
        }
    }

    window
        .days()
        .into_iter()
        .map(|date| AlignedPoint {
            date,
            count: by_date.get(&date).copied().flatten().filter(|&c| c > 0),
        })
        .collect()
}

/// Order stores with the preferred ones first, in their configured order,
/// followed by the remaining stores alphabetically.
///
/// Preferred names that do not appear in `stores` are dropped.
pub fn order_stores<S: AsRef<str>>(stores: &BTreeSet<String>, preferred: &[S]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(stores.len());

    for name in preferred {
        let name = name.as_ref();
        if stores.contains(name) && seen.insert(name) {
            ordered.push(name.to_string());
        }
    }

    // BTreeSet iterates in sorted order
    for name in stores {
        if seen.insert(name) {
            ordered.push(name.clone());
        }
    }

    ordered
}
