//! N-way intersection of identified entity collections.
//!
//! Used by search to narrow result sets produced by independent filters:
//! the intersection is what every filter agreed on, the remainder is what
//! matched at least one filter but not all of them.

use std::collections::{HashMap, HashSet};

/// An entity with a unique identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

#[derive(Debug)]
pub struct Intersection<T> {
    /// Entities whose identifier appears in every input collection. Each
    /// qualifying identifier appears exactly once.
    pub intersect: Vec<T>,
    /// Entities appearing in at least one collection but not all of them,
    /// in flattened input order, deduplicated by identifier.
    pub remainder: Vec<T>,
}

/// Intersect N ordered collections by identifier.
///
/// A single collection is returned verbatim with an empty remainder.
/// Membership tests run over hash sets, so the cost is linear-ish in the
/// total entity count rather than pairwise.
pub fn intersect_groups<T: Keyed>(groups: Vec<Vec<T>>) -> Intersection<T> {
    if groups.len() <= 1 {
        return Intersection {
            intersect: groups.into_iter().next().unwrap_or_default(),
            remainder: Vec::new(),
        };
    }

    let group_count = groups.len();

    // How many distinct collections each identifier appears in.
    let mut membership: HashMap<String, usize> = HashMap::new();
    for group in &groups {
        let ids: HashSet<&str> = group.iter().map(|e| e.key()).collect();
        for id in ids {
            *membership.entry(id.to_string()).or_insert(0) += 1;
        }
    }

    let mut intersect = Vec::new();
    let mut remainder = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for entity in groups.into_iter().flatten() {
        let id = entity.key().to_string();
        if !seen.insert(id.clone()) {
            continue;
        }
        if membership.get(&id).copied() == Some(group_count) {
            intersect.push(entity);
        } else {
            remainder.push(entity);
        }
    }

    Intersection { intersect, remainder }
}
