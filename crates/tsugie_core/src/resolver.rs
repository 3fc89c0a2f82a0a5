//! The tri-key previous-record resolver shared by content enrichment,
//! scoring, and export (§9 "Previous-record resolver").
//!
//! All three stages need to find "the same event in a prior run" given a
//! canonical event that may have changed `canonical_id` (ids are only
//! stable within a run) or picked up new source URLs since. The shared
//! shape: index a record sequence by `canonical_id`, by each source URL,
//! and by a normalized `(name, date)` key; then resolve a query record to
//! the best-ranked match among those sharing at least one of those keys.
//!
//! A `canonical_id` match alone is not sufficient to accept a candidate —
//! ids are only unique within a single run, so two unrelated events in
//! different runs can coincidentally share one. Acceptance additionally
//! requires a shared source URL or a shared name-date key.

use std::collections::HashMap;

/// A record previous-record resolution can be keyed on.
pub trait ResolverKey {
    /// This run's canonical id for the record.
    fn canonical_id(&self) -> &str;
    /// Source URLs attached to the record.
    fn source_urls(&self) -> &[String];
    /// Normalized `"{name}|{date}"` key, when both are known.
    fn name_date_key(&self) -> Option<String>;
}

/// An index over a slice of prior-run records, built once and queried per
/// current-run record.
pub struct PreviousRecordIndex<'a, T> {
    records: &'a [T],
    by_canonical_id: HashMap<&'a str, Vec<usize>>,
    by_source_url: HashMap<&'a str, Vec<usize>>,
    by_name_date: HashMap<String, Vec<usize>>,
}

impl<'a, T: ResolverKey> PreviousRecordIndex<'a, T> {
    /// Builds the three lookup tables over `records`.
    #[must_use]
    pub fn build(records: &'a [T]) -> Self {
        let mut by_canonical_id: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut by_source_url: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut by_name_date: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, record) in records.iter().enumerate() {
            by_canonical_id
                .entry(record.canonical_id())
                .or_default()
                .push(i);
            for url in record.source_urls() {
                by_source_url.entry(url.as_str()).or_default().push(i);
            }
            if let Some(key) = record.name_date_key() {
                by_name_date.entry(key).or_default().push(i);
            }
        }

        Self {
            records,
            by_canonical_id,
            by_source_url,
            by_name_date,
        }
    }

    /// Returns every prior record sharing a key with `query`, annotated
    /// with whether that candidate was confirmed by a URL or name-date
    /// match (as opposed to `canonical_id` alone, which is not sufficient).
    fn candidates<Q: ResolverKey>(&self, query: &Q) -> Vec<(&'a T, bool)> {
        let mut seen: HashMap<usize, bool> = HashMap::new();

        if let Some(indices) = self.by_canonical_id.get(query.canonical_id()) {
            for &i in indices {
                seen.entry(i).or_insert(false);
            }
        }
        for url in query.source_urls() {
            if let Some(indices) = self.by_source_url.get(url.as_str()) {
                for &i in indices {
                    *seen.entry(i).or_insert(false) = true;
                }
            }
        }
        if let Some(key) = query.name_date_key() {
            if let Some(indices) = self.by_name_date.get(&key) {
                for &i in indices {
                    *seen.entry(i).or_insert(false) = true;
                }
            }
        }

        seen.into_iter()
            .filter(|(_, confirmed)| *confirmed)
            .map(|(i, confirmed)| (&self.records[i], confirmed))
            .collect()
    }

    /// Resolves `query` to the best previous record, ranked by `score`
    /// (higher wins; ties keep the first-seen candidate). Returns `None`
    /// if no candidate shares a confirmed key.
    pub fn resolve<Q, S, K>(&self, query: &Q, mut score: S) -> Option<&'a T>
    where
        Q: ResolverKey,
        S: FnMut(&T) -> K,
        K: Ord,
    {
        self.candidates(query)
            .into_iter()
            .map(|(record, _)| record)
            .max_by_key(|record| score(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        id: &'static str,
        urls: Vec<String>,
        name_date: Option<String>,
        rank: i32,
    }

    impl ResolverKey for Rec {
        fn canonical_id(&self) -> &str {
            self.id
        }
        fn source_urls(&self) -> &[String] {
            &self.urls
        }
        fn name_date_key(&self) -> Option<String> {
            self.name_date.clone()
        }
    }

    #[test]
    fn canonical_id_alone_is_not_enough() {
        let prior = vec![Rec {
            id: "E0001",
            urls: vec!["https://a.example/x".into()],
            name_date: Some("hanabi|2025-08-01".into()),
            rank: 1,
        }];
        let index = PreviousRecordIndex::build(&prior);

        let query = Rec {
            id: "E0001",
            urls: vec!["https://b.example/y".into()],
            name_date: Some("other|2025-01-01".into()),
            rank: 0,
        };
        assert!(index.resolve(&query, |r| r.rank).is_none());
    }

    #[test]
    fn shared_url_confirms_match() {
        let prior = vec![Rec {
            id: "E0001",
            urls: vec!["https://a.example/x".into()],
            name_date: None,
            rank: 1,
        }];
        let index = PreviousRecordIndex::build(&prior);

        let query = Rec {
            id: "E0099",
            urls: vec!["https://a.example/x".into()],
            name_date: None,
            rank: 0,
        };
        let resolved = index.resolve(&query, |r| r.rank).unwrap();
        assert_eq!(resolved.id, "E0001");
    }

    #[test]
    fn ranks_multiple_candidates_by_score() {
        let prior = vec![
            Rec {
                id: "E0001",
                urls: vec!["https://a.example/x".into()],
                name_date: None,
                rank: 1,
            },
            Rec {
                id: "E0002",
                urls: vec!["https://a.example/x".into()],
                name_date: None,
                rank: 5,
            },
        ];
        let index = PreviousRecordIndex::build(&prior);
        let query = Rec {
            id: "E0003",
            urls: vec!["https://a.example/x".into()],
            name_date: None,
            rank: 0,
        };
        let resolved = index.resolve(&query, |r| r.rank).unwrap();
        assert_eq!(resolved.id, "E0002");
    }
}
