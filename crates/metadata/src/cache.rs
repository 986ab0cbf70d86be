// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Member cache
//!
//! [`CachingMetadataReader`] decorates [`RawMetadataReader`] with an identity
//! cache. Lookups consult, in order:
//!
//! 1. the known measures of the cube, held strongly and never evicted;
//! 2. a bounded LRU of members keyed by unique name;
//! 3. the raw reader, whose results are stored in the LRU.
//!
//! Eviction is deterministic LRU: an evicted member is re-fetched on the next
//! miss and comes back as a new instance. While an entry survives, every
//! lookup of its unique name returns the same `Arc`.
//!
//! Level member lists are cached per level in a second LRU. The measures
//! level is answered from the cube's measure list once it is loaded.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::trace;
use xmla_olap_protocol::{TreeOps, XmlaResult};

use crate::element::MetadataElement;
use crate::model::{Cube, Member, MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME};
use crate::reader::{MetadataReader, RawMetadataReader};

/// Caching decorator over the raw, network-backed reader
pub struct CachingMetadataReader {
    cube: Weak<Cube>,
    raw: RawMetadataReader,
    measures: RwLock<HashMap<String, Arc<Member>>>,
    members: Mutex<LruCache<String, Arc<Member>>>,
    level_members: Mutex<LruCache<String, Vec<Arc<Member>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachingMetadataReader {
    /// Create a reader for `cube`; capacities of zero are raised to one
    pub fn new(cube: Weak<Cube>, member_capacity: usize, level_capacity: usize) -> Self {
        let member_capacity = NonZeroUsize::new(member_capacity).unwrap_or(NonZeroUsize::MIN);
        let level_capacity = NonZeroUsize::new(level_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            raw: RawMetadataReader::new(cube.clone()),
            cube,
            measures: RwLock::new(HashMap::new()),
            members: Mutex::new(LruCache::new(member_capacity)),
            level_members: Mutex::new(LruCache::new(level_capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The undecorated reader
    pub fn raw(&self) -> &RawMetadataReader {
        &self.raw
    }

    /// Make the cube's measures resolvable without network access
    pub(crate) fn register_measures(&self, measures: &[Arc<Member>]) {
        let mut known = self.measures.write();
        for measure in measures {
            known.insert(measure.unique_name().to_string(), Arc::clone(measure));
        }
    }

    fn cached(&self, unique_name: &str) -> Option<Arc<Member>> {
        if let Some(measure) = self.measures.read().get(unique_name) {
            return Some(Arc::clone(measure));
        }
        self.members.lock().get(unique_name).cloned()
    }

    /// Canonical instance for a freshly fetched member
    ///
    /// A member already cached under the same unique name wins over the new
    /// instance. Measures go to the measures map, never to the LRU.
    fn store(&self, member: Arc<Member>) -> Arc<Member> {
        if member.is_measure() || member.dimension_unique_name() == MEASURES_UNIQUE_NAME {
            if let Some(known) = self.measures.read().get(member.unique_name()) {
                return Arc::clone(known);
            }
            return Arc::clone(
                self.measures
                    .write()
                    .entry(member.unique_name().to_string())
                    .or_insert(member),
            );
        }
        let mut members = self.members.lock();
        if let Some(existing) = members.get(member.unique_name()) {
            return Arc::clone(existing);
        }
        members.put(member.unique_name().to_string(), Arc::clone(&member));
        member
    }

    fn record_hits(&self, count: usize) {
        self.hits.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_misses(&self, count: usize) {
        self.misses.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            total_requests: total,
            hit_rate,
            entries: self.members.lock().len(),
            level_entries: self.level_members.lock().len(),
            measures: self.measures.read().len(),
        }
    }

    /// Drop cached members and level lists; known measures are kept
    pub fn clear(&self) {
        self.members.lock().clear();
        self.level_members.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl MetadataReader for CachingMetadataReader {
    fn lookup_member_by_unique_name(&self, unique_name: &str) -> XmlaResult<Option<Arc<Member>>> {
        if let Some(member) = self.cached(unique_name) {
            self.record_hits(1);
            return Ok(Some(member));
        }
        self.record_misses(1);
        trace!(member = unique_name, "member cache miss");
        Ok(self
            .raw
            .lookup_member_by_unique_name(unique_name)?
            .map(|member| self.store(member)))
    }

    fn lookup_members_by_unique_name(
        &self,
        unique_names: &[String],
    ) -> XmlaResult<HashMap<String, Arc<Member>>> {
        let mut found = HashMap::with_capacity(unique_names.len());
        let mut missing: Vec<String> = Vec::new();
        for name in unique_names {
            if found.contains_key(name) || missing.contains(name) {
                continue;
            }
            match self.cached(name) {
                Some(member) => {
                    found.insert(name.clone(), member);
                }
                None => missing.push(name.clone()),
            }
        }
        self.record_hits(found.len());
        self.record_misses(missing.len());

        if !missing.is_empty() {
            for (name, member) in self.raw.lookup_members_by_unique_name(&missing)? {
                found.insert(name, self.store(member));
            }
        }
        Ok(found)
    }

    fn lookup_member_relatives(
        &self,
        ops: TreeOps,
        unique_name: &str,
    ) -> XmlaResult<Vec<Arc<Member>>> {
        Ok(self
            .raw
            .lookup_member_relatives(ops, unique_name)?
            .into_iter()
            .map(|member| self.store(member))
            .collect())
    }

    fn level_members_by_unique_name(&self, level_unique_name: &str) -> XmlaResult<Vec<Arc<Member>>> {
        let is_measures = level_unique_name == MEASURES_LEVEL_UNIQUE_NAME;
        if is_measures {
            if let Some(cube) = self.cube.upgrade() {
                if !cube.measures().is_empty() {
                    return Ok(cube.measures().to_vec());
                }
            }
        }
        if let Some(members) = self.level_members.lock().get(level_unique_name).cloned() {
            self.record_hits(1);
            return Ok(members);
        }
        self.record_misses(1);

        let members: Vec<Arc<Member>> = self
            .raw
            .level_members_by_unique_name(level_unique_name)?
            .into_iter()
            .map(|member| self.store(member))
            .collect();
        if !is_measures {
            self.level_members
                .lock()
                .put(level_unique_name.to_string(), members.clone());
        }
        Ok(members)
    }
}

impl std::fmt::Debug for CachingMetadataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingMetadataReader")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// Percentage of lookups answered from the cache
    pub hit_rate: f64,
    /// Members currently in the LRU
    pub entries: usize,
    /// Level member lists currently cached
    pub level_entries: usize,
    /// Known measures
    pub measures: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Member cache: {} hits, {} misses, {:.2}% hit rate, {} members, {} levels",
            self.hits, self.misses, self.hit_rate, self.entries, self.level_entries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_graph;

    fn regular(name: &str) -> Arc<Member> {
        Arc::new(
            Member::new(format!("[Gender].[All Gender].[{}]", name), name)
                .with_level("[Gender].[Gender]", "[Gender]", "[Gender]"),
        )
    }

    #[test]
    fn test_store_keeps_first_instance() {
        let reader = CachingMetadataReader::new(Weak::new(), 10, 10);
        let first = reader.store(regular("F"));
        let second = reader.store(regular("F"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.stats().entries, 1);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let reader = CachingMetadataReader::new(Weak::new(), 2, 2);
        reader.store(regular("F"));
        reader.store(regular("M"));
        assert!(reader.cached("[Gender].[All Gender].[F]").is_some());
        reader.store(regular("X"));

        assert!(reader.cached("[Gender].[All Gender].[M]").is_none());
        assert!(reader.cached("[Gender].[All Gender].[F]").is_some());
        assert!(reader.cached("[Gender].[All Gender].[X]").is_some());
    }

    #[test]
    fn test_measures_never_enter_lru() {
        let reader = CachingMetadataReader::new(Weak::new(), 10, 10);
        let known = Arc::new(
            Member::new("[Measures].[Unit Sales]", "Unit Sales").with_type(crate::model::MemberType::Measure),
        );
        reader.register_measures(std::slice::from_ref(&known));

        let fetched = Arc::new(
            Member::new("[Measures].[Unit Sales]", "Unit Sales")
                .with_level(MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME, MEASURES_UNIQUE_NAME),
        );
        let canonical = reader.store(fetched);
        assert!(Arc::ptr_eq(&canonical, &known));
        assert_eq!(reader.stats().entries, 0);

        reader.clear();
        assert_eq!(reader.stats().measures, 1);
    }

    #[test]
    fn test_unregistered_measure_keeps_identity() {
        let reader = CachingMetadataReader::new(Weak::new(), 10, 10);
        let fetch = || {
            Arc::new(
                Member::new("[Measures].[Profit]", "Profit")
                    .with_level(MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME, MEASURES_UNIQUE_NAME),
            )
        };

        let first = reader.store(fetch());
        let second = reader.store(fetch());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(reader
            .cached("[Measures].[Profit]")
            .is_some_and(|cached| Arc::ptr_eq(&cached, &first)));
        assert_eq!(reader.stats().entries, 0);
        assert_eq!(reader.stats().measures, 1);
    }

    #[test]
    fn test_registered_measure_resolves_without_request() {
        let g = sample_graph();
        let reader = g.cube.metadata_reader();
        let measure = reader
            .lookup_member_by_unique_name("[Measures].[Unit Sales]")
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&measure, &g.cube.measures()[0]));
        assert_eq!(reader.stats().hits, 1);
        assert_eq!(g.session.requests_sent(), 0);
    }

    #[test]
    fn test_measures_level_short_circuits() {
        let g = sample_graph();
        let members = g
            .cube
            .metadata_reader()
            .level_members_by_unique_name(MEASURES_LEVEL_UNIQUE_NAME)
            .unwrap();
        assert_eq!(members.len(), g.cube.measures().len());
        assert_eq!(g.session.requests_sent(), 0);
    }

    #[test]
    fn test_batch_lookup_answers_cached_names_locally() {
        let g = sample_graph();
        let reader = g.cube.metadata_reader();
        reader.store(regular("F"));
        reader.store(regular("M"));

        let names = vec![
            "[Gender].[All Gender].[F]".to_string(),
            "[Gender].[All Gender].[M]".to_string(),
            "[Gender].[All Gender].[F]".to_string(),
        ];
        let found = reader.lookup_members_by_unique_name(&names).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(g.session.requests_sent(), 0);
    }

    #[test]
    fn test_stats_display() {
        let reader = CachingMetadataReader::new(Weak::new(), 10, 10);
        reader.store(regular("F"));
        let text = reader.stats().to_string();
        assert!(text.contains("1 members"));
    }
}
