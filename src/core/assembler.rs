//! Page assembly from the session's result cursor.

use crate::core::backend::{Highlight, IndexBackend, RawHit};
use crate::core::catalog::BackendCatalog;
use crate::core::i18n::{Message, Translator};
use crate::core::types::{DomainRecord, ResultPage, SessionCacheEntry};
use std::collections::BTreeMap;

/// Highlighted values of one record, `field name -> meta_id -> value`
pub type Excerpt = BTreeMap<String, BTreeMap<u64, String>>;

/// Map a raw hit to a domain record; `None` when it no longer resolves
pub fn map_hit(hit: &RawHit, rank: usize, catalog: &BackendCatalog) -> Option<DomainRecord> {
    let collection_id = hit.collection_id?;
    if !catalog.resolves(hit.backend_id, collection_id) {
        return None;
    }
    Some(DomainRecord {
        backend_id: hit.backend_id,
        collection_id,
        record_id: hit.record_id,
        rank,
        kind: hit.kind,
        title: hit.title.clone(),
    })
}

pub struct ResultAssembler<'a> {
    backend: &'a dyn IndexBackend,
    catalog: &'a BackendCatalog,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(backend: &'a dyn IndexBackend, catalog: &'a BackendCatalog) -> Self {
        Self { backend, catalog }
    }

    /// Fetch hits `offset+1 ..= offset+per_page` and build the page.
    /// Totals and duration come from the cache entry.
    pub fn assemble(
        &self,
        session_id: &str,
        entry: &SessionCacheEntry,
        offset: usize,
        per_page: usize,
        translator: Translator,
    ) -> ResultPage {
        let mut page = ResultPage {
            query: entry.query.clone(),
            duration: entry.duration,
            offset,
            available: entry.total,
            total: entry.total,
            ..ResultPage::default()
        };

        let Some(hits) = self
            .backend
            .fetch_page(session_id, offset.saturating_add(1), per_page, None)
        else {
            tracing::warn!(session = %session_id, offset, "Fetch returned no result structure");
            page.error = translator.trans(&Message::UnableToExecuteQuery);
            return page;
        };

        // Ranks follow the overall result order, skipped hits included
        for (i, hit) in hits.iter().enumerate() {
            match map_hit(hit, offset.saturating_add(i), self.catalog) {
                Some(record) => page.records.push(record),
                None => tracing::warn!(
                    backend = hit.backend_id,
                    record = hit.record_id,
                    "Skipping unresolvable hit"
                ),
            }
        }

        page
    }

    /// Highlighted field values of the hit at `rank` (0-based)
    pub fn excerpt(
        &self,
        session_id: &str,
        rank: usize,
        fields: &[String],
        highlight: &Highlight,
    ) -> Excerpt {
        let mut excerpt = Excerpt::new();
        let Some(hits) = self
            .backend
            .fetch_page(session_id, rank.saturating_add(1), 1, Some(highlight))
        else {
            return excerpt;
        };
        let Some(hit) = hits.first() else {
            return excerpt;
        };

        for name in fields {
            let values: BTreeMap<u64, String> = hit
                .fields
                .iter()
                .filter(|f| f.name.eq_ignore_ascii_case(name))
                .map(|f| (f.meta_id, f.value.clone()))
                .collect();
            if !values.is_empty() {
                excerpt.insert(name.clone(), values);
            }
        }
        excerpt
    }
}
