//! Combination orchestration.
//!
//! The orchestrator is the only component that talks to the oracle and the
//! only writer of oracle results into the [`Store`]. It keeps no state between
//! calls and does not deduplicate concurrent requests; callers guard against
//! overlapping combines for the same pair.
//!
//! Failure handling:
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | oracle unreachable / non-2xx on combine | placeholder result, warning |
//! | oracle unreachable on catalog fetch | built-in seed merged in, warning |
//! | id unresolvable after one targeted fetch | placeholder result, warning |
//! | oracle declines the pair | `error` passed through, no mutation |

use std::sync::Arc;

use alchemist_oracle::{CombineReply, CombineRequest, DEFAULT_PAGE_SIZE, Oracle, OracleError};
use alchemist_types::{CombinationResult, Element, ElementId, Language, ResultOrigin};

use crate::session::SessionContext;
use crate::status::WarningKind;
use crate::store::Store;

/// Upper bound on listing pages followed by one catalog fetch.
pub const MAX_CATALOG_PAGES: u32 = 100;

const EMPTY_REPLY_ERROR: &str = "oracle returned neither a result nor an error";

pub struct Orchestrator<O> {
    oracle: Arc<O>,
    store: Arc<Store>,
    page_size: u32,
}

impl<O> Clone for Orchestrator<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            store: Arc::clone(&self.store),
            page_size: self.page_size,
        }
    }
}

impl<O: Oracle> Orchestrator<O> {
    #[must_use]
    pub fn new(oracle: Arc<O>, store: Arc<Store>) -> Self {
        Self {
            oracle,
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Fetch the full element set for `language` and replace its partition.
    ///
    /// On failure the existing partition is kept and the built-in seed is
    /// merged in. Either way every ledger entry stays resolvable. Returns the
    /// resulting partition, ordered by id.
    pub async fn fetch_catalog(&self, language: &Language) -> Vec<Element> {
        match self.fetch_all_pages(language).await {
            Ok(elements) => {
                let fetched = elements.len();
                let total = self.store.replace_catalog(language, elements);
                tracing::info!(%language, fetched, total, "Loaded element catalog");
            }
            Err(e) => {
                let added = self.store.restore_offline_catalog(language);
                tracing::debug!(%language, added, "Catalog fetch failed; merged local elements");
                self.store.status().warn(
                    WarningKind::CatalogOffline,
                    format!("{e}; using built-in elements for {language}"),
                );
            }
        }

        self.store.catalog().snapshot(language).to_sorted_vec()
    }

    async fn fetch_all_pages(&self, language: &Language) -> Result<Vec<Element>, OracleError> {
        let _call = self.store.status().begin_call();
        let mut elements = Vec::new();

        for page in 0..MAX_CATALOG_PAGES {
            let skip = page.saturating_mul(self.page_size);
            let batch = self
                .oracle
                .list_elements(language, skip, self.page_size)
                .await?;
            let short_page = batch.len() < self.page_size as usize;
            elements.extend(batch);
            if short_page {
                return Ok(elements);
            }
        }

        tracing::warn!(
            %language,
            pages = MAX_CATALOG_PAGES,
            "Catalog page cap reached; listing may be incomplete"
        );
        Ok(elements)
    }

    /// Targeted fetch of one element. Upserts into the catalog on success.
    ///
    /// Reserved (placeholder) ids are never sent to the oracle.
    pub async fn fetch_element(&self, language: &Language, id: ElementId) -> Option<Element> {
        if id.is_reserved() {
            return None;
        }

        let fetched = {
            let _call = self.store.status().begin_call();
            self.oracle.get_element(language, id).await
        };

        match fetched {
            Ok(element) if element.id() == id => {
                self.store.catalog().upsert(language, element.clone());
                Some(element)
            }
            Ok(element) => {
                tracing::warn!(
                    requested = %id,
                    returned = %element.id(),
                    "Oracle returned a different element than requested"
                );
                None
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(%language, %id, "Oracle does not know this element");
                None
            }
            Err(e) => {
                tracing::warn!(%language, %id, "Element fetch failed: {e}");
                None
            }
        }
    }

    /// Catalog lookup, falling back to one targeted fetch.
    pub async fn resolve(&self, language: &Language, id: ElementId) -> Option<Element> {
        match self.store.lookup(language, id) {
            Some(element) => Some(element),
            None => self.fetch_element(language, id).await,
        }
    }

    /// Combine two elements for the session's player and language.
    ///
    /// Never fails: unreachable oracles and unresolvable ids produce the
    /// placeholder result, a declined pair comes back with `error` set.
    pub async fn combine(
        &self,
        session: &SessionContext,
        element1_id: ElementId,
        element2_id: ElementId,
    ) -> CombinationResult {
        let language = session.language();

        let first = self.resolve(language, element1_id).await;
        let second = self.resolve(language, element2_id).await;
        if first.is_none() || second.is_none() {
            let missing: Vec<String> = [(element1_id, &first), (element2_id, &second)]
                .iter()
                .filter(|(_, resolved)| resolved.is_none())
                .map(|(id, _)| id.to_string())
                .collect();
            self.store.status().warn(
                WarningKind::Unresolved,
                format!("could not resolve element(s) {}", missing.join(", ")),
            );
            return self.placeholder_result(element1_id, element2_id, language);
        }

        let request = CombineRequest {
            element1_id,
            element2_id,
            player_name: session.player().as_option().map(str::to_string),
            language: language.clone(),
        };

        let reply = {
            let _call = self.store.status().begin_call();
            self.oracle.combine(&request).await
        };

        match reply {
            Ok(reply) => self.reconcile(element1_id, element2_id, language, reply),
            Err(e) => {
                self.store
                    .status()
                    .warn(WarningKind::CombineOffline, e.to_string());
                self.placeholder_result(element1_id, element2_id, language)
            }
        }
    }

    fn reconcile(
        &self,
        element1_id: ElementId,
        element2_id: ElementId,
        language: &Language,
        reply: CombineReply,
    ) -> CombinationResult {
        if let Some(error) = reply.error {
            tracing::debug!(%element1_id, %element2_id, "Oracle declined combination: {error}");
            return CombinationResult::declined(element1_id, element2_id, error);
        }

        let Some(element) = reply.result else {
            tracing::warn!(%element1_id, %element2_id, "{EMPTY_REPLY_ERROR}");
            return CombinationResult::declined(element1_id, element2_id, EMPTY_REPLY_ERROR);
        };

        if element.is_placeholder() {
            tracing::warn!(id = %element.id(), "Oracle returned a reserved element id");
            return CombinationResult::declined(
                element1_id,
                element2_id,
                format!("oracle returned reserved element id {}", element.id()),
            );
        }

        let is_new_discovery = self.store.record(language, element.clone());
        if is_new_discovery {
            tracing::info!(
                %language,
                id = %element.id(),
                first = reply.is_first_discovery,
                "New discovery: {}",
                element.label()
            );
        }

        CombinationResult {
            element1_id,
            element2_id,
            result: Some(element),
            is_new_discovery,
            is_first_discovery: reply.is_first_discovery,
            error: None,
            origin: ResultOrigin::Oracle,
        }
    }

    fn placeholder_result(
        &self,
        element1_id: ElementId,
        element2_id: ElementId,
        language: &Language,
    ) -> CombinationResult {
        let fallback = self.store.fallback();
        let mut result = fallback.placeholder_result(element1_id, element2_id, language);
        if fallback.persist_placeholders()
            && let Some(element) = result.result.clone()
        {
            result.is_new_discovery = self.store.record(language, element);
        }
        result
    }
}

#[cfg(test)]
mod tests;
