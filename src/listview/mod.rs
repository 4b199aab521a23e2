//! Generic list screen state: one fetched collection plus the per-screen
//! search / filter / sort / page / selection query, with CRUD operations that
//! keep the local copy in step with the server.
use futures::future::join_all;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::model::Mutation;
use crate::api::{ApiError, ResourceService};
use crate::model::{DeleteMode, Resource};
use crate::notice::{Notice, Notices};
use crate::validate::{Validate, ValidationError};

pub mod collection;
pub mod query;

pub use collection::Collection;
pub use query::{recompute, SortDirection, SortSpec, View, ViewQuery, ALL};

/// Per-screen knobs taken from the `ui` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSettings {
    pub page_size: usize,
    pub message_delay: Duration,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            message_delay: Duration::from_millis(3_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("screen was closed before the response arrived")]
    Unmounted,
    #[error("no item with id {0}")]
    UnknownItem(String),
}

impl ListError {
    pub fn display_message(&self) -> String {
        match self {
            ListError::Api(e) => e.display_message(),
            ListError::Validation(e) => e.message.clone(),
            ListError::Unmounted => "The screen was closed.".to_string(),
            ListError::UnknownItem(id) => format!("Item {} no longer exists.", id),
        }
    }
}

#[derive(Debug, Default)]
struct Liveness {
    mounted: AtomicBool,
    epoch: AtomicU64,
}

/// Shared mounted flag. Clone it out to close the screen from another task;
/// responses that land afterwards are dropped and their notices cleared. The
/// collection and query stay until the owner calls `ListController::unmount`
/// or mounts again.
#[derive(Debug, Clone, Default)]
pub struct LifecycleHandle {
    inner: Arc<Liveness>,
}

impl LifecycleHandle {
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn mount(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.mounted.store(true, Ordering::SeqCst);
    }

    fn ticket(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Starting a load invalidates every earlier ticket.
    fn begin_load(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.is_mounted() && self.ticket() == ticket
    }
}

/// Result of a bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub deleted: Vec<String>,
    /// `(id, message)` for every delete the server refused.
    pub failed: Vec<(String, String)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ListController<R, S>
where
    R: Resource + Validate,
    S: ResourceService<R>,
{
    service: S,
    settings: ListSettings,
    collection: Collection<R>,
    query: ViewQuery,
    load_state: LoadState,
    submit_state: SubmitState,
    notices: Notices,
    lifecycle: LifecycleHandle,
}

impl<R, S> ListController<R, S>
where
    R: Resource + Validate,
    S: ResourceService<R>,
{
    pub fn new(service: S, settings: ListSettings) -> Self {
        Self {
            service,
            settings,
            collection: Collection::new(),
            query: ViewQuery::new(settings.page_size),
            load_state: LoadState::Idle,
            submit_state: SubmitState::Idle,
            notices: Notices::new(settings.message_delay),
            lifecycle: LifecycleHandle::default(),
        }
    }

    pub fn lifecycle(&self) -> LifecycleHandle {
        self.lifecycle.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    /// Mark the screen live and fetch the collection once.
    pub async fn mount(&mut self) -> Result<View<R>, ListError> {
        self.collection.clear();
        self.query = ViewQuery::new(self.settings.page_size);
        self.lifecycle.mount();
        self.load().await?;
        Ok(self.view())
    }

    /// Drop all screen state and cancel pending message timers.
    pub fn unmount(&mut self) {
        self.lifecycle.unmount();
        self.notices.clear();
        self.collection.clear();
        self.query = ViewQuery::new(self.settings.page_size);
        self.load_state = LoadState::Idle;
        self.submit_state = SubmitState::Idle;
        debug!(resource = R::PATH, "list screen unmounted");
    }

    fn ensure_mounted(&self) -> Result<(), ListError> {
        if self.lifecycle.is_mounted() {
            Ok(())
        } else {
            Err(ListError::Unmounted)
        }
    }

    /// Drop a response that arrived after the screen closed or was
    /// superseded by a newer load.
    fn discard_late(&mut self) -> ListError {
        debug!(resource = R::PATH, "discarding late response");
        self.notices.clear();
        if self.load_state == LoadState::Loading {
            self.load_state = LoadState::Idle;
        }
        ListError::Unmounted
    }

    /// Replace the collection with the server's current state.
    #[instrument(skip_all, fields(resource = R::PATH))]
    pub async fn load(&mut self) -> Result<(), ListError> {
        self.ensure_mounted()?;
        let ticket = self.lifecycle.begin_load();
        self.load_state = LoadState::Loading;

        let res = self.service.list().await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }

        match res {
            Ok(items) => {
                info!(count = items.len(), "collection loaded");
                self.collection.replace_all(items);
                self.load_state = LoadState::Loaded;
                self.prune_selection();
                self.clamp_page();
                Ok(())
            }
            Err(err) => {
                warn!(?err, "failed to load collection");
                let msg = err.display_message();
                self.load_state = LoadState::Failed(msg.clone());
                self.notices.error(msg);
                Err(err.into())
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notices.current()
    }

    pub fn collection(&self) -> &Collection<R> {
        &self.collection
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn view(&self) -> View<R> {
        recompute(self.collection.items(), &self.query, R::SEARCH_FIELDS)
    }

    fn filtered_total(&self) -> usize {
        query::filtered(self.collection.items(), &self.query, R::SEARCH_FIELDS).len()
    }

    fn clamp_page(&mut self) {
        let pages = query::total_pages(self.filtered_total(), self.query.page_size);
        self.query.page = self.query.page.clamp(1, pages);
    }

    fn prune_selection(&mut self) {
        let collection = &self.collection;
        self.query.selected.retain(|id| collection.contains(id));
    }

    pub fn set_search(&mut self, text: &str) -> View<R> {
        self.query.search = text.to_string();
        self.query.page = 1;
        self.view()
    }

    /// Dimensions outside `R::FILTER_DIMENSIONS` are ignored.
    pub fn set_filter(&mut self, dimension: &str, value: &str) -> View<R> {
        if !R::FILTER_DIMENSIONS.contains(&dimension) {
            warn!(resource = R::PATH, dimension, "ignoring unknown filter dimension");
            return self.view();
        }
        self.query
            .filters
            .insert(dimension.to_string(), value.trim().to_string());
        self.query.page = 1;
        self.view()
    }

    pub fn clear_filter(&mut self, dimension: &str) -> View<R> {
        self.query.filters.remove(dimension);
        self.query.page = 1;
        self.view()
    }

    /// Keys outside `R::SORT_KEYS` are ignored.
    pub fn set_sort(&mut self, key: &str, direction: SortDirection) -> View<R> {
        if !R::SORT_KEYS.contains(&key) {
            warn!(resource = R::PATH, key, "ignoring unknown sort key");
            return self.view();
        }
        self.query.sort = Some(SortSpec {
            key: key.to_string(),
            direction,
        });
        self.view()
    }

    /// Same key flips the direction; a new key starts ascending.
    pub fn toggle_sort(&mut self, key: &str) -> View<R> {
        let direction = match &self.query.sort {
            Some(sort) if sort.key == key => sort.direction.reversed(),
            _ => SortDirection::Ascending,
        };
        self.set_sort(key, direction)
    }

    /// Clamped to `1..=total_pages`.
    pub fn set_page(&mut self, page: usize) -> View<R> {
        self.query.page = page;
        self.clamp_page();
        self.view()
    }

    pub fn set_page_size(&mut self, page_size: usize) -> View<R> {
        self.query.page_size = page_size.max(1);
        self.query.page = 1;
        self.view()
    }

    pub fn toggle_select(&mut self, id: &str) {
        if !self.query.selected.remove(id) {
            self.query.selected.insert(id.to_string());
        }
    }

    /// Applies to the visible page only.
    pub fn toggle_select_all(&mut self) {
        let visible: Vec<String> = self
            .view()
            .items
            .iter()
            .filter_map(|item| item.id().map(str::to_string))
            .collect();
        if visible.is_empty() {
            return;
        }
        let all_selected = visible.iter().all(|id| self.query.selected.contains(id));
        for id in visible {
            if all_selected {
                self.query.selected.remove(&id);
            } else {
                self.query.selected.insert(id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.query.selected.clear();
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.query.selected
    }

    /// Record a failed submit and show its message.
    pub(crate) fn reject(&mut self, err: ListError) -> ListError {
        let msg = err.display_message();
        self.submit_state = SubmitState::Failed(msg.clone());
        self.notices.error(msg);
        err
    }

    /// Apply a create/update response: patch locally when the server echoed the
    /// stored record, otherwise re-fetch. A failed re-fetch only shows up in
    /// `load_state`.
    async fn settle(&mut self, mutation: Mutation<R>, success: String) -> Result<(), ListError> {
        self.submit_state = SubmitState::Succeeded;
        let success = match mutation {
            Mutation::Saved(item) if item.id().is_some() => {
                self.collection.upsert(item);
                self.clamp_page();
                success
            }
            Mutation::Saved(_) => {
                self.refresh_after_save().await?;
                success
            }
            Mutation::Acknowledged { message } => {
                self.refresh_after_save().await?;
                message.unwrap_or(success)
            }
        };
        self.notices.success(success);
        Ok(())
    }

    async fn refresh_after_save(&mut self) -> Result<(), ListError> {
        match self.load().await {
            Err(ListError::Unmounted) => Err(ListError::Unmounted),
            Err(err) => {
                warn!(resource = R::PATH, ?err, "saved, but re-fetch failed");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Await a mutation issued elsewhere (e.g. a resource-specific endpoint)
    /// and fold its result into this list.
    pub async fn apply_mutation<F>(&mut self, call: F, success: &str) -> Result<(), ListError>
    where
        F: Future<Output = Result<Mutation<R>, ApiError>> + Send,
    {
        self.ensure_mounted()?;
        let ticket = self.lifecycle.ticket();
        self.submit_state = SubmitState::Submitting;

        let res = call.await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }
        match res {
            Ok(mutation) => self.settle(mutation, success.to_string()).await,
            Err(err) => {
                warn!(resource = R::PATH, ?err, "mutation rejected");
                Err(self.reject(err.into()))
            }
        }
    }

    #[instrument(skip_all, fields(resource = R::PATH))]
    pub async fn create(&mut self, item: R) -> Result<(), ListError> {
        self.ensure_mounted()?;
        if let Err(err) = item.validate_new() {
            return Err(self.reject(err.into()));
        }
        let ticket = self.lifecycle.ticket();
        self.submit_state = SubmitState::Submitting;

        let res = self.service.create(&item).await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }
        match res {
            Ok(mutation) => {
                info!("created");
                self.settle(mutation, format!("{} added successfully", R::LABEL))
                    .await
            }
            Err(err) => {
                warn!(?err, "create rejected");
                Err(self.reject(err.into()))
            }
        }
    }

    /// Full-record update of an existing item.
    #[instrument(skip_all, fields(resource = R::PATH, id = %id))]
    pub async fn update(&mut self, id: &str, item: R) -> Result<(), ListError> {
        self.ensure_mounted()?;
        if let Err(err) = item.validate() {
            return Err(self.reject(err.into()));
        }
        let ticket = self.lifecycle.ticket();
        self.submit_state = SubmitState::Submitting;

        let res = self.service.update(id, &item).await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }
        match res {
            Ok(mutation) => {
                info!("updated");
                self.settle(mutation, format!("{} updated successfully", R::LABEL))
                    .await
            }
            Err(err) => {
                warn!(?err, "update rejected");
                Err(self.reject(err.into()))
            }
        }
    }

    /// Create when the record has no id yet, update otherwise.
    pub async fn save(&mut self, item: R) -> Result<(), ListError> {
        match item.id().map(str::to_string) {
            Some(id) => self.update(&id, item).await,
            None => self.create(item).await,
        }
    }

    #[instrument(skip_all, fields(resource = R::PATH, id = %id))]
    pub async fn delete(&mut self, id: &str, mode: DeleteMode) -> Result<(), ListError> {
        self.ensure_mounted()?;
        if !self.collection.contains(id) {
            return Err(self.reject(ListError::UnknownItem(id.to_string())));
        }
        let mode = R::effective_delete(mode);
        let ticket = self.lifecycle.ticket();
        self.submit_state = SubmitState::Submitting;

        let res = self.service.delete(id, mode).await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }
        match res {
            Ok(()) => {
                info!(?mode, "deleted");
                self.apply_delete(id, mode);
                self.clamp_page();
                self.submit_state = SubmitState::Succeeded;
                let msg = match mode {
                    DeleteMode::Soft => format!("{} deactivated successfully", R::LABEL),
                    DeleteMode::Hard => format!("{} deleted successfully", R::LABEL),
                };
                self.notices.success(msg);
                Ok(())
            }
            Err(err) => {
                warn!(?err, "delete rejected");
                Err(self.reject(err.into()))
            }
        }
    }

    fn apply_delete(&mut self, id: &str, mode: DeleteMode) {
        match mode {
            DeleteMode::Soft => {
                self.collection.set_active(id, false);
            }
            DeleteMode::Hard => {
                self.collection.remove(id);
            }
        }
        self.query.selected.remove(id);
    }

    /// Delete every id concurrently. Any failure re-fetches the collection
    /// from the server; ids that failed stay selected.
    #[instrument(skip_all, fields(resource = R::PATH, count = ids.len()))]
    pub async fn bulk_delete(
        &mut self,
        ids: &[String],
        mode: DeleteMode,
    ) -> Result<BulkOutcome, ListError> {
        self.ensure_mounted()?;
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let mode = R::effective_delete(mode);
        let ticket = self.lifecycle.ticket();
        self.submit_state = SubmitState::Submitting;

        let service = &self.service;
        let results = join_all(ids.iter().map(|id| service.delete(id, mode))).await;
        if !self.lifecycle.is_current(ticket) {
            return Err(self.discard_late());
        }

        let mut outcome = BulkOutcome::default();
        for (id, res) in ids.iter().zip(results) {
            match res {
                Ok(()) => outcome.deleted.push(id.clone()),
                Err(err) => outcome.failed.push((id.clone(), err.display_message())),
            }
        }

        if outcome.is_complete() {
            for id in &outcome.deleted {
                self.apply_delete(id, mode);
            }
            self.clamp_page();
            self.submit_state = SubmitState::Succeeded;
            info!(deleted = outcome.deleted.len(), "bulk delete complete");
            self.notices.success(format!(
                "{} {}(s) deleted successfully",
                outcome.deleted.len(),
                R::LABEL.to_lowercase()
            ));
            return Ok(outcome);
        }

        warn!(
            deleted = outcome.deleted.len(),
            failed = outcome.failed.len(),
            "bulk delete partially failed; re-fetching"
        );
        for id in &outcome.deleted {
            self.query.selected.remove(id);
        }
        for (id, _) in &outcome.failed {
            self.query.selected.insert(id.clone());
        }
        let msg = format!(
            "{} of {} deletions failed",
            outcome.failed.len(),
            ids.len()
        );
        self.submit_state = SubmitState::Failed(msg.clone());
        if let Err(err) = self.load().await {
            warn!(?err, "re-fetch after bulk delete failed");
            if err == ListError::Unmounted {
                return Err(err);
            }
        }
        self.notices.error(msg);
        Ok(outcome)
    }

    /// Bulk delete of the current selection.
    pub async fn delete_selected(&mut self, mode: DeleteMode) -> Result<BulkOutcome, ListError> {
        let ids: Vec<String> = self.query.selected.iter().cloned().collect();
        self.bulk_delete(&ids, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn lifecycle_tickets_go_stale() {
        let handle = LifecycleHandle::default();
        assert!(!handle.is_mounted());
        handle.mount();
        let load = handle.begin_load();
        assert!(handle.is_current(load));
        let newer = handle.begin_load();
        assert!(!handle.is_current(load));
        assert!(handle.is_current(newer));
        handle.clone().unmount();
        assert!(!handle.is_current(newer));
    }

    #[test]
    fn list_error_messages_are_displayable() {
        let err: ListError = ApiError::from_response(404, "").into();
        assert_eq!(err.display_message(), "The requested data was not found.");
        let err: ListError = Category::blank().validate().unwrap_err().into();
        assert_eq!(err.display_message(), "category name is required");
    }
}
