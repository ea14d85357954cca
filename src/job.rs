//! Job orchestration — run the persisted action list in order.
//!
//! Actions execute strictly sequentially in ascending `order`; each one is
//! fully awaited (including a wait action's whole convergence loop) before
//! the next starts. The only state carried between actions is the
//! accumulating named result map.

use crate::action::{self, WaitParams, DEFAULT_WAIT_TIMEOUT_MS};
use crate::driver::{PageDriver, Scope};
use crate::error::ScrapeError;
use crate::extract::{self, Value};
use crate::record::{ActionKind, ActionRecord, SelectorRecord};
use crate::resolve::{self, Handles};
use crate::store::ConfigStore;
use crate::tree;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Interaction primitives the orchestrator dispatches to.
#[derive(Debug, Clone, Copy)]
enum Interaction {
    Click,
    Scroll,
}

/// Runs every persisted action against one live page.
pub struct JobRunner<'a> {
    driver: &'a dyn PageDriver,
    store: &'a dyn ConfigStore,
}

impl<'a> JobRunner<'a> {
    pub fn new(driver: &'a dyn PageDriver, store: &'a dyn ConfigStore) -> Self {
        Self { driver, store }
    }

    /// Run all actions in ascending `order`, returning the accumulated
    /// result map. Extraction actions merge their output under the action's
    /// `name`; interaction actions contribute side effects only.
    pub async fn run(&self) -> Result<BTreeMap<String, Value>, ScrapeError> {
        let actions = self
            .store
            .actions_ordered()
            .await
            .map_err(ScrapeError::store)?;

        let mut results = BTreeMap::new();
        for record in &actions {
            info!(action = %record.name, kind = %record.action, "performing action");

            self.driver
                .wait_for_network_idle()
                .await
                .map_err(ScrapeError::driver)?;

            let kind = ActionKind::parse(&record.action).ok_or_else(|| {
                ScrapeError::UnsupportedAction {
                    name: record.name.clone(),
                    kind: record.action.clone(),
                }
            })?;

            match kind {
                ActionKind::Group | ActionKind::Scrap => {
                    let data = self.run_extraction(record).await?;
                    results.insert(record.name.clone(), Value::Map(data));
                }
                ActionKind::Click => self.run_interaction(record, Interaction::Click).await?,
                ActionKind::ScrollTo => {
                    self.run_interaction(record, Interaction::Scroll).await?
                }
                ActionKind::ScrollToAndWait => self.run_wait(record).await?,
            }
        }
        Ok(results)
    }

    /// Build the action's selector subtree, resolve it against the page, and
    /// extract its data.
    async fn run_extraction(
        &self,
        record: &ActionRecord,
    ) -> Result<BTreeMap<String, Value>, ScrapeError> {
        let nodes = tree::subtree_for(self.store, &record.selector_id).await?;
        let handles = resolve::resolve_tree(self.driver, &nodes, Scope::Page).await?;
        extract::extract_tree(self.driver, &handles).await
    }

    /// Apply an interaction primitive to the action's resolved element(s).
    /// An array resolution applies the primitive to every element in order;
    /// a failing primitive aborts the run.
    async fn run_interaction(
        &self,
        record: &ActionRecord,
        interaction: Interaction,
    ) -> Result<(), ScrapeError> {
        let Some((_, handles)) = self.primary(record).await? else {
            return Ok(());
        };
        match handles {
            Handles::Many(list) => {
                for handle in list {
                    self.apply(interaction, handle).await?;
                }
            }
            Handles::One(Some(handle)) => self.apply(interaction, handle).await?,
            Handles::One(None) => {
                warn!(action = %record.name, "selector matched nothing, skipping");
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        interaction: Interaction,
        handle: crate::driver::HandleId,
    ) -> Result<(), ScrapeError> {
        match interaction {
            Interaction::Click => action::click(self.driver, handle).await,
            Interaction::Scroll => action::scroll_to(self.driver, handle).await,
        }
    }

    /// Run the convergence wait. A multi-element primary is reported and
    /// skipped; the outcome of the wait is logged, not returned.
    async fn run_wait(&self, record: &ActionRecord) -> Result<(), ScrapeError> {
        let Some((selector, handles)) = self.primary(record).await? else {
            return Ok(());
        };

        let primary = match action::single_target(&record.name, &handles) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                warn!(action = %record.name, "selector matched nothing, skipping");
                return Ok(());
            }
            Err(e @ ScrapeError::MultiElementTarget(_)) => {
                warn!(action = %record.name, "{e}, skipping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let target = match (&record.timeout_type, &record.object_id) {
            (Some(kind), Some(object_id)) if kind == "count" => self
                .store
                .selector_by_id(object_id)
                .await
                .map_err(ScrapeError::store)?,
            _ => None,
        };

        let params = WaitParams {
            timeout_ms: record.timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
            target: target.as_ref(),
        };
        let converged = action::scroll_until_converged(
            self.driver,
            primary,
            &selector.extract_rule(),
            &params,
        )
        .await?;

        if converged {
            info!(action = %record.name, "converged");
        } else {
            warn!(action = %record.name, "gave up waiting for convergence");
        }
        Ok(())
    }

    /// Resolve the action's own selector record directly against the page.
    /// An unknown `selector_id` is a skip, not an error.
    async fn primary(
        &self,
        record: &ActionRecord,
    ) -> Result<Option<(SelectorRecord, Handles)>, ScrapeError> {
        let Some(selector) = self
            .store
            .selector_by_id(&record.selector_id)
            .await
            .map_err(ScrapeError::store)?
        else {
            warn!(
                action = %record.name,
                selector_id = %record.selector_id,
                "unknown selector id, skipping"
            );
            return Ok(None);
        };

        let handles = match selector.selector.as_deref() {
            None => Handles::One(None),
            Some(css) if selector.array => Handles::Many(
                self.driver
                    .query_all(Scope::Page, css)
                    .await
                    .map_err(ScrapeError::driver)?,
            ),
            Some(css) => Handles::One(
                self.driver
                    .query(Scope::Page, css)
                    .await
                    .map_err(ScrapeError::driver)?,
            ),
        };
        Ok(Some((selector, handles)))
    }
}
