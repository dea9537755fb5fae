//! Plan editor.
//!
//! Plans are edited as detached drafts and only reach the store on
//! [`save_plan`]. Deleting a plan also deletes every progress entry logged
//! against it, in the same write.

use tracing::info;

use crate::catalog::{self, Technique};
use crate::error::{Error, Result};
use crate::model::{generate_id, PartialUpdate, Plan, UserData};
use crate::tracker::Tracker;

/// Name given to newly created plans.
pub const DEFAULT_PLAN_NAME: &str = "New Practice Plan";

impl Plan {
    /// A new, unsaved plan with a generated id and no techniques.
    #[must_use]
    pub fn draft() -> Self {
        Self {
            id: generate_id("plan"),
            plan_name: DEFAULT_PLAN_NAME.to_string(),
            technique_ids: Vec::new(),
        }
    }

    /// Append a technique unless it is already in the plan.
    ///
    /// Returns `true` if the technique was added.
    pub fn add_technique(&mut self, technique_id: &str) -> bool {
        if self.contains(technique_id) {
            false
        } else {
            self.technique_ids.push(technique_id.to_string());
            true
        }
    }

    /// Remove a technique. Returns `true` if it was present.
    pub fn remove_technique(&mut self, technique_id: &str) -> bool {
        let before = self.technique_ids.len();
        self.technique_ids.retain(|id| id != technique_id);
        self.technique_ids.len() != before
    }

    /// Rename the plan.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.plan_name = name.into();
    }

    /// True when the technique is part of the plan.
    #[must_use]
    pub fn contains(&self, technique_id: &str) -> bool {
        self.technique_ids.iter().any(|id| id == technique_id)
    }
}

/// The plan's techniques resolved through the catalog, in plan order.
///
/// Ids missing from the catalog are skipped.
pub fn plan_techniques(plan: &Plan) -> impl Iterator<Item = &'static Technique> + '_ {
    plan.technique_ids
        .iter()
        .filter_map(|id| catalog::technique(id))
}

/// Find a plan by id, falling back to an exact name match.
///
/// # Errors
///
/// Returns `PlanNotFound` if nothing matches.
pub fn find_plan<'a>(data: &'a UserData, key: &str) -> Result<&'a Plan> {
    data.plan(key)
        .or_else(|| data.plans.iter().find(|p| p.plan_name == key))
        .ok_or_else(|| Error::PlanNotFound {
            plan: key.to_string(),
        })
}

/// Insert a plan, or replace the plan with the same id in place.
#[must_use]
pub fn upsert_plan(plans: &[Plan], plan: Plan) -> Vec<Plan> {
    let mut plans = plans.to_vec();
    match plans.iter_mut().find(|p| p.id == plan.id) {
        Some(existing) => *existing = plan,
        None => plans.push(plan),
    }
    plans
}

/// The update that deletes a plan and every entry logged against it.
#[must_use]
pub fn delete_plan_update(data: &UserData, plan_id: &str) -> PartialUpdate {
    let plans = data
        .plans
        .iter()
        .filter(|p| p.id != plan_id)
        .cloned()
        .collect();
    let progress = data
        .progress
        .iter()
        .filter(|e| e.plan_id != plan_id)
        .cloned()
        .collect();
    PartialUpdate::plans(plans).with_progress(progress)
}

/// Save a plan into the user's document.
///
/// # Errors
///
/// Returns `StoreUnavailable` if the write fails.
pub async fn save_plan(tracker: &mut Tracker, plan: Plan) -> Result<()> {
    info!(plan_id = %plan.id, name = %plan.plan_name, "Saving plan");
    let plans = upsert_plan(&tracker.data().plans, plan);
    tracker.apply(PartialUpdate::plans(plans)).await
}

/// Delete a plan and its progress entries. The caller confirms with the user.
///
/// # Errors
///
/// Returns `StoreUnavailable` if the write fails.
pub async fn delete_plan(tracker: &mut Tracker, plan_id: &str) -> Result<()> {
    let update = delete_plan_update(tracker.data(), plan_id);
    let removed_entries =
        tracker.data().progress.len() - update.progress.as_ref().map_or(0, Vec::len);
    info!(plan_id, removed_entries, "Deleting plan");
    tracker.apply(update).await
}
