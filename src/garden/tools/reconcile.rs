//! Diffing of the desired specimens against the remote table and application
//! of the resulting plan.
//!
//! The plan is a full-state comparison: it carries no memory of earlier runs,
//! so applying it and planning again against the new remote state yields an
//! empty plan.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::fetch::RemoteIndex;
use crate::garden::tools::io::airtable::{TableClient, WriteResponse};
use crate::garden::tools::model::{
    Field, FieldSet, Fields, PlantRecord, RemoteRecord, SpecimenKey,
};

/// Why a remote record is scheduled for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// The specimen is no longer in the diary, or is dead.
    Extra,
    /// The record has no usable `Plant ID` or `Number`.
    Malformed,
    /// Another record already represents the same specimen.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Create {
    pub key: SpecimenKey,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub key: SpecimenKey,
    pub record_id: String,
    /// Compared fields that were absent or different remotely.
    pub changed: Vec<Field>,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delete {
    pub record_id: String,
    pub key: Option<SpecimenKey>,
    pub reason: DeleteReason,
}

/// The outcome chosen for one specimen key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update,
    Delete,
    Unchanged,
}

/// A single remote write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action<'a> {
    Delete(&'a Delete),
    Create(&'a Create),
    Update(&'a Update),
}

impl Action<'_> {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Delete(_) => "delete",
            Action::Create(_) => "create",
            Action::Update(_) => "update",
        }
    }

    /// Human readable target, used in logs and errors.
    pub fn target(&self) -> String {
        match self {
            Action::Delete(delete) => match &delete.key {
                Some(key) => format!("{key} ({})", delete.record_id),
                None => delete.record_id.clone(),
            },
            Action::Create(create) => create.key.to_string(),
            Action::Update(update) => format!("{} ({})", update.key, update.record_id),
        }
    }
}

/// Writes needed to bring the remote table in line with the diary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub creates: Vec<Create>,
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
    pub unchanged: Vec<SpecimenKey>,
    /// Keys represented by more than one remote record.
    pub duplicates: Vec<SpecimenKey>,
}

impl Plan {
    /// True when no write is needed.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Number of remote writes the plan issues.
    pub fn write_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    /// Outcome for a key. Surplus duplicate deletions do not count: a key
    /// that is also kept, updated or created reports that decision.
    pub fn decision_for(&self, key: &SpecimenKey) -> Option<Decision> {
        if self.creates.iter().any(|create| &create.key == key) {
            return Some(Decision::Create);
        }
        if self.updates.iter().any(|update| &update.key == key) {
            return Some(Decision::Update);
        }
        if self.unchanged.contains(key) {
            return Some(Decision::Unchanged);
        }
        self.deletes
            .iter()
            .any(|delete| delete.key.as_ref() == Some(key))
            .then_some(Decision::Delete)
    }

    /// Keys whose every remote record is deleted, each listed once.
    pub fn deleted_keys(&self) -> Vec<SpecimenKey> {
        let mut seen = BTreeSet::new();
        self.deletes
            .iter()
            .filter(|delete| delete.reason == DeleteReason::Extra)
            .filter_map(|delete| delete.key.clone())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    /// Writes in apply order: deletes, creates, then updates.
    pub fn actions(&self) -> impl Iterator<Item = Action<'_>> {
        self.deletes
            .iter()
            .map(Action::Delete)
            .chain(self.creates.iter().map(Action::Create))
            .chain(self.updates.iter().map(Action::Update))
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            creates: self.creates.len(),
            updates: self.updates.len(),
            deletes: self.deletes.len(),
            unchanged: self.unchanged.len(),
            duplicates: self.duplicates.len(),
        }
    }
}

/// Counts of a [`Plan`], for logging and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub unchanged: usize,
    pub duplicates: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.creates, self.updates, self.deletes, self.unchanged
        )
    }
}

/// Compares the desired specimens with the remote index.
#[instrument(level = "info", skip_all, fields(desired = desired.len(), current = current.len()))]
pub fn plan(
    desired: &BTreeMap<SpecimenKey, PlantRecord>,
    current: &RemoteIndex,
    field_set: &FieldSet,
) -> Plan {
    let mut plan = Plan::default();
    let mut scheduled: BTreeSet<String> = BTreeSet::new();

    for record in current.malformed() {
        schedule_delete(&mut plan, &mut scheduled, record, None, DeleteReason::Malformed);
    }

    let keys: BTreeSet<SpecimenKey> = desired.keys().cloned().chain(current.keys()).collect();

    for key in keys {
        let remote = current.get(&key).unwrap_or_default();

        let Some(wanted) = desired.get(&key) else {
            if remote.len() > 1 {
                warn!(%key, records = remote.len(), "specimen has duplicate remote records");
                plan.duplicates.push(key.clone());
            }
            for record in remote {
                schedule_delete(&mut plan, &mut scheduled, record, Some(&key), DeleteReason::Extra);
            }
            continue;
        };

        let Some((primary, surplus)) = remote.split_first() else {
            plan.creates.push(Create {
                key,
                fields: wanted.create_fields(field_set),
            });
            continue;
        };

        if !surplus.is_empty() {
            warn!(%key, records = remote.len(), "specimen has duplicate remote records");
            plan.duplicates.push(key.clone());
            for record in surplus {
                if record.id != primary.id {
                    schedule_delete(
                        &mut plan,
                        &mut scheduled,
                        record,
                        Some(&key),
                        DeleteReason::Duplicate,
                    );
                }
            }
        }

        let changed = changed_fields(wanted, primary, field_set);
        if changed.is_empty() {
            plan.unchanged.push(key);
        } else {
            plan.updates.push(Update {
                key,
                record_id: primary.id.clone(),
                changed,
                fields: wanted.update_fields(field_set),
            });
        }
    }

    info!(summary = %plan.summary(), "plan computed");
    plan
}

/// Compared fields that are absent remotely or differ by value. A blank
/// desired value matches an absent or blank remote value.
pub fn changed_fields(
    wanted: &PlantRecord,
    remote: &RemoteRecord,
    field_set: &FieldSet,
) -> Vec<Field> {
    field_set
        .compared
        .iter()
        .copied()
        .filter(|field| {
            let desired = wanted.value(*field);
            match remote.field(field.column()) {
                Some(actual) if actual.is_blank() => !desired.is_blank(),
                Some(actual) => !actual.same_value(&desired),
                None => !desired.is_blank(),
            }
        })
        .collect()
}

fn schedule_delete(
    plan: &mut Plan,
    scheduled: &mut BTreeSet<String>,
    record: &RemoteRecord,
    key: Option<&SpecimenKey>,
    reason: DeleteReason,
) {
    if !scheduled.insert(record.id.clone()) {
        warn!(record_id = %record.id, "remote id listed more than once");
        return;
    }
    plan.deletes.push(Delete {
        record_id: record.id.clone(),
        key: key.cloned(),
        reason,
    });
}

/// Keeps consecutive writes at least `min_interval` apart.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_write: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_write: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until the next write may be issued, then records it.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_write {
            let remaining = self.min_interval.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        self.last_write = Some(Instant::now());
    }
}

/// Writes carried out by [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Issues the plan's writes one at a time. The first failing write aborts;
/// writes already made stay in place, and a rerun converges.
#[instrument(level = "info", skip(plan, client, throttle), fields(writes = plan.write_count()))]
pub fn apply(
    plan: &Plan,
    client: &dyn TableClient,
    table: &str,
    throttle: &mut Throttle,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for action in plan.actions() {
        throttle.wait();
        info!(action = action.verb(), target = %action.target(), "writing");
        let response = match action {
            Action::Delete(delete) => client.delete(table, &delete.record_id),
            Action::Create(create) => client.create(table, &create.fields),
            Action::Update(update) => client.update(table, &update.record_id, &update.fields),
        };
        check_write(action.verb(), &action.target(), response)?;

        match action {
            Action::Delete(_) => report.deleted += 1,
            Action::Create(_) => report.created += 1,
            Action::Update(_) => report.updated += 1,
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "plan applied"
    );
    Ok(report)
}

/// Turns a write response carrying an error payload into a [`ToolError::Write`].
pub(crate) fn check_write(verb: &str, target: &str, response: Result<WriteResponse>) -> Result<()> {
    let response = response.map_err(|error| ToolError::Write {
        action: verb.to_string(),
        record: target.to_string(),
        message: error.to_string(),
    })?;
    match response.error_message() {
        Some(message) => Err(ToolError::Write {
            action: verb.to_string(),
            record: target.to_string(),
            message,
        }),
        None => Ok(()),
    }
}
