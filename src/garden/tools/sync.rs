use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::garden::tools::catalogue;
use crate::garden::tools::config::SyncConfig;
use crate::garden::tools::error::Result;
use crate::garden::tools::fetch::{self, RemoteIndex};
use crate::garden::tools::io::airtable::TableClient;
use crate::garden::tools::io::{cache, diary};
use crate::garden::tools::model::RemoteRecord;
use crate::garden::tools::reconcile::{self, ApplyReport, PlanSummary, Throttle};
use crate::garden::tools::tag::DecodePolicy;

/// Phase of a sync run. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Fetching,
    Diffing,
    Applying,
    Done,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::NotStarted => "not started",
            RunState::Fetching => "fetching",
            RunState::Diffing => "diffing",
            RunState::Applying => "applying",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one run.
#[derive(Debug)]
pub struct SyncRun {
    name: &'static str,
    state: RunState,
}

impl SyncRun {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) {
        info!(run = self.name, from = %self.state, to = %next, "run state changed");
        self.state = next;
    }

    /// Runs one phase; a failure moves the run to `Aborted`.
    pub fn phase<T>(&mut self, next: RunState, work: impl FnOnce() -> Result<T>) -> Result<T> {
        self.advance(next);
        work().inspect_err(|failure| {
            error!(run = self.name, phase = %next, error = %failure, "run aborted");
            self.state = RunState::Aborted;
        })
    }
}

/// Per-invocation choices made by the caller.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Plan and log only.
    pub dry_run: bool,
    /// Read the remote snapshot from this cache file instead of fetching it.
    /// Such runs never write.
    pub from_cache: Option<PathBuf>,
    /// Persist the fetched remote snapshot to this file.
    pub write_cache: Option<PathBuf>,
    /// Overrides the configured diary location.
    pub diary_path: Option<PathBuf>,
    /// Overrides the configured decode policy.
    pub decode_policy: Option<DecodePolicy>,
}

impl RunOptions {
    fn read_only(&self) -> bool {
        self.dry_run || self.from_cache.is_some()
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub state: RunState,
    pub plan: PlanSummary,
    pub applied: ApplyReport,
    /// True when the plan was computed but not applied.
    pub read_only: bool,
}

/// Reconciles the garden plants table with the diary.
#[instrument(level = "info", skip_all, fields(table = %config.airtable.table_name.garden_plants))]
pub fn sync_garden_plants(
    config: &SyncConfig,
    options: &RunOptions,
    client: &dyn TableClient,
) -> Result<SyncSummary> {
    let table = config.airtable.table_name.garden_plants.as_str();
    let policy = options.decode_policy.unwrap_or(config.sync.decode_policy);
    let diary_path = options
        .diary_path
        .as_deref()
        .unwrap_or(config.sync.diary_path.as_path());

    let mut run = SyncRun::new("garden_plants");

    let (snapshot, records) = run.phase(RunState::Fetching, || {
        let snapshot = diary::load_snapshot(diary_path)?;
        Ok((snapshot, remote_records(client, table, options)?))
    })?;

    let plan = run.phase(RunState::Diffing, || {
        let desired = diary::build_desired(&snapshot, policy)?;
        let current = RemoteIndex::from_records(records);
        Ok(reconcile::plan(&desired, &current, &config.sync.field_set))
    })?;

    if options.read_only() {
        for action in plan.actions() {
            info!(action = action.verb(), target = %action.target(), "planned");
        }
        run.advance(RunState::Done);
        return Ok(SyncSummary {
            state: run.state(),
            plan: plan.summary(),
            applied: ApplyReport::default(),
            read_only: true,
        });
    }

    let mut throttle = Throttle::new(config.write_delay()?);
    let applied = run.phase(RunState::Applying, || {
        reconcile::apply(&plan, client, table, &mut throttle)
    })?;
    run.advance(RunState::Done);

    Ok(SyncSummary {
        state: run.state(),
        plan: plan.summary(),
        applied,
        read_only: false,
    })
}

/// Adds plant names missing from the catalogue table.
#[instrument(level = "info", skip_all)]
pub fn sync_catalogue(
    config: &SyncConfig,
    options: &RunOptions,
    client: &dyn TableClient,
) -> Result<SyncSummary> {
    let table = config.plants_table()?;
    let policy = options.decode_policy.unwrap_or(config.sync.decode_policy);
    let diary_path = options
        .diary_path
        .as_deref()
        .unwrap_or(config.sync.diary_path.as_path());

    let mut run = SyncRun::new("catalogue");
    let (snapshot, records) = run.phase(RunState::Fetching, || {
        let snapshot = diary::load_snapshot(diary_path)?;
        Ok((snapshot, remote_records(client, table, options)?))
    })?;

    let (desired, missing) = run.phase(RunState::Diffing, || {
        let desired = catalogue::desired_entries(&snapshot.plant_tags, policy)?;
        let missing = catalogue::plan_catalogue(&desired, &records);
        Ok((desired.len(), missing))
    })?;
    let plan = PlanSummary {
        creates: missing.len(),
        unchanged: desired - missing.len(),
        ..PlanSummary::default()
    };

    if options.read_only() {
        for entry in &missing {
            info!(name = %entry.name, "planned catalogue entry");
        }
        run.advance(RunState::Done);
        return Ok(SyncSummary {
            state: run.state(),
            plan,
            applied: ApplyReport::default(),
            read_only: true,
        });
    }

    let mut throttle = Throttle::new(config.write_delay()?);
    let applied = run.phase(RunState::Applying, || {
        catalogue::apply_catalogue(&missing, client, table, &mut throttle)
    })?;
    run.advance(RunState::Done);

    Ok(SyncSummary {
        state: run.state(),
        plan,
        applied,
        read_only: false,
    })
}

fn remote_records(
    client: &dyn TableClient,
    table: &str,
    options: &RunOptions,
) -> Result<Vec<RemoteRecord>> {
    if let Some(path) = &options.from_cache {
        warn!(path = %path.display(), "using cached remote snapshot; no writes will be made");
        return cache::read_snapshot(path);
    }
    let records = fetch::fetch_snapshot(client, table)?;
    if let Some(path) = &options.write_cache {
        cache::write_snapshot(path, &records)?;
    }
    Ok(records)
}
