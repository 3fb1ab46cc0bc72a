//! Plant name catalogue: one record per plant name, holding its common name.
//!
//! Name tags of the form `#Name "Common name"` describe catalogue entries.
//! The catalogue only grows: names missing remotely are created, nothing is
//! updated or removed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, instrument};

use crate::garden::tools::error::Result;
use crate::garden::tools::io::airtable::TableClient;
use crate::garden::tools::model::{FieldValue, Fields, RemoteRecord};
use crate::garden::tools::reconcile::{ApplyReport, Throttle, check_write};
use crate::garden::tools::tag::{self, DecodePolicy, TagStyle};

pub const NAME_COLUMN: &str = "Name";
pub const COMMON_NAME_COLUMN: &str = "Common Name";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CatalogueEntry {
    pub name: String,
    pub common_name: String,
}

impl CatalogueEntry {
    pub fn fields(&self) -> Fields {
        Fields::from([
            (NAME_COLUMN.to_string(), FieldValue::Text(self.name.clone())),
            (
                COMMON_NAME_COLUMN.to_string(),
                FieldValue::Text(self.common_name.clone()),
            ),
        ])
    }
}

/// Entries described by the name tags. Tags without a quoted common name
/// are not catalogue entries and are ignored.
pub fn desired_entries(
    plant_tags: &BTreeMap<String, String>,
    policy: DecodePolicy,
) -> Result<BTreeMap<String, CatalogueEntry>> {
    let style = TagStyle::COMMON_NAME;
    let mut entries = BTreeMap::new();

    for raw in plant_tags.values() {
        if !style.is_qualified(raw) {
            continue;
        }
        let Some((name, common_name)) = policy.resolve(tag::decode_name_tag(raw, style))? else {
            continue;
        };
        entries.insert(name.clone(), CatalogueEntry { name, common_name });
    }
    Ok(entries)
}

/// Entries whose name is not yet present remotely.
#[instrument(level = "info", skip_all, fields(desired = desired.len(), current = current.len()))]
pub fn plan_catalogue(
    desired: &BTreeMap<String, CatalogueEntry>,
    current: &[RemoteRecord],
) -> Vec<CatalogueEntry> {
    let known: BTreeSet<String> = current
        .iter()
        .filter_map(|record| record.text(NAME_COLUMN))
        .collect();

    let missing: Vec<CatalogueEntry> = desired
        .values()
        .filter(|entry| !known.contains(&entry.name))
        .cloned()
        .collect();
    info!(missing = missing.len(), "catalogue plan computed");
    missing
}

/// Creates the missing entries one at a time.
#[instrument(level = "info", skip(missing, client, throttle), fields(writes = missing.len()))]
pub fn apply_catalogue(
    missing: &[CatalogueEntry],
    client: &dyn TableClient,
    table: &str,
    throttle: &mut Throttle,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    for entry in missing {
        throttle.wait();
        info!(name = %entry.name, "adding catalogue entry");
        check_write("create", &entry.name, client.create(table, &entry.fields()))?;
        report.created += 1;
    }
    Ok(report)
}
