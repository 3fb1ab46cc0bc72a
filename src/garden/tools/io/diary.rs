use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::model::{PlantRecord, SpecimenKey};
use crate::garden::tools::tag::{self, DecodePolicy, TagStyle};

/// One specimen entry of the diary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Key into [`GardenSnapshot::location_tags`].
    pub location: String,
    #[serde(default)]
    pub alive: bool,
    #[serde(default)]
    pub timeline: Value,
}

/// Local gardening diary as exported to JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GardenSnapshot {
    /// plant id → sequence number → entry.
    #[serde(default)]
    pub diary: BTreeMap<String, BTreeMap<String, DiaryEntry>>,
    /// plant id → name tag.
    #[serde(default)]
    pub plant_tags: BTreeMap<String, String>,
    /// location key → location tag.
    #[serde(default)]
    pub location_tags: BTreeMap<String, String>,
}

/// Reads the diary snapshot from disk.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn load_snapshot(path: &Path) -> Result<GardenSnapshot> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let source = fs::read_to_string(path)?;
    let snapshot: GardenSnapshot = serde_json::from_str(&source)?;
    debug!(
        plants = snapshot.diary.len(),
        names = snapshot.plant_tags.len(),
        locations = snapshot.location_tags.len(),
        "diary snapshot loaded"
    );
    Ok(snapshot)
}

/// Builds the desired set: one record per living specimen. Sequence numbers
/// that normalise to the same key (`"1"` and `"1.0"`) keep the first entry in
/// diary order; the others are logged and dropped.
pub fn build_desired(
    snapshot: &GardenSnapshot,
    policy: DecodePolicy,
) -> Result<BTreeMap<SpecimenKey, PlantRecord>> {
    let mut desired = BTreeMap::new();

    for (plant_id, specimens) in &snapshot.diary {
        let Some((name, variety)) = policy.resolve(plant_name(snapshot, plant_id))? else {
            continue;
        };

        for (number, entry) in specimens {
            if !entry.alive {
                continue;
            }
            let Some(location) = policy.resolve(location_label(snapshot, &entry.location))?
            else {
                continue;
            };

            let key = SpecimenKey::new(plant_id.as_str(), number);
            if desired.contains_key(&key) {
                warn!(
                    %key,
                    diary_number = %number,
                    "diary entry collides with an earlier one, dropped"
                );
                continue;
            }
            let record = PlantRecord {
                plant_id: plant_id.clone(),
                number: key.number.clone(),
                name: name.clone(),
                variety: variety.clone(),
                location,
                alive: entry.alive,
            };
            desired.insert(key, record);
        }
    }

    info!(specimens = desired.len(), "desired set built from diary");
    Ok(desired)
}

fn plant_name(snapshot: &GardenSnapshot, plant_id: &str) -> Result<(String, String)> {
    let raw = snapshot
        .plant_tags
        .get(plant_id)
        .ok_or_else(|| ToolError::decode(plant_id, "no name tag for plant"))?;
    tag::decode_name_tag(raw, TagStyle::VARIETY)
}

fn location_label(snapshot: &GardenSnapshot, key: &str) -> Result<String> {
    let raw = snapshot
        .location_tags
        .get(key)
        .ok_or_else(|| ToolError::decode(key, "no location tag for key"))?;
    tag::decode_location_tag(raw, TagStyle::VARIETY)
}
