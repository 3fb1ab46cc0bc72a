use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::io::airtable::TableClient;
use crate::garden::tools::model::{RemoteRecord, SpecimenKey};

/// Downloads every record of `table`, following continuation offsets until
/// the service stops returning one.
#[instrument(level = "info", skip(client))]
pub fn fetch_snapshot(client: &dyn TableClient, table: &str) -> Result<Vec<RemoteRecord>> {
    info!("downloading remote table");
    let mut records = Vec::new();
    let mut offset: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = client
            .list(table, offset.as_deref())
            .map_err(|error| ToolError::Fetch {
                table: table.to_string(),
                message: error.to_string(),
            })?;
        if let Some(message) = page.error_message() {
            return Err(ToolError::Fetch {
                table: table.to_string(),
                message,
            });
        }

        pages += 1;
        records.extend(page.records);

        match page.offset {
            Some(next) => {
                info!(pages, records = records.len(), "still downloading");
                offset = Some(next);
            }
            None => break,
        }
    }

    info!(pages, records = records.len(), "remote table downloaded");
    Ok(records)
}

/// Remote records grouped by plant id, then by sequence number.
///
/// Records that cannot be placed (no usable `Plant ID` or `Number`) are kept
/// aside as malformed; they are always deleted. Several records sharing one
/// key are kept in fetch order so the duplicates can be surfaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteIndex {
    plants: BTreeMap<String, BTreeMap<String, Vec<RemoteRecord>>>,
    malformed: Vec<RemoteRecord>,
}

impl RemoteIndex {
    pub fn from_records(records: impl IntoIterator<Item = RemoteRecord>) -> Self {
        let mut index = RemoteIndex::default();
        for record in records {
            index.insert(record);
        }
        if !index.malformed.is_empty() {
            warn!(count = index.malformed.len(), "remote records without a usable key");
        }
        index
    }

    /// Places a record under its own key, or among the malformed records.
    pub fn insert(&mut self, record: RemoteRecord) {
        let Some(key) = record.specimen_key() else {
            self.malformed.push(record);
            return;
        };

        if !self.plants.contains_key(&key.plant_id) {
            self.plants.insert(key.plant_id.clone(), BTreeMap::new());
        }
        if let Some(numbers) = self.plants.get_mut(&key.plant_id) {
            match numbers.get_mut(&key.number) {
                Some(existing) => existing.push(record),
                None => {
                    numbers.insert(key.number, vec![record]);
                }
            }
        }
    }

    pub fn get(&self, key: &SpecimenKey) -> Option<&[RemoteRecord]> {
        self.plants
            .get(&key.plant_id)
            .and_then(|numbers| numbers.get(&key.number))
            .map(Vec::as_slice)
    }

    /// Keys in plant id, then number order.
    pub fn keys(&self) -> impl Iterator<Item = SpecimenKey> + '_ {
        self.plants.iter().flat_map(|(plant_id, numbers)| {
            numbers.keys().map(move |number| SpecimenKey {
                plant_id: plant_id.clone(),
                number: number.clone(),
            })
        })
    }

    pub fn malformed(&self) -> &[RemoteRecord] {
        &self.malformed
    }

    /// Number of well-formed records.
    pub fn len(&self) -> usize {
        self.plants
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }
}
