#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use garden_tools::Result;
use garden_tools::io::airtable::{ListPage, TableClient, WriteResponse};
use garden_tools::model::{Fields, RemoteRecord};
use serde_json::{Value, json};

/// One call received by [`MemoryTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(Option<String>),
    Create(Fields),
    Update(String, Fields),
    Delete(String),
}

/// In-memory stand-in for the remote table service.
pub struct MemoryTable {
    pub records: RefCell<Vec<RemoteRecord>>,
    pub calls: RefCell<Vec<Call>>,
    page_size: usize,
    next_id: Cell<usize>,
    /// Writes (0-based) that answer with an error payload.
    fail_write: Option<usize>,
    writes: Cell<usize>,
    list_error: Option<Value>,
}

impl MemoryTable {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records: RefCell::new(records),
            calls: RefCell::new(Vec::new()),
            page_size: 100,
            next_id: Cell::new(1),
            fail_write: None,
            writes: Cell::new(0),
            list_error: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn failing_write(mut self, index: usize) -> Self {
        self.fail_write = Some(index);
        self
    }

    pub fn failing_list(mut self, error: Value) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn snapshot(&self) -> Vec<RemoteRecord> {
        self.records.borrow().clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| !matches!(call, Call::List(_)))
            .cloned()
            .collect()
    }

    fn next_write_fails(&self) -> bool {
        let index = self.writes.get();
        self.writes.set(index + 1);
        self.fail_write == Some(index)
    }

    fn error_payload() -> WriteResponse {
        WriteResponse(json!({
            "error": { "type": "INVALID_REQUEST", "message": "rejected by test table" }
        }))
    }
}

fn to_json(fields: &Fields) -> BTreeMap<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::to_value(value).expect("field value")))
        .collect()
}

impl TableClient for MemoryTable {
    fn list(&self, _table: &str, offset: Option<&str>) -> Result<ListPage> {
        self.calls
            .borrow_mut()
            .push(Call::List(offset.map(str::to_string)));
        if let Some(error) = &self.list_error {
            return Ok(ListPage {
                error: Some(error.clone()),
                ..ListPage::default()
            });
        }

        let start: usize = offset.map(|o| o.parse().expect("numeric offset")).unwrap_or(0);
        let records = self.records.borrow();
        let end = (start + self.page_size).min(records.len());
        Ok(ListPage {
            records: records[start..end].to_vec(),
            offset: (end < records.len()).then(|| end.to_string()),
            error: None,
        })
    }

    fn create(&self, _table: &str, fields: &Fields) -> Result<WriteResponse> {
        self.calls.borrow_mut().push(Call::Create(fields.clone()));
        if self.next_write_fails() {
            return Ok(Self::error_payload());
        }
        let id = format!("recNEW{}", self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        let record = RemoteRecord {
            id,
            fields: to_json(fields),
            created_time: None,
        };
        self.records.borrow_mut().push(record.clone());
        Ok(WriteResponse(serde_json::to_value(record).expect("record")))
    }

    fn update(&self, _table: &str, record_id: &str, fields: &Fields) -> Result<WriteResponse> {
        self.calls
            .borrow_mut()
            .push(Call::Update(record_id.to_string(), fields.clone()));
        if self.next_write_fails() {
            return Ok(Self::error_payload());
        }
        let mut records = self.records.borrow_mut();
        let Some(record) = records.iter_mut().find(|record| record.id == record_id) else {
            return Ok(WriteResponse(json!({ "error": "NOT_FOUND" })));
        };
        for (column, value) in to_json(fields) {
            record.fields.insert(column, value);
        }
        Ok(WriteResponse(serde_json::to_value(&*record).expect("record")))
    }

    fn delete(&self, _table: &str, record_id: &str) -> Result<WriteResponse> {
        self.calls
            .borrow_mut()
            .push(Call::Delete(record_id.to_string()));
        if self.next_write_fails() {
            return Ok(Self::error_payload());
        }
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|record| record.id != record_id);
        if records.len() == before {
            return Ok(WriteResponse(json!({ "error": "NOT_FOUND" })));
        }
        Ok(WriteResponse(json!({ "deleted": true, "id": record_id })))
    }
}

/// Remote record with the given id and JSON fields.
pub fn remote(id: &str, fields: Value) -> RemoteRecord {
    serde_json::from_value(json!({ "id": id, "fields": fields })).expect("remote record")
}
