pub mod airtable;
pub mod cache;
pub mod diary;
