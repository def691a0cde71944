pub mod builders;
pub mod db;

pub use builders::{AccountBuilder, ConsentRequestBuilder, RecordBuilder};
pub use db::{seed_reference_data, ts, TestDb};
