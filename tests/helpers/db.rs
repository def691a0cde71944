use std::sync::Arc;

use aa_sandbox::model::{
    Customer, EntityStatus, FiType, Institution, InstitutionType, TxnType,
};
use aa_sandbox::repository::{CustomerRepository, InstitutionRepository, Store};
use aa_sandbox::storage::SqlStore;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tempfile::NamedTempFile;

use super::builders::{AccountBuilder, RecordBuilder};

/// Test database with automatic cleanup
pub struct TestDb {
    store: Arc<SqlStore>,
    _temp_file: NamedTempFile,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        // Create temporary SQLite database file
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let db_url = format!("sqlite://{}?mode=rwc", db_path);

        let connection = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");

        migration::Migrator::up(&connection, None)
            .await
            .expect("Failed to run migrations");

        Self {
            store: Arc::new(SqlStore::new(connection)),
            _temp_file: temp_file,
        }
    }

    /// Fresh database with the reference catalog loaded.
    pub async fn seeded() -> Self {
        let db = Self::new().await;
        seed_reference_data(db.store()).await;
        db
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }

    /// Shared handle for the router and spawned tasks.
    pub fn shared(&self) -> Arc<dyn Store> {
        self.store.clone()
    }
}

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Two customers, four providers (one inactive), their accounts and a year
/// and a half of ledger entries on ACC001.
///
/// CUST001 holds ACC001 (HDFC deposit), ACC002 (ICICI deposit), ACC003
/// (SBI MF mutual funds), ACC004 (HDFC term deposit) and ACC005 (HDFC
/// deposit, inactive). CUST002 holds ACC101 (HDFC deposit).
pub async fn seed_reference_data(store: &SqlStore) {
    for (id, name) in [("CUST001", "Asha Rao"), ("CUST002", "Vikram Mehta")] {
        store
            .insert_customer(&Customer {
                customer_id: id.to_string(),
                name: name.to_string(),
                mobile: "9876543210".to_string(),
                email: Some(format!("{}@example.com", id.to_lowercase())),
                created_at: ts(2023, 1, 1),
            })
            .await
            .expect("Failed to insert customer");
    }

    for (fip_id, name, institution_type, status, fi_types) in [
        (
            "HDFC_BANK",
            "HDFC Bank",
            InstitutionType::Bank,
            EntityStatus::Active,
            vec![FiType::Deposit, FiType::TermDeposit],
        ),
        (
            "ICICI_BANK",
            "ICICI Bank",
            InstitutionType::Bank,
            EntityStatus::Active,
            vec![FiType::Deposit],
        ),
        (
            "SBI_MF",
            "SBI Mutual Fund",
            InstitutionType::MutualFund,
            EntityStatus::Active,
            vec![FiType::MutualFunds, FiType::Sip],
        ),
        (
            "LEGACY_BANK",
            "Legacy Co-operative Bank",
            InstitutionType::Bank,
            EntityStatus::Inactive,
            vec![FiType::Deposit],
        ),
    ] {
        store
            .insert_institution(&Institution {
                fip_id: fip_id.to_string(),
                name: name.to_string(),
                institution_type,
                status,
                fi_types,
            })
            .await
            .expect("Failed to insert institution");
    }

    AccountBuilder::new("ACC001", "CUST001", "HDFC_BANK")
        .masked("XXXXXX1234")
        .create(store)
        .await;
    AccountBuilder::new("ACC002", "CUST001", "ICICI_BANK")
        .masked("XXXXXX5678")
        .create(store)
        .await;
    AccountBuilder::new("ACC003", "CUST001", "SBI_MF")
        .fi_type(FiType::MutualFunds)
        .masked("FOLIO-9012")
        .create(store)
        .await;
    AccountBuilder::new("ACC004", "CUST001", "HDFC_BANK")
        .fi_type(FiType::TermDeposit)
        .create(store)
        .await;
    AccountBuilder::new("ACC005", "CUST001", "HDFC_BANK")
        .inactive()
        .create(store)
        .await;
    AccountBuilder::new("ACC101", "CUST002", "HDFC_BANK")
        .create(store)
        .await;

    for (when, amount, txn_type, narration) in [
        (ts(2023, 6, 15), 50000.0, TxnType::Credit, "SALARY JUN"),
        (ts(2024, 1, 1), 1200.0, TxnType::Debit, "NEW YEAR DINNER"),
        (ts(2024, 3, 10), 2500.0, TxnType::Debit, "UPI/GROCERY"),
        (ts(2024, 7, 20), 52000.0, TxnType::Credit, "SALARY JUL"),
        (ts(2024, 12, 31), 300.0, TxnType::Debit, "ATM FEE"),
        (ts(2025, 1, 5), 999.0, TxnType::Debit, "SUBSCRIPTION"),
    ] {
        RecordBuilder::new("ACC001", when)
            .amount(amount, txn_type)
            .narration(narration)
            .create(store)
            .await;
    }

    RecordBuilder::new("ACC002", ts(2024, 5, 5))
        .amount(7000.0, TxnType::Credit)
        .narration("NEFT/REFUND")
        .create(store)
        .await;
    RecordBuilder::new("ACC003", ts(2024, 8, 1))
        .amount(10000.0, TxnType::Debit)
        .detail("units", serde_json::json!(42.137))
        .detail("nav", serde_json::json!(237.31))
        .create(store)
        .await;
}
