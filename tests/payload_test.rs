mod helpers;

use aa_sandbox::consent::{approve_consent, create_consent};
use aa_sandbox::model::{Consent, DateRange, FiType};
use aa_sandbox::payload::generate;
use chrono::{Duration, Utc};
use helpers::{ts, ConsentRequestBuilder, TestDb};
use serde_json::json;

async fn consent_with(db: &TestDb, accounts: &[&str]) -> Consent {
    let consent = create_consent(
        db.store(),
        &ConsentRequestBuilder::new("CUST001")
            .fi_types(&["DEPOSIT", "TERM_DEPOSIT", "MUTUAL_FUNDS"])
            .build(),
        Utc::now(),
    )
    .await
    .unwrap();
    if accounts.is_empty() {
        return consent;
    }
    let accounts: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
    approve_consent(db.store(), &consent.consent_id, &accounts, Utc::now())
        .await
        .unwrap()
}

fn year_2024() -> DateRange {
    DateRange {
        from: ts(2024, 1, 1),
        to: ts(2024, 12, 31),
    }
}

#[tokio::test]
async fn test_bundles_follow_first_encounter_order() {
    let db = TestDb::seeded().await;
    let consent = consent_with(&db, &["ACC002", "ACC001", "ACC003", "ACC004"]).await;

    let bundles = generate(db.store(), &consent, &year_2024()).await.unwrap();

    let fips: Vec<&str> = bundles.iter().map(|b| b.fip_id.as_str()).collect();
    assert_eq!(fips, vec!["ICICI_BANK", "HDFC_BANK", "SBI_MF"]);

    let hdfc: Vec<&str> = bundles[1]
        .data
        .iter()
        .map(|a| a.link_ref_number.as_str())
        .collect();
    assert_eq!(hdfc, vec!["link-acc001", "link-acc004"]);
    assert_eq!(bundles[1].data[1].decrypted_fi.fi_type, FiType::TermDeposit);
    assert!(bundles[1].data[1].decrypted_fi.data.is_empty());
}

#[tokio::test]
async fn test_unlinked_consent_yields_empty_payload() {
    let db = TestDb::seeded().await;
    let consent = consent_with(&db, &[]).await;

    let bundles = generate(db.store(), &consent, &year_2024()).await.unwrap();
    assert!(bundles.is_empty());
}

#[tokio::test]
async fn test_records_newest_first_with_inclusive_bounds() {
    let db = TestDb::seeded().await;
    let consent = consent_with(&db, &["ACC001"]).await;

    let bundles = generate(db.store(), &consent, &year_2024()).await.unwrap();
    let dates: Vec<&str> = bundles[0].data[0]
        .decrypted_fi
        .data
        .iter()
        .map(|r| r["transactionDate"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        vec![
            "2024-12-31T00:00:00.000Z",
            "2024-07-20T00:00:00.000Z",
            "2024-03-10T00:00:00.000Z",
            "2024-01-01T00:00:00.000Z",
        ]
    );

    // shrink the window by one millisecond on each side
    let narrow = DateRange {
        from: ts(2024, 1, 1) + Duration::milliseconds(1),
        to: ts(2024, 12, 31) - Duration::milliseconds(1),
    };
    let bundles = generate(db.store(), &consent, &narrow).await.unwrap();
    assert_eq!(bundles[0].data[0].decrypted_fi.data.len(), 2);
}

#[tokio::test]
async fn test_account_without_records_in_window_still_listed() {
    let db = TestDb::seeded().await;
    let consent = consent_with(&db, &["ACC002"]).await;

    let window = DateRange {
        from: ts(2023, 1, 1),
        to: ts(2023, 12, 31),
    };
    let bundles = generate(db.store(), &consent, &window).await.unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].fip_id, "ICICI_BANK");
    assert!(bundles[0].data[0].decrypted_fi.data.is_empty());
}

#[tokio::test]
async fn test_instrument_detail_is_flattened() {
    let db = TestDb::seeded().await;
    let consent = consent_with(&db, &["ACC003"]).await;

    let bundles = generate(db.store(), &consent, &year_2024()).await.unwrap();
    let value = serde_json::to_value(&bundles).unwrap();
    assert_eq!(
        value,
        json!([{
            "fipID": "SBI_MF",
            "data": [{
                "linkRefNumber": "link-acc003",
                "maskedAccNumber": "FOLIO-9012",
                "decryptedFI": {
                    "fiType": "MUTUAL_FUNDS",
                    "data": [{
                        "units": 42.137,
                        "nav": 237.31,
                        "transactionDate": "2024-08-01T00:00:00.000Z",
                        "amount": 10000.0,
                        "type": "DEBIT"
                    }]
                }
            }]
        }])
    );
}
