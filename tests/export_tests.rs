mod common;

use chrono::NaiveDate;
use common::{
    BALTI, CHISINAU, ECO_INCOME_TAX, ECO_LOCAL_FEES, admin, iban, iban_request, operator,
    raion_operator, reference_repo,
};
use iban_registry::{
    MemoryRepository,
    export::{self, CSV_HEADER},
    ibans,
    models::{FilterCriteria, IbanRequest, IbanView},
};

async fn seeded_registry() -> MemoryRepository {
    let repo = reference_repo();
    let rows = [
        (1, 2023, ECO_INCOME_TAX, CHISINAU, "0101"),
        (2, 2024, ECO_LOCAL_FEES, CHISINAU, "0120"),
        (3, 2024, ECO_INCOME_TAX, BALTI, "0301"),
        (4, 2024, ECO_LOCAL_FEES, BALTI, "0301"),
    ];
    for (n, year, eco, district, locality) in rows {
        let req = IbanRequest {
            district_code: Some(district.to_string()),
            ..iban_request(&iban(n), year, eco, locality)
        };
        ibans::create(&repo, &admin(), req).await.unwrap();
    }
    repo
}

fn parse_csv(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(bytes);
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

fn expected_row(record: &IbanView) -> Vec<String> {
    vec![
        record.iban_code.clone(),
        record.year.to_string(),
        record.eco_code.clone(),
        record.eco_label.clone(),
        record.locality_name.clone(),
        record.district_name.clone(),
    ]
}

#[tokio::test]
async fn test_export_rows_match_filter_rows() {
    let repo = seeded_registry().await;
    let criteria = FilterCriteria {
        year: Some(2024),
        ..FilterCriteria::default()
    };

    let filtered = ibans::filter(&repo, &operator(), criteria.clone())
        .await
        .unwrap();
    let export = export::export(&repo, &operator(), criteria).await.unwrap();
    let (header, rows) = parse_csv(&export.bytes);

    assert_eq!(header, CSV_HEADER.to_vec());
    let expected: Vec<Vec<String>> = filtered.iter().map(expected_row).collect();
    assert_eq!(rows, expected);
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_export_is_scoped_like_filter() {
    let repo = seeded_registry().await;
    let raion = raion_operator(BALTI);
    let requested = FilterCriteria {
        district_code: Some(CHISINAU.to_string()),
        ..FilterCriteria::default()
    };

    let export = export::export(&repo, &raion, requested).await.unwrap();
    let (_, rows) = parse_csv(&export.bytes);

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row[5] == "Bălți"));
}

#[tokio::test]
async fn test_export_of_nothing_still_has_header() {
    let repo = reference_repo();
    let export = export::export(&repo, &admin(), FilterCriteria::default())
        .await
        .unwrap();

    let text = String::from_utf8(export.bytes).unwrap();
    assert_eq!(text, "Cod IBAN,Anul,Cod Eco,Denumire Eco,Localitate,Raion\n");
}

#[test]
fn test_render_csv_quotes_only_when_needed() {
    let record = IbanView {
        id: 1,
        iban_code: "MD24AGRN0000000000000001".to_string(),
        year: 2024,
        eco_code: ECO_LOCAL_FEES.to_string(),
        eco_label: "Taxa pentru \"salubrizare\", locală".to_string(),
        district_code: CHISINAU.to_string(),
        district_name: "Chișinău".to_string(),
        locality_code: "0101".to_string(),
        locality_name: "Chișinău".to_string(),
    };

    let bytes = export::render_csv(&[record]).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let line = text.lines().nth(1).unwrap();

    assert_eq!(
        line,
        "MD24AGRN0000000000000001,2024,114522,\"Taxa pentru \"\"salubrizare\"\", locală\",Chișinău,Chișinău"
    );
}

#[test]
fn test_export_filename_embeds_date() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    assert_eq!(export::export_filename(date), "registru_ibans_2025-03-07.csv");
}
