mod common;

use common::{
    BALTI, CHISINAU, ECO_INCOME_TAX, ECO_LOCAL_FEES, admin, caller, iban, iban_request, operator,
    raion_operator, reference_repo,
};
use iban_registry::{
    AppError, MemoryRepository, ibans,
    models::{FilterCriteria, IbanRequest, IbanView, Role},
};

/// Six records over two districts, two years and two eco codes, created in
/// this order (ids 1..=6).
async fn seeded_registry() -> MemoryRepository {
    let repo = reference_repo();
    let admin = admin();
    let rows = [
        (1, 2023, ECO_INCOME_TAX, CHISINAU, "0101"),
        (2, 2024, ECO_INCOME_TAX, CHISINAU, "0101"),
        (3, 2024, ECO_LOCAL_FEES, CHISINAU, "0120"),
        (4, 2023, ECO_INCOME_TAX, BALTI, "0301"),
        (5, 2024, ECO_LOCAL_FEES, BALTI, "0301"),
        (6, 2024, ECO_INCOME_TAX, BALTI, "0120"),
    ];
    for (n, year, eco, district, locality) in rows {
        let req = IbanRequest {
            district_code: Some(district.to_string()),
            ..iban_request(&iban(n), year, eco, locality)
        };
        ibans::create(&repo, &admin, req).await.unwrap();
    }
    repo
}

fn ids(records: &[IbanView]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

fn validation_fields(err: AppError) -> Vec<String> {
    match err {
        AppError::Validation(errors) => errors.fields().map(str::to_string).collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// --- Filter ---

#[tokio::test]
async fn test_filter_without_criteria_returns_everything_in_id_order() {
    let repo = seeded_registry().await;

    for who in [admin(), operator()] {
        let records = ibans::filter(&repo, &who, FilterCriteria::default())
            .await
            .unwrap();
        assert_eq!(ids(&records), vec![1, 2, 3, 4, 5, 6]);
    }
}

#[tokio::test]
async fn test_filter_by_year_returns_exact_subset() {
    let repo = seeded_registry().await;
    let criteria = FilterCriteria {
        year: Some(2023),
        ..FilterCriteria::default()
    };

    let records = ibans::filter(&repo, &operator(), criteria).await.unwrap();

    assert_eq!(ids(&records), vec![1, 4]);
    assert!(records.iter().all(|record| record.year == 2023));
}

#[tokio::test]
async fn test_filter_criteria_are_anded() {
    let repo = seeded_registry().await;
    let criteria = FilterCriteria {
        year: Some(2024),
        eco_code: Some(ECO_INCOME_TAX.to_string()),
        district_code: Some(BALTI.to_string()),
        locality_code: None,
    };

    let records = ibans::filter(&repo, &admin(), criteria).await.unwrap();
    assert_eq!(ids(&records), vec![6]);
}

#[tokio::test]
async fn test_filter_results_carry_display_names() {
    let repo = seeded_registry().await;
    let criteria = FilterCriteria {
        locality_code: Some("0120".to_string()),
        district_code: Some(BALTI.to_string()),
        ..FilterCriteria::default()
    };

    let records = ibans::filter(&repo, &admin(), criteria).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].locality_name, "Elizaveta");
    assert_eq!(records[0].district_name, "Bălți");
    assert_eq!(records[0].eco_label, "Impozit pe venit");
}

#[tokio::test]
async fn test_district_operator_never_sees_other_districts() {
    let repo = seeded_registry().await;
    let raion = raion_operator(CHISINAU);

    let requests = [
        FilterCriteria::default(),
        FilterCriteria {
            district_code: Some(BALTI.to_string()),
            ..FilterCriteria::default()
        },
        FilterCriteria {
            district_code: Some(BALTI.to_string()),
            year: Some(2024),
            ..FilterCriteria::default()
        },
        FilterCriteria {
            locality_code: Some("0301".to_string()),
            ..FilterCriteria::default()
        },
    ];

    for requested in requests {
        let records = ibans::filter(&repo, &raion, requested).await.unwrap();
        assert!(records.iter().all(|record| record.district_code == CHISINAU));
    }

    let all_own = ibans::filter(&repo, &raion, FilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(ids(&all_own), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_conflicting_district_filter_is_overridden() {
    let repo = seeded_registry().await;
    let requested = FilterCriteria {
        district_code: Some(BALTI.to_string()),
        year: Some(2024),
        ..FilterCriteria::default()
    };

    let records = ibans::filter(&repo, &raion_operator(CHISINAU), requested)
        .await
        .unwrap();

    // Own district's 2024 records, not Bălți's and not an error.
    assert_eq!(ids(&records), vec![2, 3]);
}

#[tokio::test]
async fn test_caller_without_roles_is_forbidden() {
    let repo = seeded_registry().await;
    let result = ibans::filter(&repo, &caller(&[], None), FilterCriteria::default()).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_district_operator_without_district_is_forbidden() {
    let repo = seeded_registry().await;
    let misconfigured = caller(&[Role::OperatorRaion], None);

    let filtered = ibans::filter(&repo, &misconfigured, FilterCriteria::default()).await;
    assert!(matches!(filtered, Err(AppError::Forbidden)));

    let listed = ibans::list_by_district(&repo, &misconfigured, CHISINAU, None).await;
    assert!(matches!(listed, Err(AppError::Forbidden)));
}

// --- List by District ---

#[tokio::test]
async fn test_list_by_district_with_and_without_year() {
    let repo = seeded_registry().await;

    let all = ibans::list_by_district(&repo, &operator(), BALTI, None)
        .await
        .unwrap();
    assert_eq!(ids(&all), vec![4, 5, 6]);

    let year = ibans::list_by_district(&repo, &operator(), BALTI, Some(2023))
        .await
        .unwrap();
    assert_eq!(ids(&year), vec![4]);
}

#[tokio::test]
async fn test_list_by_foreign_district_is_empty_for_district_operator() {
    let repo = seeded_registry().await;
    let raion = raion_operator(CHISINAU);

    let foreign = ibans::list_by_district(&repo, &raion, BALTI, None)
        .await
        .unwrap();
    assert!(foreign.is_empty());

    let own = ibans::list_by_district(&repo, &raion, CHISINAU, Some(2024))
        .await
        .unwrap();
    assert_eq!(ids(&own), vec![2, 3]);
}

// --- Get by Id ---

#[tokio::test]
async fn test_get_by_id_hides_out_of_scope_records() {
    let repo = seeded_registry().await;
    let raion = raion_operator(CHISINAU);

    assert_eq!(ibans::get_by_id(&repo, &raion, 1).await.unwrap().id, 1);

    let foreign = ibans::get_by_id(&repo, &raion, 4).await.unwrap_err();
    let missing = ibans::get_by_id(&repo, &raion, 999).await.unwrap_err();
    assert!(matches!(foreign, AppError::NotFound(_)));
    assert_eq!(foreign.to_string(), missing.to_string());

    assert_eq!(ibans::get_by_id(&repo, &operator(), 4).await.unwrap().id, 4);
}

// --- Create ---

#[tokio::test]
async fn test_create_derives_district_from_locality() {
    let repo = reference_repo();

    let record = ibans::create(
        &repo,
        &operator(),
        iban_request(&iban(42), 2025, ECO_INCOME_TAX, "0301"),
    )
    .await
    .unwrap();

    assert_eq!(record.id, 1);
    assert_eq!(record.district_code, BALTI);
    assert_eq!(record.locality_name, "Bălți");
    assert_eq!(record.iban_code, iban(42));
}

#[tokio::test]
async fn test_create_requires_district_for_ambiguous_locality() {
    let repo = reference_repo();

    let err = ibans::create(
        &repo,
        &admin(),
        iban_request(&iban(1), 2025, ECO_INCOME_TAX, "0120"),
    )
    .await
    .unwrap_err();

    assert_eq!(validation_fields(err), vec!["districtCode"]);
}

#[tokio::test]
async fn test_create_rejects_locality_of_another_district() {
    let repo = reference_repo();
    let req = IbanRequest {
        district_code: Some(CHISINAU.to_string()),
        ..iban_request(&iban(1), 2025, ECO_INCOME_TAX, "0301")
    };

    let err = ibans::create(&repo, &admin(), req).await.unwrap_err();
    assert_eq!(validation_fields(err), vec!["localityCode"]);
}

#[tokio::test]
async fn test_create_reports_every_invalid_field() {
    let repo = reference_repo();
    let req = IbanRequest {
        iban_code: "md12agrn0000123456789012".to_string(),
        year: Some(1990),
        eco_code: "000000".to_string(),
        district_code: None,
        locality_code: "9999".to_string(),
    };

    let err = ibans::create(&repo, &admin(), req).await.unwrap_err();
    assert_eq!(
        validation_fields(err),
        vec!["ecoCode", "ibanCode", "localityCode", "year"]
    );
}

#[tokio::test]
async fn test_create_rejects_unknown_district() {
    let repo = reference_repo();
    let req = IbanRequest {
        district_code: Some("7777".to_string()),
        ..iban_request(&iban(1), 2025, ECO_INCOME_TAX, "0101")
    };

    let err = ibans::create(&repo, &admin(), req).await.unwrap_err();
    assert_eq!(validation_fields(err), vec!["districtCode"]);
}

#[tokio::test]
async fn test_create_rejects_taken_slot() {
    let repo = seeded_registry().await;

    // Same year, eco code and locality as record 1, different IBAN code.
    let err = ibans::create(
        &repo,
        &admin(),
        iban_request(&iban(100), 2023, ECO_INCOME_TAX, "0101"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The IBAN code alone may repeat in another slot.
    let reused = ibans::create(
        &repo,
        &admin(),
        iban_request(&iban(1), 2025, ECO_INCOME_TAX, "0101"),
    )
    .await;
    assert!(reused.is_ok());
}

#[tokio::test]
async fn test_district_operator_cannot_write() {
    let repo = seeded_registry().await;
    let raion = raion_operator(CHISINAU);

    let create = ibans::create(
        &repo,
        &raion,
        iban_request(&iban(50), 2025, ECO_INCOME_TAX, "0101"),
    )
    .await;
    let update = ibans::update(
        &repo,
        &raion,
        1,
        iban_request(&iban(50), 2025, ECO_INCOME_TAX, "0101"),
    )
    .await;
    let delete = ibans::delete(&repo, &raion, 1).await;

    assert!(matches!(create, Err(AppError::Forbidden)));
    assert!(matches!(update, Err(AppError::Forbidden)));
    assert!(matches!(delete, Err(AppError::Forbidden)));
    assert_eq!(
        ibans::filter(&repo, &admin(), FilterCriteria::default())
            .await
            .unwrap()
            .len(),
        6
    );
}

// --- Update / Delete ---

#[tokio::test]
async fn test_update_replaces_fields() {
    let repo = seeded_registry().await;

    let updated = ibans::update(
        &repo,
        &operator(),
        1,
        iban_request(&iban(777), 2025, ECO_LOCAL_FEES, "0101"),
    )
    .await
    .unwrap();

    assert_eq!(updated.id, 1);
    assert_eq!(updated.iban_code, iban(777));
    assert_eq!(updated.year, 2025);
    assert_eq!(updated.eco_code, ECO_LOCAL_FEES);
    assert_eq!(ibans::get_by_id(&repo, &admin(), 1).await.unwrap(), updated);
}

#[tokio::test]
async fn test_writes_record_their_authors() {
    let repo = reference_repo();
    let author = admin();
    let editor = operator();

    let created = ibans::create(&repo, &author, iban_request(&iban(1), 2024, ECO_INCOME_TAX, "0101"))
        .await
        .unwrap();
    assert_eq!(repo.authors_of(created.id), Some((author.id, None)));

    ibans::update(
        &repo,
        &editor,
        created.id,
        iban_request(&iban(2), 2024, ECO_INCOME_TAX, "0101"),
    )
    .await
    .unwrap();
    assert_eq!(repo.authors_of(created.id), Some((author.id, Some(editor.id))));
}

#[tokio::test]
async fn test_update_may_keep_its_own_slot() {
    let repo = seeded_registry().await;

    let updated = ibans::update(
        &repo,
        &admin(),
        1,
        iban_request(&iban(555), 2023, ECO_INCOME_TAX, "0101"),
    )
    .await
    .unwrap();
    assert_eq!(updated.iban_code, iban(555));
}

#[tokio::test]
async fn test_update_onto_another_records_slot_conflicts() {
    let repo = seeded_registry().await;

    // Record 2's slot.
    let err = ibans::update(
        &repo,
        &admin(),
        1,
        iban_request(&iban(1), 2024, ECO_INCOME_TAX, "0101"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_update_missing_record_is_not_found() {
    let repo = seeded_registry().await;
    let err = ibans::update(
        &repo,
        &admin(),
        404,
        iban_request(&iban(1), 2025, ECO_INCOME_TAX, "0101"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let repo = seeded_registry().await;

    ibans::delete(&repo, &operator(), 3).await.unwrap();
    let again = ibans::delete(&repo, &operator(), 3).await.unwrap_err();
    assert!(matches!(again, AppError::NotFound(_)));

    let remaining = ibans::filter(&repo, &admin(), FilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(ids(&remaining), vec![1, 2, 4, 5, 6]);
}

// --- Reference Data ---

#[tokio::test]
async fn test_reference_lists() {
    let repo = reference_repo();
    let raion = raion_operator(BALTI);

    let eco_codes = ibans::list_eco_codes(&repo, &raion).await.unwrap();
    assert_eq!(eco_codes.len(), 2);

    let districts = ibans::list_districts(&repo, &raion).await.unwrap();
    let names: Vec<&str> = districts.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Bălți", "Chișinău"]);

    let localities = ibans::list_localities(&repo, &raion, CHISINAU).await.unwrap();
    let codes: Vec<&str> = localities.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["0101", "0120"]);
}

#[tokio::test]
async fn test_localities_of_unknown_district_is_empty() {
    let repo = reference_repo();
    let localities = ibans::list_localities(&repo, &caller(&[Role::Operator], None), "9999")
        .await
        .unwrap();
    assert!(localities.is_empty());
}
