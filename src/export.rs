//! CSV export of the filtered registry.

use chrono::{Local, NaiveDate};

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    ibans,
    models::{FilterCriteria, IbanView},
    repository::Repository,
};

/// Column titles, in output order.
pub const CSV_HEADER: [&str; 6] = [
    "Cod IBAN",
    "Anul",
    "Cod Eco",
    "Denumire Eco",
    "Localitate",
    "Raion",
];

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// A rendered export, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// export
///
/// Same filter and scope as `ibans::filter`, one CSV row per record in the
/// same order, preceded by the header row.
pub async fn export(
    repo: &dyn Repository,
    caller: &AuthUser,
    criteria: FilterCriteria,
) -> AppResult<CsvExport> {
    let records = ibans::filter(repo, caller, criteria).await?;
    let bytes = render_csv(&records)?;

    tracing::info!(
        username = %caller.username,
        rows = records.len(),
        "IBAN registry exported"
    );

    Ok(CsvExport {
        filename: export_filename(Local::now().date_naive()),
        bytes,
    })
}

/// `registru_ibans_<YYYY-MM-DD>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("registru_ibans_{}.csv", date.format("%Y-%m-%d"))
}

/// Serialize records as UTF-8 CSV. Fields are quoted only when they contain
/// the separator, a quote or a line break; embedded quotes are doubled.
pub fn render_csv(records: &[IbanView]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_failure)?;
    for record in records {
        let year = record.year.to_string();
        writer
            .write_record([
                record.iban_code.as_str(),
                year.as_str(),
                record.eco_code.as_str(),
                record.eco_label.as_str(),
                record.locality_name.as_str(),
                record.district_name.as_str(),
            ])
            .map_err(csv_failure)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {e}")))
}

fn csv_failure(err: csv::Error) -> AppError {
    AppError::Internal(format!("CSV serialization failed: {err}"))
}
