use std::io::Read;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::application::{AppError, LeasingService, Notifier};
use crate::domain::{Currency, InvoiceId, Payment};
use crate::storage::EntityStore;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Check every row against the ledger without recording anything
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
struct PaymentRow {
    tenant: String,
    site: String,
    service: String,
    invoice: String,
    amount: String,
    date: String,
}

/// Importer applying bank payments to invoices
pub struct PaymentImporter<'a, S, N> {
    service: &'a LeasingService<S, N>,
}

impl<'a, S: EntityStore, N: Notifier> PaymentImporter<'a, S, N> {
    pub fn new(service: &'a LeasingService<S, N>) -> Self {
        Self { service }
    }

    /// Import payments from CSV with header
    /// `tenant,site,service,invoice,amount,date`.
    ///
    /// Bad rows are reported and skipped; the rest are still applied.
    pub async fn import_payments_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, row) in csv_reader.deserialize::<PaymentRow>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let invoice = match parse_invoice(&row.invoice) {
                Ok(id) => id,
                Err(e) => {
                    result.errors.push(field_error(line, "invoice", e));
                    continue;
                }
            };
            let amount: Currency = match row.amount.parse() {
                Ok(amount) => amount,
                Err(e) => {
                    result.errors.push(field_error(line, "amount", e.into()));
                    continue;
                }
            };
            let at = match parse_timestamp(&row.date) {
                Ok(at) => at,
                Err(e) => {
                    result.errors.push(field_error(line, "date", e));
                    continue;
                }
            };

            let payment = Payment::new(amount, at);
            let outcome = if options.dry_run {
                self.check_payment(&row, invoice, payment).await
            } else {
                self.service
                    .record_payment(&row.tenant, &row.site, &row.service, invoice, payment)
                    .await
                    .map(|_| ())
            };

            match outcome {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Payment failed: {}", e),
                }),
            }
        }

        debug!(
            imported = result.imported,
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "payment import finished"
        );
        Ok(result)
    }

    /// Apply the payment to a copy of the service so the dry run rejects
    /// exactly what a real import would.
    async fn check_payment(
        &self,
        row: &PaymentRow,
        invoice: InvoiceId,
        payment: Payment,
    ) -> Result<(), AppError> {
        let lease = self.service.find_lease(&row.tenant, &row.site).await?;
        let mut service = lease
            .service(&row.service)
            .cloned()
            .ok_or_else(|| AppError::ServiceNotFound(row.service.clone()))?;
        service
            .pay(invoice, payment)
            .map(|_| ())
            .map_err(AppError::billing("import_payments"))
    }
}

fn field_error(line: usize, field: &str, error: anyhow::Error) -> ImportError {
    ImportError {
        line,
        field: Some(field.to_string()),
        error: format!("Invalid {}: {}", field, error),
    }
}

// Accepts "3" or "#3"
fn parse_invoice(s: &str) -> Result<InvoiceId> {
    let digits = s.trim().trim_start_matches('#');
    let number = digits
        .parse()
        .with_context(|| format!("Invalid invoice number: {}", s))?;
    Ok(InvoiceId(number))
}

// Helper function to parse timestamp
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try YYYY-MM-DD format
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    anyhow::bail!("Invalid timestamp format: {}", s)
}
