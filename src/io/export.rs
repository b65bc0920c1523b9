use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::application::{LeasingService, Notifier};
use crate::domain::Currency;
use crate::storage::EntityStore;

/// Exporter for writing lease ledgers as CSV
pub struct StatementExporter<'a, S, N> {
    service: &'a LeasingService<S, N>,
}

impl<'a, S: EntityStore, N: Notifier> StatementExporter<'a, S, N> {
    pub fn new(service: &'a LeasingService<S, N>) -> Self {
        Self { service }
    }

    /// Export every ledger entry of one lease, oldest first, with a running
    /// balance per service. Returns the number of entries written.
    pub async fn export_statement_csv<W: Write>(
        &self,
        tenant_name: &str,
        site_number: &str,
        writer: W,
    ) -> Result<usize> {
        let lease = self.service.find_lease(tenant_name, site_number).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["date", "service", "entry", "amount", "balance"])?;

        let mut count = 0;
        for (name, service) in &lease.services {
            let mut entries: Vec<(DateTime<Utc>, &str, Currency)> = service
                .ledger
                .debits
                .iter()
                .map(|p| (p.at, "debit", -p.amount))
                .chain(service.ledger.credits.iter().map(|p| (p.at, "credit", p.amount)))
                .collect();
            // Stable: debits stay ahead of credits at the same instant
            entries.sort_by_key(|(at, _, _)| *at);

            let mut running = Currency::ZERO;
            for (at, entry, signed) in entries {
                running += signed;
                csv_writer.write_record([
                    at.to_rfc3339(),
                    name.clone(),
                    entry.to_string(),
                    signed.abs().to_string(),
                    running.to_string(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the balance of every service of every lease.
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let leases = self.service.list_leases(None).await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["tenant", "site", "service", "balance"])?;

        let mut count = 0;
        for lease in &leases {
            for (name, service) in &lease.services {
                let balance = service.balance().to_string();
                csv_writer.write_record([
                    lease.tenant.as_str(),
                    lease.site.as_str(),
                    name.as_str(),
                    balance.as_str(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
