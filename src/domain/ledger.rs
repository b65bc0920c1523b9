use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Currency;

/// A timestamped amount. Used for both credits and debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Currency,
    pub at: DateTime<Utc>,
}

impl Payment {
    pub fn new(amount: Currency, at: DateTime<Utc>) -> Self {
        Self { amount, at }
    }
}

/// Append-only sequences of credits and debits.
/// Balance = sum of credits - sum of debits; negative means money is owed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub credits: Vec<Payment>,
    pub debits: Vec<Payment>,
}

impl Ledger {
    pub fn credit(&mut self, payment: Payment) {
        self.credits.push(payment);
    }

    pub fn debit(&mut self, payment: Payment) {
        self.debits.push(payment);
    }

    pub fn total_credits(&self) -> Currency {
        self.credits.iter().map(|p| p.amount).sum()
    }

    pub fn total_debits(&self) -> Currency {
        self.debits.iter().map(|p| p.amount).sum()
    }

    pub fn balance(&self) -> Currency {
        self.total_credits() - self.total_debits()
    }
}

/// Sequential invoice number, unique within one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub u64);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A billable obligation of a fixed amount, covered incrementally by payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// The amount billed; also recorded as the single debit of `balance`
    pub bill: Currency,
    pub issued_at: DateTime<Utc>,
    pub balance: Ledger,
    /// Time of the payment that first covered the bill
    pub paid: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn new(id: InvoiceId, bill: Currency, issued_at: DateTime<Utc>) -> Self {
        let mut balance = Ledger::default();
        balance.debit(Payment::new(bill, issued_at));
        Self {
            id,
            bill,
            issued_at,
            balance,
            paid: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid.is_some()
    }

    /// Amount still owed on this invoice (never below zero).
    pub fn outstanding(&self) -> Currency {
        let remaining = self.bill - self.balance.total_credits();
        if remaining.is_negative() {
            Currency::ZERO
        } else {
            remaining
        }
    }

    /// Amount credited beyond the bill.
    pub fn excess(&self) -> Currency {
        let over = self.balance.total_credits() - self.bill;
        if over.is_positive() { over } else { Currency::ZERO }
    }

    /// Record a payment as a credit. Returns true when this payment is the one
    /// that covered the bill. Later payments never move the `paid` timestamp.
    fn apply(&mut self, payment: Payment) -> bool {
        self.balance.credit(payment);
        if self.paid.is_none() && self.balance.total_credits() >= self.bill {
            self.paid = Some(payment.at);
            return true;
        }
        false
    }
}

/// Outcome of applying one payment to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub invoice: InvoiceId,
    pub amount: Currency,
    /// True when this payment crossed the bill threshold
    pub settled: bool,
    pub outstanding: Currency,
    /// Credit beyond the bill; stays on this invoice
    pub excess: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("Invalid amount {0}: must be positive")]
    InvalidAmount(Currency),

    #[error("Amount {0} would overflow the ledger total")]
    Overflow(Currency),
}

/// Credit/debit tracking for one billable category of a lease (rent, utility).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub ledger: Ledger,
    pub invoices: Vec<Invoice>,
}

impl Service {
    pub fn balance(&self) -> Currency {
        self.ledger.balance()
    }

    /// Record a raw charge (e.g. a meter reading) without opening an invoice.
    pub fn charge(&mut self, amount: Currency, at: DateTime<Utc>) -> Result<(), BillingError> {
        ensure_positive(amount)?;
        ensure_room(self.ledger.total_debits(), amount)?;
        self.ledger.debit(Payment::new(amount, at));
        Ok(())
    }

    /// Open a new invoice for `bill` and debit the service by the same amount.
    pub fn issue_invoice(
        &mut self,
        bill: Currency,
        at: DateTime<Utc>,
    ) -> Result<InvoiceId, BillingError> {
        ensure_positive(bill)?;
        ensure_room(self.ledger.total_debits(), bill)?;
        let id = InvoiceId(self.invoices.len() as u64 + 1);
        self.ledger.debit(Payment::new(bill, at));
        self.invoices.push(Invoice::new(id, bill, at));
        Ok(id)
    }

    /// Apply a payment against the named invoice.
    ///
    /// Payments may arrive in any order and in any number of chunks. Each one
    /// appends exactly one credit to the invoice and one to the service. The
    /// invoice is marked paid by the payment whose running total first reaches
    /// the bill. Excess credit is not carried to other invoices.
    pub fn pay(
        &mut self,
        invoice_id: InvoiceId,
        payment: Payment,
    ) -> Result<PaymentReceipt, BillingError> {
        ensure_positive(payment.amount)?;
        ensure_room(self.ledger.total_credits(), payment.amount)?;
        let invoice = self
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == invoice_id)
            .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

        let settled = invoice.apply(payment);
        let receipt = PaymentReceipt {
            invoice: invoice_id,
            amount: payment.amount,
            settled,
            outstanding: invoice.outstanding(),
            excess: invoice.excess(),
        };
        self.ledger.credit(payment);
        Ok(receipt)
    }

    pub fn invoice(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.iter().find(|invoice| invoice.id == id)
    }

    pub fn unpaid_invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter().filter(|invoice| !invoice.is_paid())
    }
}

// Service totals bound every invoice total, so checking them keeps all sums in range
fn ensure_room(total: Currency, amount: Currency) -> Result<(), BillingError> {
    match total.checked_add(amount) {
        Some(_) => Ok(()),
        None => Err(BillingError::Overflow(amount)),
    }
}

fn ensure_positive(amount: Currency) -> Result<(), BillingError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(BillingError::InvalidAmount(amount))
    }
}
