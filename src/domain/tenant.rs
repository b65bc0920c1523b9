use serde::{Deserialize, Serialize};

/// A person or organisation that can hold leases. Identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    /// Where invoices are delivered (e-mail address, phone number, ...)
    pub contact: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }

    /// Recipient for notifications: the contact when set, the name otherwise.
    pub fn recipient(&self) -> &str {
        if self.contact.trim().is_empty() {
            &self.name
        } else {
            &self.contact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_prefers_contact() {
        let tenant = Tenant::new("Ada", "ada@example.org");
        assert_eq!(tenant.recipient(), "ada@example.org");
    }

    #[test]
    fn test_recipient_falls_back_to_name() {
        let tenant = Tenant::new("Ada", "  ");
        assert_eq!(tenant.recipient(), "Ada");
    }
}
