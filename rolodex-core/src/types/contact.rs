use serde::{Deserialize, Serialize};

use super::{Record, RowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAddress {
    #[serde(default)]
    pub full_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPhone {
    #[serde(default)]
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEmail {
    #[serde(default)]
    pub address: String,
}

/// Contact row as listed by `/contacts`.
///
/// The API returns every address, phone number and e-mail address; the grid
/// shows the first of each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RowId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub address: Vec<ContactAddress>,
    #[serde(default)]
    pub phone_number: Vec<ContactPhone>,
    #[serde(default)]
    pub email_address: Vec<ContactEmail>,
}

impl Contact {
    /// `"firstname lastname"`, trimmed when either part is missing.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }

    pub fn primary_address(&self) -> &str {
        self.address.first().map_or("", |a| a.full_address.as_str())
    }

    pub fn primary_phone(&self) -> &str {
        self.phone_number.first().map_or("", |p| p.number.as_str())
    }

    pub fn primary_email(&self) -> &str {
        self.email_address.first().map_or("", |e| e.address.as_str())
    }

    /// `tel:` link for the first phone number, if there is one.
    pub fn tel_link(&self) -> Option<String> {
        let number = self.primary_phone();
        (!number.is_empty()).then(|| format!("tel:{number}"))
    }

    /// `mailto:` link for the first e-mail address, if there is one.
    pub fn mailto_link(&self) -> Option<String> {
        let address = self.primary_email();
        (!address.is_empty()).then(|| format!("mailto:{address}"))
    }
}

impl Record for Contact {
    fn row_id(&self) -> RowId {
        self.id
    }

    fn display_label(&self) -> String {
        self.full_name()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn projections_use_first_entries() {
        let contact: Result<Contact, _> = serde_json::from_value(json!({
            "id": 4,
            "firstname": "Ada",
            "lastname": "Lovelace",
            "address": [{"full_address": "12 St James's Square, London"}, {"full_address": "Elsewhere"}],
            "phone_number": [{"number": "+44 20 7946 0000"}],
            "email_address": [{"address": "ada@example.com"}]
        }));
        let contact = contact.unwrap();
        assert_eq!(contact.full_name(), "Ada Lovelace");
        assert_eq!(contact.display_label(), "Ada Lovelace");
        assert_eq!(contact.primary_address(), "12 St James's Square, London");
        assert_eq!(contact.tel_link().as_deref(), Some("tel:+44 20 7946 0000"));
        assert_eq!(
            contact.mailto_link().as_deref(),
            Some("mailto:ada@example.com")
        );
    }

    #[test]
    fn sparse_row_has_empty_projections() {
        let contact: Result<Contact, _> = serde_json::from_value(json!({"id": 1, "firstname": "Cher"}));
        let contact = contact.unwrap();
        assert_eq!(contact.full_name(), "Cher");
        assert_eq!(contact.primary_address(), "");
        assert!(contact.tel_link().is_none());
        assert!(contact.mailto_link().is_none());
    }
}
