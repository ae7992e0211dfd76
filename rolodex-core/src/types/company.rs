use serde::{Deserialize, Serialize};

use super::{Record, RowId};

/// Company row as listed by `/companies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: RowId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Record for Company {
    fn row_id(&self) -> RowId {
        self.id
    }

    fn display_label(&self) -> String {
        self.name.clone()
    }
}

/// Reference to a company from another record (a contact's employer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: RowId,
    pub name: String,
}

impl From<&Company> for CompanyRef {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
        }
    }
}
