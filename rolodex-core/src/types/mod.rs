//! Record types shown by the console.

mod company;
mod contact;

pub use company::{Company, CompanyRef};
pub use contact::{Contact, ContactAddress, ContactEmail, ContactPhone};

// Re-export transport types used alongside records
pub use rolodex_provider::{PageQuery, PageResponse, RowId, SortDirection};

use serde::{Deserialize, Serialize};

/// A row that can be listed, selected and deleted.
pub trait Record: Clone + Send + Sync + 'static {
    fn row_id(&self) -> RowId;

    /// One-line description used in delete confirmations.
    fn display_label(&self) -> String;
}

/// Country picked in an address form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166 alpha-2 code, as stored by the API.
    pub code: String,
    pub name: String,
}

/// One social network link in a form.
///
/// Records carry these as a flat `{ident: url}` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    pub ident: String,
    pub url: String,
}
