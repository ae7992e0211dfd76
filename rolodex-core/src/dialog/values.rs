//! Mapping between API records and editor form values.
//!
//! Records are flat: the address country is a `country_code` /
//! `country_name` pair, the employer is a `company_id`, social links are a
//! `{ident: url}` map. Forms use composite values instead ([`Country`],
//! [`CompanyRef`], a list of [`SocialMedia`]).
//! [`prepare_incoming_values`] builds the composites and
//! [`prepare_outgoing_values`] flattens them back to their primitive keys,
//! so unchanged identifiers survive a load/save cycle exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation;
use crate::bus::{COMPANIES_REFRESH, CONTACTS_REFRESH};
use crate::error::{CoreError, CoreResult, FieldErrors};
use crate::types::{CompanyRef, Country, RowId, SocialMedia};

/// Editor values for one kind of record.
pub trait RecordForm: Clone + Default + PartialEq + Send + Sync + 'static {
    /// Collection endpoint, for example `/contacts`.
    const ENDPOINT: &'static str;
    /// Singular display name, for example `Contact`.
    const NOUN: &'static str;
    /// Topic published after a successful save.
    const REFRESH_TOPIC: &'static str;

    /// Build form values from a full record.
    fn from_record(record: &Value) -> CoreResult<Self>;

    /// Wire payload for a save request.
    fn to_payload(&self) -> CoreResult<Value>;

    /// Client-side checks run before anything is sent.
    fn validate(&self) -> FieldErrors;
}

/// Record → form values.
pub fn prepare_incoming_values<F: RecordForm>(record: &Value) -> CoreResult<F> {
    F::from_record(record)
}

/// Form values → save payload.
pub fn prepare_outgoing_values<F: RecordForm>(values: &F) -> CoreResult<Value> {
    values.to_payload()
}

fn decode<T: for<'de> Deserialize<'de>>(endpoint: &str, record: &Value) -> CoreResult<T> {
    T::deserialize(record)
        .map_err(|e| CoreError::SerializationError(format!("[{endpoint}] unexpected record: {e}")))
}

fn encode<T: Serialize>(endpoint: &str, payload: &T) -> CoreResult<Value> {
    serde_json::to_value(payload)
        .map_err(|e| CoreError::SerializationError(format!("[{endpoint}] cannot encode: {e}")))
}

// ===== Shared pieces =====

/// Social links as the API sends them. PHP encodes an empty map as `[]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SocialWire {
    Map(BTreeMap<String, Option<String>>),
    List(Vec<SocialMedia>),
}

impl Default for SocialWire {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

fn social_in(wire: Option<SocialWire>) -> Vec<SocialMedia> {
    match wire.unwrap_or_default() {
        SocialWire::Map(map) => map
            .into_iter()
            .filter_map(|(ident, url)| url.map(|url| SocialMedia { ident, url }))
            .collect(),
        SocialWire::List(list) => list,
    }
}

fn social_out(links: &[SocialMedia]) -> BTreeMap<String, String> {
    links
        .iter()
        .filter(|link| !link.ident.trim().is_empty())
        .map(|link| (link.ident.clone(), link.url.clone()))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct AddressWire {
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddressPayload<'a> {
    street: &'a str,
    town: &'a str,
    county: &'a str,
    postcode: &'a str,
    country_code: Option<&'a str>,
}

/// Postal address as edited in a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressForm {
    pub street: String,
    pub town: String,
    pub county: String,
    pub postcode: String,
    pub country: Option<Country>,
}

impl From<AddressWire> for AddressForm {
    fn from(wire: AddressWire) -> Self {
        let country = wire
            .country_code
            .filter(|code| !code.is_empty())
            .map(|code| Country {
                code,
                name: wire.country_name.unwrap_or_default(),
            });
        Self {
            street: wire.street.unwrap_or_default(),
            town: wire.town.unwrap_or_default(),
            county: wire.county.unwrap_or_default(),
            postcode: wire.postcode.unwrap_or_default(),
            country,
        }
    }
}

impl AddressForm {
    fn payload(&self) -> AddressPayload<'_> {
        AddressPayload {
            street: &self.street,
            town: &self.town,
            county: &self.county,
            postcode: &self.postcode,
            country_code: self.country.as_ref().map(|c| c.code.as_str()),
        }
    }
}

// ===== Company =====

#[derive(Debug, Deserialize)]
struct CompanyWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(flatten)]
    address: AddressWire,
    #[serde(default)]
    social_media: Option<SocialWire>,
}

#[derive(Debug, Serialize)]
struct CompanyPayload<'a> {
    name: &'a str,
    phone: &'a str,
    email: &'a str,
    website: &'a str,
    #[serde(flatten)]
    address: AddressPayload<'a>,
    social_media: BTreeMap<String, String>,
}

/// Company editor values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub address: AddressForm,
    pub social_media: Vec<SocialMedia>,
}

impl RecordForm for CompanyForm {
    const ENDPOINT: &'static str = "/companies";
    const NOUN: &'static str = "Company";
    const REFRESH_TOPIC: &'static str = COMPANIES_REFRESH;

    fn from_record(record: &Value) -> CoreResult<Self> {
        let wire: CompanyWire = decode(Self::ENDPOINT, record)?;
        Ok(Self {
            name: wire.name.unwrap_or_default(),
            phone: wire.phone.unwrap_or_default(),
            email: wire.email.unwrap_or_default(),
            website: wire.website.unwrap_or_default(),
            address: wire.address.into(),
            social_media: social_in(wire.social_media),
        })
    }

    fn to_payload(&self) -> CoreResult<Value> {
        encode(
            Self::ENDPOINT,
            &CompanyPayload {
                name: &self.name,
                phone: &self.phone,
                email: &self.email,
                website: &self.website,
                address: self.address.payload(),
                social_media: social_out(&self.social_media),
            },
        )
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "name", &self.name);
        validation::max_len(&mut errors, "name", &self.name, validation::MAX_TEXT_LEN);
        validation::max_len(&mut errors, "email", &self.email, validation::MAX_TEXT_LEN);
        validation::email(&mut errors, "email", &self.email);
        errors
    }
}

// ===== Contact =====

#[derive(Debug, Deserialize)]
struct ContactWire {
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    company_id: Option<RowId>,
    #[serde(default)]
    company_name: Option<String>,
    /// Eager-loaded employer, preferred over the flat pair when present.
    #[serde(default)]
    company: Option<CompanyRef>,
    #[serde(flatten)]
    address: AddressWire,
    #[serde(default)]
    social_media: Option<SocialWire>,
}

#[derive(Debug, Serialize)]
struct ContactPayload<'a> {
    firstname: &'a str,
    lastname: &'a str,
    phone: &'a str,
    email: &'a str,
    company_id: Option<RowId>,
    #[serde(flatten)]
    address: AddressPayload<'a>,
    social_media: BTreeMap<String, String>,
}

/// Contact editor values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub email: String,
    pub company: Option<CompanyRef>,
    pub address: AddressForm,
    pub social_media: Vec<SocialMedia>,
}

impl RecordForm for ContactForm {
    const ENDPOINT: &'static str = "/contacts";
    const NOUN: &'static str = "Contact";
    const REFRESH_TOPIC: &'static str = CONTACTS_REFRESH;

    fn from_record(record: &Value) -> CoreResult<Self> {
        let wire: ContactWire = decode(Self::ENDPOINT, record)?;
        let company = wire.company.or_else(|| {
            wire.company_id.map(|id| CompanyRef {
                id,
                name: wire.company_name.unwrap_or_default(),
            })
        });
        Ok(Self {
            firstname: wire.firstname.unwrap_or_default(),
            lastname: wire.lastname.unwrap_or_default(),
            phone: wire.phone.unwrap_or_default(),
            email: wire.email.unwrap_or_default(),
            company,
            address: wire.address.into(),
            social_media: social_in(wire.social_media),
        })
    }

    fn to_payload(&self) -> CoreResult<Value> {
        encode(
            Self::ENDPOINT,
            &ContactPayload {
                firstname: &self.firstname,
                lastname: &self.lastname,
                phone: &self.phone,
                email: &self.email,
                company_id: self.company.as_ref().map(|c| c.id),
                address: self.address.payload(),
                social_media: social_out(&self.social_media),
            },
        )
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "firstname", &self.firstname);
        validation::max_len(
            &mut errors,
            "firstname",
            &self.firstname,
            validation::MAX_TEXT_LEN,
        );
        validation::max_len(&mut errors, "lastname", &self.lastname, validation::MAX_TEXT_LEN);
        validation::email(&mut errors, "email", &self.email);
        errors
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn contact_record() -> Value {
        json!({
            "id": 41,
            "firstname": "Grace",
            "lastname": "Hopper",
            "phone": "555-0100",
            "email": "grace@example.com",
            "company_id": 7,
            "company_name": "Remington Rand",
            "street": "1 Navy Way",
            "town": "Arlington",
            "county": "VA",
            "postcode": "22202",
            "country_code": "US",
            "country_name": "United States",
            "social_media": {"linkedin": "https://linkedin.example/grace", "twitter": null}
        })
    }

    #[test]
    fn incoming_builds_composites() {
        let form: CoreResult<ContactForm> = prepare_incoming_values(&contact_record());
        let form = form.unwrap();
        assert_eq!(
            form.company,
            Some(CompanyRef {
                id: RowId(7),
                name: "Remington Rand".into()
            })
        );
        assert_eq!(
            form.address.country,
            Some(Country {
                code: "US".into(),
                name: "United States".into()
            })
        );
        assert_eq!(
            form.social_media,
            vec![SocialMedia {
                ident: "linkedin".into(),
                url: "https://linkedin.example/grace".into()
            }]
        );
    }

    #[test]
    fn round_trip_preserves_primitive_identifiers() {
        let record = contact_record();
        let form: CoreResult<ContactForm> = prepare_incoming_values(&record);
        let Ok(form) = form else {
            panic!("decode failed: {form:?}");
        };
        let payload = prepare_outgoing_values(&form);
        let Ok(payload) = payload else {
            panic!("encode failed: {payload:?}");
        };

        assert_eq!(payload["company_id"], record["company_id"]);
        assert_eq!(payload["country_code"], record["country_code"]);
        for field in ["firstname", "lastname", "phone", "email", "street", "town", "county", "postcode"] {
            assert_eq!(payload[field], record[field], "{field}");
        }
        assert_eq!(
            payload["social_media"],
            json!({"linkedin": "https://linkedin.example/grace"})
        );
        assert!(payload.get("company_name").is_none());
        assert!(payload.get("country_name").is_none());
    }

    #[test]
    fn company_round_trip_and_empty_php_map() {
        let record = json!({
            "id": 7,
            "name": "Remington Rand",
            "country_code": "GB",
            "country_name": "United Kingdom",
            "social_media": []
        });
        let form: CoreResult<CompanyForm> = prepare_incoming_values(&record);
        let Ok(form) = form else {
            panic!("decode failed: {form:?}");
        };
        assert!(form.social_media.is_empty());

        let payload = prepare_outgoing_values(&form).unwrap_or_default();
        assert_eq!(payload["country_code"], "GB");
        assert_eq!(payload["name"], "Remington Rand");
        assert_eq!(payload["social_media"], json!({}));
    }

    #[test]
    fn eager_loaded_company_wins() {
        let record = json!({
            "firstname": "Ada",
            "company_id": 3,
            "company": {"id": 3, "name": "Analytical Engines"}
        });
        let form: CoreResult<ContactForm> = prepare_incoming_values(&record);
        assert!(matches!(&form, Ok(f) if f.company.as_ref().is_some_and(|c| c.name == "Analytical Engines")));
    }

    #[test]
    fn missing_country_and_company_go_out_as_null() {
        let form = ContactForm {
            firstname: "Ada".into(),
            ..ContactForm::default()
        };
        let payload = prepare_outgoing_values(&form).unwrap_or_default();
        assert!(payload["company_id"].is_null());
        assert!(payload["country_code"].is_null());
    }

    #[test]
    fn malformed_record_is_serialization_error() {
        let result: CoreResult<ContactForm> = prepare_incoming_values(&json!({"firstname": 12}));
        assert!(matches!(result, Err(CoreError::SerializationError(_))));
    }
}
