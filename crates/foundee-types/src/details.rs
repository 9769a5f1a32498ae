//! Owner contact details and the per-field visibility mask.

use std::fmt;
use std::str::FromStr;

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Deserializer, Serialize};

/// One contact field an owner can attach to their QR codes.
///
/// Declaration order is the display order used everywhere a field list is
/// rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
    FirstName,
    LastName,
    MobileNo,
    Address,
    EmailId,
    BloodGrp,
    CompanyName,
    Description,
}

impl DetailField {
    /// All fields in display order.
    pub const ALL: [DetailField; 8] = [
        DetailField::FirstName,
        DetailField::LastName,
        DetailField::MobileNo,
        DetailField::Address,
        DetailField::EmailId,
        DetailField::BloodGrp,
        DetailField::CompanyName,
        DetailField::Description,
    ];

    /// Wire key used by the backend for both the value and its mask entry.
    pub fn key(self) -> &'static str {
        match self {
            DetailField::FirstName => "first_name",
            DetailField::LastName => "last_name",
            DetailField::MobileNo => "mobile_no",
            DetailField::Address => "address",
            DetailField::EmailId => "email_id",
            DetailField::BloodGrp => "blood_grp",
            DetailField::CompanyName => "company_name",
            DetailField::Description => "description",
        }
    }

    /// Human-readable label shown to finders.
    pub fn label(self) -> &'static str {
        match self {
            DetailField::FirstName => "First Name",
            DetailField::LastName => "Last Name",
            DetailField::MobileNo => "Mobile",
            DetailField::Address => "Address",
            DetailField::EmailId => "Email",
            DetailField::BloodGrp => "Blood Group",
            DetailField::CompanyName => "Company",
            DetailField::Description => "Additional Info",
        }
    }
}

impl fmt::Display for DetailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DetailField {
    type Err = String;

    /// Accepts the wire key plus a few short aliases (`mobile`, `email`, `blood`, `company`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "first_name" | "first" => DetailField::FirstName,
            "last_name" | "last" => DetailField::LastName,
            "mobile_no" | "mobile" | "phone" => DetailField::MobileNo,
            "address" => DetailField::Address,
            "email_id" | "email" => DetailField::EmailId,
            "blood_grp" | "blood_group" | "blood" => DetailField::BloodGrp,
            "company_name" | "company" => DetailField::CompanyName,
            "description" | "info" => DetailField::Description,
            _ => {
                let known: Vec<&str> = DetailField::ALL.iter().map(|f| f.key()).collect();
                return Err(format!(
                    "unknown field '{s}' (expected one of: {})",
                    known.join(", ")
                ));
            }
        };
        Ok(field)
    }
}

/// Contact details stored for a user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub mobile_no: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub blood_grp: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UserDetails {
    /// Returns the raw stored value for a field.
    pub fn get(&self, field: DetailField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Returns the value only if it has visible content.
    pub fn non_empty(&self, field: DetailField) -> Option<&str> {
        self.get(field).filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, field: DetailField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: DetailField) -> &Option<String> {
        match field {
            DetailField::FirstName => &self.first_name,
            DetailField::LastName => &self.last_name,
            DetailField::MobileNo => &self.mobile_no,
            DetailField::Address => &self.address,
            DetailField::EmailId => &self.email_id,
            DetailField::BloodGrp => &self.blood_grp,
            DetailField::CompanyName => &self.company_name,
            DetailField::Description => &self.description,
        }
    }

    fn slot_mut(&mut self, field: DetailField) -> &mut Option<String> {
        match field {
            DetailField::FirstName => &mut self.first_name,
            DetailField::LastName => &mut self.last_name,
            DetailField::MobileNo => &mut self.mobile_no,
            DetailField::Address => &mut self.address,
            DetailField::EmailId => &mut self.email_id,
            DetailField::BloodGrp => &mut self.blood_grp,
            DetailField::CompanyName => &mut self.company_name,
            DetailField::Description => &mut self.description,
        }
    }
}

/// Mask entries missing from a payload (or sent as `null`) are visible.
pub const DEFAULT_VISIBLE: bool = true;

fn default_visible() -> bool {
    DEFAULT_VISIBLE
}

fn visible_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(DEFAULT_VISIBLE))
}

/// Per-field visibility for one QR code, independent of the field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityMask {
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub first_name: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub last_name: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub mobile_no: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub address: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub email_id: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub blood_grp: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub company_name: bool,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub description: bool,
}

impl Default for VisibilityMask {
    fn default() -> Self {
        Self::from_map(&EnumMap::from_fn(|_| DEFAULT_VISIBLE))
    }
}

impl VisibilityMask {
    pub fn is_visible(&self, field: DetailField) -> bool {
        match field {
            DetailField::FirstName => self.first_name,
            DetailField::LastName => self.last_name,
            DetailField::MobileNo => self.mobile_no,
            DetailField::Address => self.address,
            DetailField::EmailId => self.email_id,
            DetailField::BloodGrp => self.blood_grp,
            DetailField::CompanyName => self.company_name,
            DetailField::Description => self.description,
        }
    }

    pub fn set(&mut self, field: DetailField, visible: bool) {
        let slot = match field {
            DetailField::FirstName => &mut self.first_name,
            DetailField::LastName => &mut self.last_name,
            DetailField::MobileNo => &mut self.mobile_no,
            DetailField::Address => &mut self.address,
            DetailField::EmailId => &mut self.email_id,
            DetailField::BloodGrp => &mut self.blood_grp,
            DetailField::CompanyName => &mut self.company_name,
            DetailField::Description => &mut self.description,
        };
        *slot = visible;
    }

    pub fn to_map(&self) -> EnumMap<DetailField, bool> {
        EnumMap::from_fn(|field| self.is_visible(field))
    }

    pub fn from_map(map: &EnumMap<DetailField, bool>) -> Self {
        Self {
            first_name: map[DetailField::FirstName],
            last_name: map[DetailField::LastName],
            mobile_no: map[DetailField::MobileNo],
            address: map[DetailField::Address],
            email_id: map[DetailField::EmailId],
            blood_grp: map[DetailField::BloodGrp],
            company_name: map[DetailField::CompanyName],
            description: map[DetailField::Description],
        }
    }
}

/// One line of contact information a finder is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub field: DetailField,
    pub value: String,
}

/// Projects details through a mask: a field is included iff its mask entry is
/// set and its value is non-empty.
pub fn visible_contact(details: &UserDetails, mask: &VisibilityMask) -> Vec<ContactEntry> {
    DetailField::ALL
        .into_iter()
        .filter(|field| mask.is_visible(*field))
        .filter_map(|field| {
            details.non_empty(field).map(|value| ContactEntry {
                field,
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_details() -> UserDetails {
        let mut details = UserDetails::default();
        for field in DetailField::ALL {
            details.set(field, Some(format!("value-{}", field.key())));
        }
        details
    }

    #[test]
    fn test_mask_missing_entries_default_visible() {
        let mask: VisibilityMask = serde_json::from_str(r#"{"first_name": false}"#).unwrap();
        assert!(!mask.first_name);
        for field in DetailField::ALL.into_iter().skip(1) {
            assert!(mask.is_visible(field), "{field} should default to visible");
        }
    }

    #[test]
    fn test_mask_null_entries_default_visible() {
        let mask: VisibilityMask =
            serde_json::from_str(r#"{"address": null, "mobile_no": false}"#).unwrap();
        assert!(mask.address);
        assert!(!mask.mobile_no);
    }

    #[test]
    fn test_mask_ignores_unrelated_keys() {
        let mask: VisibilityMask =
            serde_json::from_str(r#"{"id": "abc", "active_flag": true, "email_id": false}"#)
                .unwrap();
        assert!(!mask.email_id);
        assert!(mask.description);
    }

    #[test]
    fn test_visible_contact_requires_mask_and_value() {
        let mut details = full_details();
        details.set(DetailField::Address, Some("   ".to_string()));
        details.set(DetailField::BloodGrp, None);

        let mut mask = VisibilityMask::default();
        mask.set(DetailField::MobileNo, false);

        let fields: Vec<DetailField> = visible_contact(&details, &mask)
            .into_iter()
            .map(|entry| entry.field)
            .collect();

        assert_eq!(
            fields,
            vec![
                DetailField::FirstName,
                DetailField::LastName,
                DetailField::EmailId,
                DetailField::CompanyName,
                DetailField::Description,
            ]
        );
    }

    #[test]
    fn test_visible_contact_exhaustive_per_field() {
        for field in DetailField::ALL {
            for visible in [true, false] {
                for value in [None, Some(""), Some("x")] {
                    let mut details = UserDetails::default();
                    details.set(field, value.map(str::to_string));
                    let mut mask = VisibilityMask::default();
                    mask.set(field, visible);

                    let shown = visible_contact(&details, &mask)
                        .iter()
                        .any(|entry| entry.field == field);
                    assert_eq!(shown, visible && value == Some("x"), "{field} {visible} {value:?}");
                }
            }
        }
    }

    #[test]
    fn test_field_parse_aliases() {
        assert_eq!("email".parse::<DetailField>().unwrap(), DetailField::EmailId);
        assert_eq!("blood-group".parse::<DetailField>().unwrap(), DetailField::BloodGrp);
        assert_eq!("Company_Name".parse::<DetailField>().unwrap(), DetailField::CompanyName);
        assert!("shoe_size".parse::<DetailField>().is_err());
    }

    #[test]
    fn test_field_serde_uses_wire_keys() {
        for field in DetailField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
        }
    }
}
