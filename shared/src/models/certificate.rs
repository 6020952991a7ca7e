//! Certificate Model

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Certificate validity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    #[default]
    Valid,
    Invalid,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }

    /// The opposite status, used by the row toggle
    pub fn toggled(self) -> Self {
        match self {
            Self::Valid => Self::Invalid,
            Self::Invalid => Self::Valid,
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "valid" => Ok(Self::Valid),
            "invalid" => Ok(Self::Invalid),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

/// Certificate entity as returned by the backend
///
/// The backend is not consistent about identifiers (`id` or `_id`, string or
/// number), so both are kept raw. Text fields take whatever scalar arrives
/// (numbers and booleans become their text). Unknown fields are preserved in
/// `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub certificate_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub standard: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_initial_registration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_issue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_expiry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recertification_due_date: Option<String>,
    #[serde(rename = "qrImage", default, deserialize_with = "lenient_string")]
    pub qr_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Certificate {
    /// Record identifier (`id`, falling back to `_id`)
    pub fn record_id(&self) -> Option<String> {
        self.id
            .as_ref()
            .or(self.mongo_id.as_ref())
            .and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// Status as shown by the row switch: anything but `"invalid"` is valid
    pub fn status(&self) -> CertificateStatus {
        match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("invalid") => CertificateStatus::Invalid,
            _ => CertificateStatus::Valid,
        }
    }

    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.date_of_issue.as_deref().and_then(parse_date)
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.date_of_expiry.as_deref().and_then(parse_date)
    }

    /// Draft pre-filled from this record, for the edit form
    pub fn to_draft(&self) -> CertificateDraft {
        CertificateDraft {
            certificate_number: self.certificate_number.clone().unwrap_or_default(),
            standard: self.standard.clone().unwrap_or_default(),
            organization: self.organization.clone().unwrap_or_default(),
            country: self.country.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            scope: self.scope.clone().unwrap_or_default(),
            date_of_initial_registration: self.date_of_initial_registration.as_deref().and_then(parse_date),
            date_of_issue: self.issue_date(),
            date_of_expiry: self.expiry_date(),
            recertification_due_date: self.recertification_due_date.as_deref().and_then(parse_date),
            qr_image: self.qr_image.clone(),
            status: Some(self.status()),
        }
    }
}

/// Any JSON value as text; `null` is absent
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Parse a backend date, accepting both `YYYY-MM-DD` and full ISO timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Create/update certificate payload
///
/// Dates serialize as `YYYY-MM-DD`. `qr_image` carries an already uploaded
/// path; new image files are attached as multipart parts by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateDraft {
    pub certificate_number: String,
    pub standard: String,
    pub organization: String,
    pub country: String,
    pub address: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_initial_registration: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_issue: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recertification_due_date: Option<NaiveDate>,
    #[serde(rename = "qrImage", skip_serializing_if = "Option::is_none")]
    pub qr_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertificateStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_fallbacks() {
        let cert: Certificate = serde_json::from_value(json!({ "_id": "abc" })).unwrap();
        assert_eq!(cert.record_id().as_deref(), Some("abc"));

        let cert: Certificate = serde_json::from_value(json!({ "id": 17, "_id": "abc" })).unwrap();
        assert_eq!(cert.record_id().as_deref(), Some("17"));

        let cert: Certificate = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cert.record_id(), None);
    }

    #[test]
    fn test_status_defaults_to_valid() {
        let cert: Certificate = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cert.status(), CertificateStatus::Valid);

        let cert: Certificate = serde_json::from_value(json!({ "status": "invalid" })).unwrap();
        assert_eq!(cert.status(), CertificateStatus::Invalid);
        assert_eq!(cert.status().toggled(), CertificateStatus::Valid);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let cert: Certificate =
            serde_json::from_value(json!({ "certificate_number": "C-1", "auditor": "Jane" })).unwrap();
        assert_eq!(cert.certificate_number.as_deref(), Some("C-1"));
        assert_eq!(cert.extra.get("auditor"), Some(&json!("Jane")));
    }

    #[test]
    fn test_scalar_fields_accept_any_type() {
        let cert: Certificate = serde_json::from_value(json!({
            "certificate_number": 12345,
            "standard": null,
            "scope": true,
            "date_of_issue": "2024-01-02",
            "qrImage": 7.5
        }))
        .unwrap();
        assert_eq!(cert.certificate_number.as_deref(), Some("12345"));
        assert_eq!(cert.standard, None);
        assert_eq!(cert.scope.as_deref(), Some("true"));
        assert_eq!(cert.qr_image.as_deref(), Some("7.5"));
        assert_eq!(cert.issue_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_dates_accept_timestamps() {
        let cert: Certificate = serde_json::from_value(json!({
            "date_of_issue": "2024-03-01T00:00:00.000Z",
            "date_of_expiry": "2027-02-28"
        }))
        .unwrap();
        assert_eq!(cert.issue_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(cert.expiry_date(), NaiveDate::from_ymd_opt(2027, 2, 28));

        let draft = cert.to_draft();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["date_of_issue"], "2024-03-01");
        assert_eq!(json["status"], "valid");
        assert!(json.get("recertification_due_date").is_none());
    }
}
