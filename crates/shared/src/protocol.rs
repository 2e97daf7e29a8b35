//! Wire payloads of the sessions API and the envelope boundary that turns
//! loosely shaped JSON bodies into tagged outcomes.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{Pagination, Principal, PrincipalKind, SessionRecord, StatsSnapshot, UserId},
    error::extract_message,
};

/// Number-or-string field as the backend emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Zero, NaN and blank text count as "not provided".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Float(v) => *v == 0.0 || v.is_nan(),
            Self::Text(v) => v.trim().is_empty(),
        }
    }

    pub fn as_count(&self) -> u64 {
        match self {
            Self::Int(v) => *v,
            Self::Float(v) if *v > 0.0 => *v as u64,
            Self::Float(_) => 0,
            Self::Text(v) => v.trim().parse().unwrap_or(0),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

fn present(value: &Option<Scalar>) -> Option<&Scalar> {
    value.as_ref().filter(|v| !v.is_blank())
}

fn count_or_zero(value: &Option<Scalar>) -> u64 {
    present(value).map(Scalar::as_count).unwrap_or(0)
}

fn text_or(value: &Option<Scalar>, fallback: &str) -> String {
    present(value)
        .map(ToString::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn hours_or_zero(value: &Option<Scalar>) -> String {
    present(value)
        .map(|v| format!("{v}h"))
        .unwrap_or_else(|| "0h".to_string())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ProfilePayload {
    /// Canonical principal. Name falls back to first+last name, then email;
    /// role falls back to the kind the token selected.
    pub fn into_principal(self, kind: PrincipalKind) -> Principal {
        let full_name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string();
        let name = non_blank(self.name)
            .or_else(|| non_blank(Some(full_name)))
            .or_else(|| self.email.clone())
            .unwrap_or_default();

        Principal {
            id: non_blank(self.object_id).or_else(|| non_blank(self.id)).map(UserId),
            name,
            email: self.email,
            role: non_blank(self.role).unwrap_or_else(|| kind.as_str().to_string()),
            first_name: self.first_name,
            last_name: self.last_name,
            department: self.department,
            designation: self.designation,
            phone: self.phone,
            address: self.address,
            profile_image: self.profile_image,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPayload {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pages: Option<u32>,
}

impl PaginationPayload {
    /// Admin lists: the server cursor replaces ours field by field.
    pub fn replace(self, current: Pagination) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(current.page).max(1),
            limit: self.limit.unwrap_or(current.limit).max(1),
            total: self.total.unwrap_or(current.total),
            pages: self.pages.unwrap_or(current.pages),
        }
    }

    /// Employee lists only report totals; page and limit stay local.
    pub fn merge_totals(self, current: Pagination, listed: usize) -> Pagination {
        Pagination {
            total: self.total.filter(|t| *t > 0).unwrap_or(listed as u64),
            pages: self.pages.filter(|p| *p > 0).unwrap_or(1),
            ..current
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsPayload {
    #[serde(default)]
    pub total_sessions: Option<Scalar>,
    #[serde(default)]
    pub active_sessions: Option<Scalar>,
    #[serde(default)]
    pub avg_duration: Option<Scalar>,
    #[serde(default)]
    pub attendance_rate: Option<Scalar>,
}

impl AdminStatsPayload {
    pub fn into_snapshot(self) -> StatsSnapshot {
        StatsSnapshot {
            total_sessions: count_or_zero(&self.total_sessions),
            active_sessions: count_or_zero(&self.active_sessions),
            avg_duration: text_or(&self.avg_duration, "0h"),
            attendance_rate: text_or(&self.attendance_rate, "0%"),
            ..StatsSnapshot::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStatsPayload {
    #[serde(default)]
    pub total_sessions: Option<Scalar>,
    #[serde(default)]
    pub total_hours_worked: Option<Scalar>,
    #[serde(default)]
    pub days_clocked_in: Option<Scalar>,
    #[serde(default)]
    pub attendance_rate: Option<Scalar>,
    #[serde(default)]
    pub total_duration_hours: Option<Scalar>,
}

impl EmployeeStatsPayload {
    pub fn into_snapshot(self) -> StatsSnapshot {
        StatsSnapshot {
            total_sessions: count_or_zero(&self.total_sessions),
            total_hours: hours_or_zero(&self.total_hours_worked),
            days_clocked_in: count_or_zero(&self.days_clocked_in),
            attendance_rate: text_or(&self.attendance_rate, "0%"),
            avg_duration: hours_or_zero(&self.total_duration_hours),
            ..StatsSnapshot::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPage {
    pub sessions: Vec<SessionRecord>,
    pub pagination: Option<PaginationPayload>,
}

/// Which of the accepted envelope layouts a body used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `{ "success": true, "data": ... }`
    SuccessFlag,
    /// `{ "status": "success", "data": ... }`
    StatusField,
    /// The payload itself, no wrapper.
    Raw,
}

const FAILURE_STATUSES: &[&str] = &["error", "fail", "failed", "failure"];

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success {
        shape: EnvelopeShape,
        data: Value,
        pagination: Option<PaginationPayload>,
        message: Option<String>,
    },
    Rejected {
        message: Option<String>,
    },
}

/// Tagged per-endpoint result once the envelope payload has been decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success {
        shape: EnvelopeShape,
        data: T,
        pagination: Option<PaginationPayload>,
        message: Option<String>,
    },
    Rejected {
        message: Option<String>,
    },
    Malformed {
        reason: String,
    },
}

impl<T> ApiOutcome<T> {
    pub fn into_result(self) -> Result<T, ApiOutcome<T>> {
        match self {
            Self::Success { data, .. } => Ok(data),
            other => Err(other),
        }
    }
}

fn take_payload(obj: &mut Map<String, Value>) -> Value {
    match obj.remove("user").filter(|v| !v.is_null()) {
        Some(user) => user,
        None => obj.remove("data").unwrap_or(Value::Null),
    }
}

fn take_pagination(obj: &Map<String, Value>) -> Option<PaginationPayload> {
    obj.get("pagination")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

impl Envelope {
    /// Classifies a response body. The payload sits under `user` or `data`
    /// for wrapped shapes; a raw object with a `user` key is unwrapped too.
    pub fn parse(body: Value) -> Self {
        let Value::Object(mut obj) = body else {
            return Self::Success {
                shape: EnvelopeShape::Raw,
                data: body,
                pagination: None,
                message: None,
            };
        };
        let message = extract_message(&Value::Object(obj.clone()));

        if let Some(flag) = obj.get("success").and_then(Value::as_bool) {
            if !flag {
                return Self::Rejected { message };
            }
            let pagination = take_pagination(&obj);
            return Self::Success {
                shape: EnvelopeShape::SuccessFlag,
                data: take_payload(&mut obj),
                pagination,
                message,
            };
        }

        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase);
        match status.as_deref() {
            Some("success") => {
                let pagination = take_pagination(&obj);
                Self::Success {
                    shape: EnvelopeShape::StatusField,
                    data: take_payload(&mut obj),
                    pagination,
                    message,
                }
            }
            Some(s) if FAILURE_STATUSES.contains(&s) => Self::Rejected { message },
            _ => {
                let data = match obj.remove("user") {
                    Some(user) if !user.is_null() => user,
                    _ => Value::Object(obj),
                };
                Self::Success {
                    shape: EnvelopeShape::Raw,
                    data,
                    pagination: None,
                    message: None,
                }
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> ApiOutcome<T> {
        match self {
            Self::Rejected { message } => ApiOutcome::Rejected { message },
            Self::Success {
                shape,
                data,
                pagination,
                message,
            } => match serde_json::from_value(data) {
                Ok(data) => ApiOutcome::Success {
                    shape,
                    data,
                    pagination,
                    message,
                },
                Err(err) => ApiOutcome::Malformed {
                    reason: err.to_string(),
                },
            },
        }
    }

    /// Like [`Envelope::decode`] but a missing/null payload is an empty list.
    pub fn decode_list<T: DeserializeOwned>(self) -> ApiOutcome<Vec<T>> {
        match self {
            Self::Success {
                shape,
                data: Value::Null,
                pagination,
                message,
            } => ApiOutcome::Success {
                shape,
                data: Vec::new(),
                pagination,
                message,
            },
            other => other.decode(),
        }
    }

    /// Profiles must carry an object; `null` or scalars are malformed.
    pub fn decode_profile(self, kind: PrincipalKind) -> ApiOutcome<Principal> {
        match self {
            Self::Success { ref data, .. } if !data.is_object() => ApiOutcome::Malformed {
                reason: "profile payload is not an object".to_string(),
            },
            other => match other.decode::<ProfilePayload>() {
                ApiOutcome::Success {
                    shape,
                    data,
                    pagination,
                    message,
                } => ApiOutcome::Success {
                    shape,
                    data: data.into_principal(kind),
                    pagination,
                    message,
                },
                ApiOutcome::Rejected { message } => ApiOutcome::Rejected { message },
                ApiOutcome::Malformed { reason } => ApiOutcome::Malformed { reason },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_success_flag_envelope_with_pagination() {
        let body = json!({
            "success": true,
            "data": [{"id": "s1", "isActive": true}],
            "pagination": {"page": 1, "limit": 20, "total": 1, "pages": 1}
        });
        match Envelope::parse(body).decode_list::<SessionRecord>() {
            ApiOutcome::Success {
                shape,
                data,
                pagination,
                ..
            } => {
                assert_eq!(shape, EnvelopeShape::SuccessFlag);
                assert_eq!(data.len(), 1);
                assert!(data[0].is_active);
                assert_eq!(pagination.and_then(|p| p.total), Some(1));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn accepts_status_field_envelope() {
        let body = json!({"status": "success", "data": {"totalSessions": 4}});
        let outcome = Envelope::parse(body).decode::<AdminStatsPayload>();
        let ApiOutcome::Success { shape, data, .. } = outcome else {
            panic!("expected success");
        };
        assert_eq!(shape, EnvelopeShape::StatusField);
        assert_eq!(data.into_snapshot().total_sessions, 4);
    }

    #[test]
    fn raw_session_with_status_is_not_an_envelope() {
        let body = json!({"_id": "abc", "status": "active", "isClockedIn": true});
        let outcome = Envelope::parse(body).decode::<Option<SessionRecord>>();
        let ApiOutcome::Success { shape, data, .. } = outcome else {
            panic!("expected success");
        };
        assert_eq!(shape, EnvelopeShape::Raw);
        let record = data.expect("record");
        assert_eq!(record.id.map(|id| id.0).as_deref(), Some("abc"));
        assert!(record.is_clocked_in);
    }

    #[test]
    fn rejections_carry_server_message() {
        let outcome = Envelope::parse(json!({"success": false, "message": "nope"}))
            .decode::<Value>();
        assert_eq!(
            outcome,
            ApiOutcome::Rejected {
                message: Some("nope".into())
            }
        );
        let outcome = Envelope::parse(json!({"status": "error"})).decode::<Value>();
        assert_eq!(outcome, ApiOutcome::Rejected { message: None });
    }

    #[test]
    fn mismatched_payload_is_malformed() {
        let outcome = Envelope::parse(json!({"success": true, "data": {"not": "a list"}}))
            .decode_list::<SessionRecord>();
        assert!(matches!(outcome, ApiOutcome::Malformed { .. }));
    }

    #[test]
    fn null_list_payload_is_empty() {
        let outcome = Envelope::parse(json!({"success": true})).decode_list::<SessionRecord>();
        assert!(matches!(outcome, ApiOutcome::Success { ref data, .. } if data.is_empty()));
    }

    #[test]
    fn documents_with_both_id_keys_decode() {
        let body = json!({
            "success": true,
            "data": [
                {"_id": "abc", "id": "abc", "isActive": true},
                {"_id": "def", "id": null},
                {"_id": "ghi", "id": ""}
            ]
        });
        let sessions = Envelope::parse(body)
            .decode_list::<SessionRecord>()
            .into_result()
            .expect("sessions");
        let ids: Vec<_> = sessions
            .iter()
            .map(|s| s.id.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(
            ids,
            vec![Some("abc".into()), Some("def".into()), Some("ghi".into())]
        );
        assert!(sessions[0].is_active);

        let profile = json!({"success": true, "user": {"_id": "u1", "id": "u1", "name": "Ada"}});
        let principal = Envelope::parse(profile)
            .decode_profile(PrincipalKind::Employee)
            .into_result()
            .expect("principal");
        assert_eq!(principal.id, Some(UserId::from("u1")));
    }

    #[test]
    fn null_flags_read_as_false() {
        let body = json!({
            "success": true,
            "data": [{
                "_id": "s1",
                "isActive": null,
                "isClockedIn": null,
                "isClockedOut": null,
                "autoLogout": null,
                "device": null
            }]
        });
        let sessions = Envelope::parse(body)
            .decode_list::<SessionRecord>()
            .into_result()
            .expect("sessions");
        let record = &sessions[0];
        assert!(!record.is_active && !record.is_clocked_in && !record.is_clocked_out);
        assert!(!record.auto_logout);
        assert_eq!(record.device, None);
    }

    #[test]
    fn profile_prefers_user_then_data_then_raw() {
        let wrapped = json!({"success": true, "user": {"_id": "u1", "firstName": "Ada", "lastName": "King"}});
        let principal = Envelope::parse(wrapped)
            .decode_profile(PrincipalKind::Employee)
            .into_result()
            .expect("principal");
        assert_eq!(principal.name, "Ada King");
        assert_eq!(principal.role, "employee");

        let raw = json!({"_id": "a1", "email": "root@example.com", "role": "superadmin"});
        let principal = Envelope::parse(raw)
            .decode_profile(PrincipalKind::Admin)
            .into_result()
            .expect("principal");
        assert_eq!(principal.name, "root@example.com");
        assert_eq!(principal.role, "superadmin");
    }

    #[test]
    fn null_profile_is_malformed() {
        let outcome = Envelope::parse(json!({"success": true, "data": null}))
            .decode_profile(PrincipalKind::Admin);
        assert!(matches!(outcome, ApiOutcome::Malformed { .. }));
    }

    #[test]
    fn stats_default_to_neutral_values() {
        let admin = AdminStatsPayload::default().into_snapshot();
        assert_eq!(admin, StatsSnapshot::default());

        let employee: EmployeeStatsPayload =
            serde_json::from_value(json!({"totalHoursWorked": 0, "attendanceRate": ""}))
                .expect("payload");
        let snapshot = employee.into_snapshot();
        assert_eq!(snapshot.total_hours, "0h");
        assert_eq!(snapshot.avg_duration, "0h");
        assert_eq!(snapshot.attendance_rate, "0%");
        assert_eq!(snapshot.days_clocked_in, 0);
    }

    #[test]
    fn employee_stats_format_hours() {
        let employee: EmployeeStatsPayload = serde_json::from_value(json!({
            "totalSessions": "12",
            "totalHoursWorked": 37.5,
            "daysClockedIn": 9,
            "attendanceRate": "90%",
            "totalDurationHours": 4
        }))
        .expect("payload");
        let snapshot = employee.into_snapshot();
        assert_eq!(snapshot.total_sessions, 12);
        assert_eq!(snapshot.total_hours, "37.5h");
        assert_eq!(snapshot.avg_duration, "4h");
        assert_eq!(snapshot.days_clocked_in, 9);
    }

    #[test]
    fn employee_pagination_merges_totals_only() {
        let current = Pagination {
            page: 2,
            limit: 20,
            total: 0,
            pages: 0,
        };
        let merged = PaginationPayload {
            page: Some(9),
            limit: Some(5),
            total: None,
            pages: None,
        }
        .merge_totals(current, 7);
        assert_eq!(merged.page, 2);
        assert_eq!(merged.limit, 20);
        assert_eq!(merged.total, 7);
        assert_eq!(merged.pages, 1);
    }
}
