use serde::{Deserialize, Serialize};

/// The class of device a visitor reached the store from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Desktop,
    Iphone,
    Android,
}

/// A session row as stored in the record store, keyed by client IP.
///
/// One session per IP is a deliberate simplification of the identity model;
/// the fingerprint is an attribute, not a key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub ip: String,
    /// `true` = active, `false` = inactive.
    #[serde(default)]
    pub status: Option<bool>,
    /// Write-once latch: once `true`, no update path may reset it.
    #[serde(rename = "createOrder", default)]
    pub create_order: Option<bool>,
    #[serde(rename = "lastActivity", default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_content: Option<String>,
    #[serde(default)]
    pub utm_term: Option<String>,
    #[serde(rename = "lastPage", default)]
    pub last_page: Option<String>,
    #[serde(rename = "deviceType", default)]
    pub device_type: Option<DeviceType>,
    #[serde(rename = "fingerPrint", default)]
    pub finger_print: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: Option<String>,
}

/// The attribution fields captured when a session is first created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_campaign: String,
    #[serde(default)]
    pub utm_medium: String,
    #[serde(default)]
    pub utm_content: String,
    #[serde(default)]
    pub utm_term: String,
    #[serde(rename = "lastPage", default)]
    pub last_page: String,
    #[serde(rename = "deviceType", default)]
    pub device_type: DeviceType,
    #[serde(rename = "fingerPrint", default)]
    pub finger_print: String,
    #[serde(default)]
    pub metadata: String,
}

/// An incremental session update. Every field is optional; absent fields are
/// left untouched by the patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(rename = "createOrder", skip_serializing_if = "Option::is_none")]
    pub create_order: Option<bool>,
    #[serde(rename = "lastActivity", skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(rename = "lastPage", skip_serializing_if = "Option::is_none")]
    pub last_page: Option<String>,
    #[serde(rename = "deviceType", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(rename = "fingerPrint", skip_serializing_if = "Option::is_none")]
    pub finger_print: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// The identity returned by a session update. `id == 0` is the benign
/// sentinel for "no session for that IP, nothing was patched".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    #[serde(rename = "Id")]
    pub id: i64,
}

impl UpdateOutcome {
    pub const NO_OP: UpdateOutcome = UpdateOutcome { id: 0 };

    pub fn is_no_op(&self) -> bool {
        self.id == 0
    }
}
