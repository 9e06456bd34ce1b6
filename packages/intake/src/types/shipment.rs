//! Shipment records and the typed payload they are built from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseStatusError;
use crate::error::{StoreError, StoreResult};

/// Fulfilment status of a shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError::new("shipment", s))
    }
}

/// Validated extraction output, ready to become a [`ShipmentRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPayload {
    pub customer_name: String,
    pub address: String,
    pub tracking_id: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub package_weight: Option<f64>,
    pub notes: Option<String>,
}

/// Where an extracted shipment came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentSource {
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub parsing_log_id: Option<Uuid>,
}

/// A persisted shipment (`shipment_orders` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub id: Uuid,
    pub customer_name: String,
    pub address: String,
    pub tracking_id: Option<String>,
    pub delivery_date: Option<NaiveDate>,

    /// Kilograms
    pub package_weight: Option<f64>,
    pub notes: Option<String>,
    pub status: ShipmentStatus,
    pub file_url: Option<String>,
    pub file_name: Option<String>,

    /// True when created by automated extraction
    pub parsed_by_ai: bool,

    /// Attempt that produced this record
    pub parsing_log_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentRecord {
    /// Build a pending, AI-parsed record from a validated payload.
    pub fn from_payload(payload: ShipmentPayload, source: ShipmentSource) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_name: payload.customer_name,
            address: payload.address,
            tracking_id: payload.tracking_id,
            delivery_date: payload.delivery_date,
            package_weight: payload.package_weight,
            notes: payload.notes,
            status: ShipmentStatus::Pending,
            file_url: source.file_url,
            file_name: source.file_name,
            parsed_by_ai: true,
            parsing_log_id: source.parsing_log_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the record-level invariants.
    pub fn validate(&self) -> StoreResult<()> {
        if self.customer_name.trim().is_empty() {
            return Err(StoreError::Invalid("customer_name must not be empty".into()));
        }
        if self.address.trim().is_empty() {
            return Err(StoreError::Invalid("address must not be empty".into()));
        }
        if let Some(weight) = self.package_weight {
            check_weight(weight).map_err(StoreError::Invalid)?;
        }
        Ok(())
    }

    /// Apply a manual edit.
    ///
    /// The record is only modified if the edited result still satisfies
    /// [`ShipmentRecord::validate`]; `updated_at` is bumped on success.
    pub fn apply_update(&mut self, update: ShipmentUpdate) -> StoreResult<()> {
        let mut edited = self.clone();
        if let Some(name) = update.customer_name {
            edited.customer_name = name;
        }
        if let Some(address) = update.address {
            edited.address = address;
        }
        if let Some(tracking_id) = update.tracking_id {
            edited.tracking_id = tracking_id;
        }
        if let Some(delivery_date) = update.delivery_date {
            edited.delivery_date = delivery_date;
        }
        if let Some(weight) = update.package_weight {
            edited.package_weight = weight;
        }
        if let Some(notes) = update.notes {
            edited.notes = notes;
        }
        if let Some(status) = update.status {
            edited.status = status;
        }
        if let Some(file_url) = update.file_url {
            edited.file_url = file_url;
        }
        if let Some(file_name) = update.file_name {
            edited.file_name = file_name;
        }
        if let Some(parsed_by_ai) = update.parsed_by_ai {
            edited.parsed_by_ai = parsed_by_ai;
        }
        edited.validate()?;
        edited.updated_at = Utc::now();
        *self = edited;
        Ok(())
    }
}

/// Weight must be a finite, non-negative number of kilograms.
pub fn check_weight(weight: f64) -> Result<(), String> {
    if !weight.is_finite() {
        return Err("package_weight must be a finite number".into());
    }
    if weight < 0.0 {
        return Err("package_weight must not be negative".into());
    }
    Ok(())
}

/// Manual edit of a shipment.
///
/// Absent fields are left alone; nullable fields use `Some(None)` (JSON
/// `null`) to clear the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub package_weight: Option<Option<f64>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ShipmentStatus>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub file_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_by_ai: Option<bool>,
}

impl ShipmentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ShipmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: Option<String>) -> Self {
        self.tracking_id = Some(tracking_id);
        self
    }

    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_package_weight(mut self, weight: Option<f64>) -> Self {
        self.package_weight = Some(weight);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// Distinguishes a missing key (outer None) from an explicit null (Some(None)).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Search/filter over the shipment table, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentFilter {
    /// Case-insensitive match on customer name, address or tracking id
    pub search: Option<String>,
    pub status: Option<ShipmentStatus>,
    pub parsed_by_ai: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ShipmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: ShipmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_parsed_by_ai(mut self, parsed_by_ai: bool) -> Self {
        self.parsed_by_ai = Some(parsed_by_ai);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Normalized search term, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Row-level match, ignoring limit/offset.
    pub fn matches(&self, record: &ShipmentRecord) -> bool {
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.parsed_by_ai.is_some_and(|p| p != record.parsed_by_ai) {
            return false;
        }
        match self.search_term() {
            None => true,
            Some(term) => [
                Some(record.customer_name.as_str()),
                Some(record.address.as_str()),
                record.tracking_id.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term)),
        }
    }
}
