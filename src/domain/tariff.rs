//! Tariff domain types.
//!
//! A fetch produces a `TariffDocument` of per-warehouse entries keyed by
//! warehouse name. Storage replaces names with stable `WarehouseId`s and
//! hands back `StoredTariff` rows joined with the name again.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage-generated surrogate key of a warehouse name.
pub type WarehouseId = i32;

/// The tariff values quoted for one warehouse on one day.
///
/// Values are kept verbatim as the provider formats them ("46,0", "-").
/// `None` means the provider sent nothing for the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffFields {
    pub box_delivery_base: Option<String>,
    pub box_delivery_coef_expr: Option<String>,
    pub box_delivery_liter: Option<String>,
    pub box_delivery_marketplace_base: Option<String>,
    pub box_delivery_marketplace_coef_expr: Option<String>,
    pub box_delivery_marketplace_liter: Option<String>,
    pub box_storage_base: Option<String>,
    pub box_storage_coef_expr: Option<String>,
    pub box_storage_liter: Option<String>,
    pub geo_name: Option<String>,
}

/// One provider entry, still addressed by warehouse name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffEntry {
    pub warehouse_name: String,
    #[serde(flatten)]
    pub fields: TariffFields,
}

/// A single day's tariff document as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TariffDocument {
    /// Date from which the next tariff set applies.
    pub next_box_date: Option<NaiveDate>,
    /// Last date the current tariffs are guaranteed for.
    pub till_max_date: Option<NaiveDate>,
    /// Per-warehouse entries in provider order, duplicates included.
    pub entries: Vec<TariffEntry>,
}

impl TariffDocument {
    /// Create a document from entries alone.
    pub fn from_entries(entries: Vec<TariffEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Distinct warehouse names in first-occurrence order.
    pub fn distinct_names(&self) -> Vec<String> {
        self.collapse_duplicates()
            .into_iter()
            .map(|e| e.warehouse_name)
            .collect()
    }

    /// One entry per warehouse name.
    ///
    /// A repeated name keeps the position of its first occurrence and
    /// takes the field values of its last occurrence.
    pub fn collapse_duplicates(&self) -> Vec<TariffEntry> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(self.entries.len());
        let mut collapsed: Vec<TariffEntry> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            match positions.get(entry.warehouse_name.as_str()) {
                Some(&index) => collapsed[index].fields = entry.fields.clone(),
                None => {
                    positions.insert(entry.warehouse_name.as_str(), collapsed.len());
                    collapsed.push(entry.clone());
                }
            }
        }

        collapsed
    }
}

/// A warehouse name together with its stable surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseIdentity {
    pub id: WarehouseId,
    pub name: String,
}

/// A tariff row ready for insertion, referencing a reconciled identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTariffRow {
    pub warehouse_id: WarehouseId,
    pub fields: TariffFields,
}

/// A persisted tariff row joined with its warehouse name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTariff {
    /// Storage-assigned row id; defines insertion order within a day.
    pub id: i64,
    #[serde(rename = "getDate")]
    pub date: NaiveDate,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    #[serde(flatten)]
    pub fields: TariffFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, coef: &str) -> TariffEntry {
        TariffEntry {
            warehouse_name: name.to_string(),
            fields: TariffFields {
                box_delivery_coef_expr: Some(coef.to_string()),
                ..TariffFields::default()
            },
        }
    }

    #[test]
    fn test_collapse_keeps_first_position_and_last_values() {
        let doc = TariffDocument::from_entries(vec![
            entry("Kazan", "100"),
            entry("Tula", "120"),
            entry("Kazan", "150"),
        ]);

        let collapsed = doc.collapse_duplicates();
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].warehouse_name, "Kazan");
        assert_eq!(
            collapsed[0].fields.box_delivery_coef_expr.as_deref(),
            Some("150")
        );
        assert_eq!(collapsed[1].warehouse_name, "Tula");
    }

    #[test]
    fn test_distinct_names_first_occurrence_order() {
        let doc = TariffDocument::from_entries(vec![
            entry("Tula", "1"),
            entry("Kazan", "2"),
            entry("Tula", "3"),
            entry("Koledino", "4"),
        ]);
        assert_eq!(doc.distinct_names(), vec!["Tula", "Kazan", "Koledino"]);
    }

    #[test]
    fn test_empty_document_collapses_to_nothing() {
        let doc = TariffDocument::default();
        assert!(doc.collapse_duplicates().is_empty());
        assert!(doc.distinct_names().is_empty());
    }

    #[test]
    fn test_stored_tariff_serializes_flat_camel_case() {
        let row = StoredTariff {
            id: 7,
            date: NaiveDate::from_ymd_opt(2026, 2, 25).unwrap(),
            warehouse_id: 3,
            warehouse_name: "Kazan".to_string(),
            fields: TariffFields {
                geo_name: Some("Volga".to_string()),
                ..TariffFields::default()
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["warehouseName"], "Kazan");
        assert_eq!(json["getDate"], "2026-02-25");
        assert_eq!(json["geoName"], "Volga");
        assert!(json["boxDeliveryBase"].is_null());
    }
}
