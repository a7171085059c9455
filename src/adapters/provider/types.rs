//! Tariff API Response Types
//!
//! The box-tariff endpoint wraps its payload as
//! `{"response": {"data": {"dtNextBox", "dtTillMax", "warehouseList"}}}`.
//! Tariff values usually arrive as strings ("46,0", "-") but numbers are
//! accepted too and kept in their textual form.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::domain::tariff::{TariffDocument, TariffEntry, TariffFields};
use crate::error::{SyncError, SyncResult};

/// Outer response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffEnvelope {
    pub response: TariffResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TariffResponse {
    pub data: BoxTariffs,
}

/// Box tariff payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxTariffs {
    #[serde(default)]
    pub dt_next_box: Option<String>,
    #[serde(default)]
    pub dt_till_max: Option<String>,
    pub warehouse_list: Vec<WarehouseTariff>,
}

/// One warehouse's tariff entry as sent on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseTariff {
    pub warehouse_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_base: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_coef_expr: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_liter: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_marketplace_base: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_marketplace_coef_expr: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_delivery_marketplace_liter: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_storage_base: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_storage_coef_expr: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub box_storage_liter: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub geo_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    }))
}

impl From<WarehouseTariff> for TariffEntry {
    fn from(w: WarehouseTariff) -> Self {
        Self {
            warehouse_name: w.warehouse_name,
            fields: TariffFields {
                box_delivery_base: w.box_delivery_base,
                box_delivery_coef_expr: w.box_delivery_coef_expr,
                box_delivery_liter: w.box_delivery_liter,
                box_delivery_marketplace_base: w.box_delivery_marketplace_base,
                box_delivery_marketplace_coef_expr: w.box_delivery_marketplace_coef_expr,
                box_delivery_marketplace_liter: w.box_delivery_marketplace_liter,
                box_storage_base: w.box_storage_base,
                box_storage_coef_expr: w.box_storage_coef_expr,
                box_storage_liter: w.box_storage_liter,
                geo_name: w.geo_name,
            },
        }
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

/// Decode a response body into a domain document.
///
/// # Errors
/// `ProviderContractViolation` if the body is not the expected envelope
/// or an entry has a blank warehouse name.
pub fn parse_document(body: &[u8]) -> SyncResult<TariffDocument> {
    let envelope: TariffEnvelope = serde_json::from_slice(body)
        .map_err(|e| SyncError::ProviderContractViolation(e.to_string()))?;
    let data = envelope.response.data;

    let mut entries = Vec::with_capacity(data.warehouse_list.len());
    for (index, warehouse) in data.warehouse_list.into_iter().enumerate() {
        let name = warehouse.warehouse_name.trim();
        if name.is_empty() {
            return Err(SyncError::ProviderContractViolation(format!(
                "warehouseList[{index}] has an empty warehouseName"
            )));
        }
        let mut entry = TariffEntry::from(warehouse);
        entry.warehouse_name = entry.warehouse_name.trim().to_string();
        entries.push(entry);
    }

    Ok(TariffDocument {
        next_box_date: parse_date(data.dt_next_box.as_deref()),
        till_max_date: parse_date(data.dt_till_max.as_deref()),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "response": {
            "data": {
                "dtNextBox": "2026-03-01",
                "dtTillMax": "2026-02-28",
                "warehouseList": [
                    {
                        "boxDeliveryBase": "48",
                        "boxDeliveryCoefExpr": "160",
                        "boxDeliveryLiter": "11,2",
                        "boxDeliveryMarketplaceBase": "-",
                        "boxDeliveryMarketplaceCoefExpr": "-",
                        "boxDeliveryMarketplaceLiter": "-",
                        "boxStorageBase": "0,14",
                        "boxStorageCoefExpr": "115",
                        "boxStorageLiter": "0,14",
                        "geoName": "Центральный федеральный округ",
                        "warehouseName": "Коледино"
                    },
                    {
                        "boxDeliveryCoefExpr": 95,
                        "warehouseName": " Казань "
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_sample_document() {
        let doc = parse_document(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.next_box_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(doc.till_max_date, NaiveDate::from_ymd_opt(2026, 2, 28));
        assert_eq!(doc.entries.len(), 2);

        let first = &doc.entries[0];
        assert_eq!(first.warehouse_name, "Коледино");
        assert_eq!(first.fields.box_delivery_liter.as_deref(), Some("11,2"));
        assert_eq!(first.fields.box_delivery_marketplace_base.as_deref(), Some("-"));
    }

    #[test]
    fn test_numbers_kept_as_text_and_missing_fields_null() {
        let doc = parse_document(SAMPLE.as_bytes()).unwrap();
        let second = &doc.entries[1];
        assert_eq!(second.warehouse_name, "Казань");
        assert_eq!(second.fields.box_delivery_coef_expr.as_deref(), Some("95"));
        assert_eq!(second.fields.geo_name, None);
    }

    #[test]
    fn test_missing_envelope_is_contract_violation() {
        let err = parse_document(br#"{"data": {"warehouseList": []}}"#).unwrap_err();
        assert!(matches!(err, SyncError::ProviderContractViolation(_)));
    }

    #[test]
    fn test_blank_warehouse_name_is_contract_violation() {
        let body = br#"{"response":{"data":{"warehouseList":[{"warehouseName":"  "}]}}}"#;
        let err = parse_document(body).unwrap_err();
        assert!(matches!(err, SyncError::ProviderContractViolation(_)));
    }

    #[test]
    fn test_empty_list_is_valid() {
        let body = br#"{"response":{"data":{"dtNextBox":"","dtTillMax":"","warehouseList":[]}}}"#;
        let doc = parse_document(body).unwrap();
        assert!(doc.entries.is_empty());
        assert_eq!(doc.next_box_date, None);
    }
}
