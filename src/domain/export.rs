//! Export column contract and grid projection.
//!
//! Spreadsheet consumers depend on a fixed column order and header
//! naming that is independent of how rows are stored. `ColumnContract`
//! carries that order; `project` pivots a day's rows into an
//! `ExportGrid` following it.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tariff::StoredTariff;

/// A single exported cell. `None` is sent as JSON `null`.
pub type Cell = Option<String>;

/// Fields that can appear in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportField {
    #[serde(rename = "boxDeliveryBase")]
    BoxDeliveryBase,
    #[serde(rename = "boxDeliveryCoefExpr")]
    BoxDeliveryCoefExpr,
    #[serde(rename = "boxDeliveryLiter")]
    BoxDeliveryLiter,
    #[serde(rename = "boxDeliveryMarketplaceBase")]
    BoxDeliveryMarketplaceBase,
    #[serde(rename = "boxDeliveryMarketplaceCoefExpr")]
    BoxDeliveryMarketplaceCoefExpr,
    #[serde(rename = "boxDeliveryMarketplaceLiter")]
    BoxDeliveryMarketplaceLiter,
    #[serde(rename = "boxStorageBase")]
    BoxStorageBase,
    #[serde(rename = "boxStorageCoefExpr")]
    BoxStorageCoefExpr,
    #[serde(rename = "boxStorageLiter")]
    BoxStorageLiter,
    #[serde(rename = "geoName")]
    GeoName,
    #[serde(rename = "warehouseName")]
    WarehouseName,
}

impl ExportField {
    /// Every exportable field, in the default contract order.
    pub const ALL: [Self; 11] = [
        Self::BoxDeliveryBase,
        Self::BoxDeliveryCoefExpr,
        Self::BoxDeliveryLiter,
        Self::BoxDeliveryMarketplaceBase,
        Self::BoxDeliveryMarketplaceCoefExpr,
        Self::BoxDeliveryMarketplaceLiter,
        Self::BoxStorageBase,
        Self::BoxStorageCoefExpr,
        Self::BoxStorageLiter,
        Self::GeoName,
        Self::WarehouseName,
    ];

    /// Provider-side key of the field.
    pub const fn key(self) -> &'static str {
        match self {
            Self::BoxDeliveryBase => "boxDeliveryBase",
            Self::BoxDeliveryCoefExpr => "boxDeliveryCoefExpr",
            Self::BoxDeliveryLiter => "boxDeliveryLiter",
            Self::BoxDeliveryMarketplaceBase => "boxDeliveryMarketplaceBase",
            Self::BoxDeliveryMarketplaceCoefExpr => "boxDeliveryMarketplaceCoefExpr",
            Self::BoxDeliveryMarketplaceLiter => "boxDeliveryMarketplaceLiter",
            Self::BoxStorageBase => "boxStorageBase",
            Self::BoxStorageCoefExpr => "boxStorageCoefExpr",
            Self::BoxStorageLiter => "boxStorageLiter",
            Self::GeoName => "geoName",
            Self::WarehouseName => "warehouseName",
        }
    }

    /// Extract this field's value from a stored row.
    pub fn value(self, row: &StoredTariff) -> Option<&str> {
        let fields = &row.fields;
        let value = match self {
            Self::BoxDeliveryBase => &fields.box_delivery_base,
            Self::BoxDeliveryCoefExpr => &fields.box_delivery_coef_expr,
            Self::BoxDeliveryLiter => &fields.box_delivery_liter,
            Self::BoxDeliveryMarketplaceBase => &fields.box_delivery_marketplace_base,
            Self::BoxDeliveryMarketplaceCoefExpr => &fields.box_delivery_marketplace_coef_expr,
            Self::BoxDeliveryMarketplaceLiter => &fields.box_delivery_marketplace_liter,
            Self::BoxStorageBase => &fields.box_storage_base,
            Self::BoxStorageCoefExpr => &fields.box_storage_coef_expr,
            Self::BoxStorageLiter => &fields.box_storage_liter,
            Self::GeoName => &fields.geo_name,
            Self::WarehouseName => return Some(row.warehouse_name.as_str()),
        };
        value.as_deref()
    }
}

/// One column of the export: which field, under which header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    pub field: ExportField,
    pub header: String,
}

/// Errors from building a column contract.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("column contract has no columns")]
    Empty,
    #[error("column {0} appears more than once")]
    DuplicateField(&'static str),
    #[error("column {0} has an empty header")]
    EmptyHeader(&'static str),
    #[error("invalid column contract file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The ordered list of exported columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnContract {
    columns: Vec<ExportColumn>,
}

#[derive(Deserialize)]
struct ContractFile {
    columns: Vec<ExportColumn>,
}

impl ColumnContract {
    /// Build a contract, rejecting empty or duplicate columns.
    pub fn new(columns: Vec<ExportColumn>) -> Result<Self, ContractError> {
        if columns.is_empty() {
            return Err(ContractError::Empty);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.field) {
                return Err(ContractError::DuplicateField(column.field.key()));
            }
            if column.header.trim().is_empty() {
                return Err(ContractError::EmptyHeader(column.field.key()));
            }
        }
        Ok(Self { columns })
    }

    /// Parse a contract file of `[[columns]]` tables.
    ///
    /// ```toml
    /// [[columns]]
    /// field = "warehouseName"
    /// header = "Warehouse"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ContractError> {
        let file: ContractFile = toml::from_str(content)?;
        Self::new(file.columns)
    }

    pub fn columns(&self) -> &[ExportColumn] {
        &self.columns
    }

    /// Header row in contract order.
    pub fn header_row(&self) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|c| Some(c.header.clone()))
            .collect()
    }

    /// Data row for one stored tariff in contract order.
    pub fn data_row(&self, row: &StoredTariff) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|c| c.field.value(row).map(str::to_string))
            .collect()
    }
}

impl Default for ColumnContract {
    /// All fields, headed by their provider keys.
    fn default() -> Self {
        Self {
            columns: ExportField::ALL
                .iter()
                .map(|&field| ExportColumn {
                    field,
                    header: field.key().to_string(),
                })
                .collect(),
        }
    }
}

/// Rectangular export grid: header row followed by data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExportGrid {
    rows: Vec<Vec<Cell>>,
}

impl ExportGrid {
    pub fn header(&self) -> &[Cell] {
        &self.rows[0]
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        &self.rows[1..]
    }

    /// All rows including the header.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }
}

/// Numeric sort key of a coefficient expression.
///
/// Accepts both `,` and `.` as the decimal separator and ignores
/// surrounding whitespace. Placeholders such as `-` yield `None`.
pub fn coefficient_key(raw: Option<&str>) -> Option<Decimal> {
    let normalized = raw?.trim().replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

/// Order rows by delivery coefficient, highest first.
///
/// Stable: ties keep their incoming (storage) order. Rows without a
/// numeric coefficient go last.
pub fn sort_by_delivery_coefficient(rows: &mut [StoredTariff]) {
    rows.sort_by(|a, b| {
        let ka = coefficient_key(a.fields.box_delivery_coef_expr.as_deref());
        let kb = coefficient_key(b.fields.box_delivery_coef_expr.as_deref());
        // `None < Some` for Option, so descending order puts `None` last.
        kb.cmp(&ka)
    });
}

/// Pivot a day's rows into an export grid.
///
/// `rows` must be in storage order; the result is sorted by delivery
/// coefficient descending.
pub fn project(mut rows: Vec<StoredTariff>, contract: &ColumnContract) -> ExportGrid {
    sort_by_delivery_coefficient(&mut rows);

    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(contract.header_row());
    grid.extend(rows.iter().map(|row| contract.data_row(row)));

    ExportGrid { rows: grid }
}
