use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Stable identifier of a purchasable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(String);

impl SkuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the SKU from a catalog record: the product id when present,
    /// otherwise the product name.
    pub fn from_catalog(id: Option<&str>, name: &str) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::new(name.trim()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SkuId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SkuId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Display-only fields carried alongside a cart line.
///
/// The engine never branches on these; they round-trip untouched from the
/// catalog to the order snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineMetadata(BTreeMap<String, String>);

impl LineMetadata {
    pub const NAME: &'static str = "name";
    pub const IMAGE: &'static str = "image";
    pub const DIETARY: &'static str = "dietary";
    pub const SOURCE: &'static str = "source";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(Self::NAME)
    }

    pub fn image(&self) -> Option<&str> {
        self.get(Self::IMAGE)
    }

    pub fn dietary(&self) -> Option<&str> {
        self.get(Self::DIETARY)
    }

    /// Restaurant or supplier the item was picked from.
    pub fn source(&self) -> Option<&str> {
        self.get(Self::SOURCE)
    }
}

/// One SKU in a cart, with its unit price and quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku: SkuId,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub metadata: LineMetadata,
}

impl CartLine {
    pub fn new(sku: impl Into<SkuId>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            unit_price,
            quantity,
            metadata: LineMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: LineMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// SKU and quantity pair moved in and out of the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub sku: SkuId,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(sku: impl Into<SkuId>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

impl From<&CartLine> for StockLine {
    fn from(line: &CartLine) -> Self {
        Self::new(line.sku.clone(), line.quantity)
    }
}

/// Converts cart lines into the stock movements they imply.
pub fn stock_lines(lines: &[CartLine]) -> Vec<StockLine> {
    lines.iter().map(StockLine::from).collect()
}
