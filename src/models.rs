// src/models.rs

use rust_decimal::Decimal;
use serde::Serialize;

use crate::reconcile::DocumentWeights;

/// Placeholder for absent product names, NCM codes, units and supplier names.
pub const NOT_AVAILABLE: &str = "N/A";
/// Invoice number used when `ide/nNF` is missing.
pub const UNKNOWN_INVOICE_NUMBER: &str = "NFe_UNKNOWN";
/// Series used when `ide/serie` is missing.
pub const DEFAULT_SERIES: &str = "1";
/// Namespace of the Brazilian NF-e layout.
pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

/// The invoice issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supplier {
    pub name: String,
    /// CNPJ, or CPF for individual issuers. Empty when absent.
    pub tax_id: String,
    pub address: String,
}

/// Where a product line's weight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    TaxUnit,
    CommercialUnit,
    Description,
    /// No weight-bearing unit and no description match; weight is zero.
    None,
}

/// A single invoice line item with its resolved weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductLine {
    pub code: String,
    pub name: String,
    /// Mercosur tariff classification.
    pub ncm: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    /// Unit shown to users; the description's unit when it overrode the
    /// declared weight.
    pub unit: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight_kg: Decimal,
    pub weight_source: WeightSource,
}

/// Document-level invoice fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceHeader {
    pub number: String,
    pub series: String,
    /// `YYYY-MM-DD`; time of day is dropped.
    pub issue_date: String,
    #[serde(flatten)]
    pub weights: DocumentWeights,
}

/// Everything extracted from one fiscal document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedInvoice {
    pub supplier: Supplier,
    pub products: Vec<ProductLine>,
    pub invoice: InvoiceHeader,
}

impl ParsedInvoice {
    pub fn net_weight_kg(&self) -> Decimal {
        self.invoice.weights.net_weight_kg
    }

    pub fn gross_weight_kg(&self) -> Decimal {
        self.invoice.weights.gross_weight_kg
    }

    /// Number of product lines whose weight was corrected from the description.
    pub fn audited_lines(&self) -> usize {
        self.products
            .iter()
            .filter(|p| p.weight_source == WeightSource::Description)
            .count()
    }
}
