// Normalizes NF-e fiscal invoice documents into product lines with an
// authoritative weight in kilograms.

pub mod config;
pub mod error;
pub mod fields;
pub mod heuristics;
pub mod models;
pub mod nfe;
pub mod reconcile;
pub mod resolver;
pub mod units;

pub use config::{Config, EngineSettings};
pub use error::EngineError;
pub use heuristics::{AuditedWeight, audit_description};
pub use models::{
    DEFAULT_SERIES, InvoiceHeader, NFE_NAMESPACE, NOT_AVAILABLE, ParsedInvoice, ProductLine,
    Supplier, UNKNOWN_INVOICE_NUMBER, WeightSource,
};
pub use nfe::{parse_nfe_str, parse_nfe_xml};
pub use reconcile::{DocumentWeights, VolumeWeight, WeightOrigin};
pub use units::{Unit, UnitQuantity};
