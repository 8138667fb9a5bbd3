// src/nfe.rs

use roxmltree::{Document, Node};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::error::{EngineError, Result};
use crate::fields::{FieldReader, Scope};
use crate::models::{
    DEFAULT_SERIES, InvoiceHeader, NOT_AVAILABLE, ParsedInvoice, ProductLine, Supplier,
    UNKNOWN_INVOICE_NUMBER,
};
use crate::reconcile::{VolumeWeight, reconcile};
use crate::resolver::{ItemInputs, resolve_pricing, resolve_weight};
use crate::units::{Unit, UnitQuantity};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Address parts of `enderEmit`, in display order.
const ADDRESS_FIELDS: [&str; 7] = ["xLgr", "nro", "xCpl", "xBairro", "xMun", "UF", "CEP"];

/// Parses raw NF-e bytes into a normalized invoice.
pub fn parse_nfe_xml(bytes: &[u8], settings: &EngineSettings) -> Result<ParsedInvoice> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(EngineError::syntax)?;
    parse_nfe_str(text, settings)
}

/// Parses an NF-e document held in a string.
pub fn parse_nfe_str(xml: &str, settings: &EngineSettings) -> Result<ParsedInvoice> {
    let doc = Document::parse(xml).map_err(EngineError::syntax)?;
    let (inf, scope) = locate_invoice(&doc, &settings.namespace).ok_or(EngineError::SchemaNotRecognized)?;
    assemble(inf, FieldReader::new(scope), settings)
}

/// Finds `infNFe`, first qualified with the root's default namespace (or
/// `fallback_ns` when none is declared), then among un-namespaced elements.
/// The winning scope is used for every later lookup in the document.
fn locate_invoice<'a, 'input>(
    doc: &'a Document<'input>,
    fallback_ns: &'a str,
) -> Option<(Node<'a, 'input>, Scope<'a>)> {
    let root = doc.root_element();
    let uri = root.lookup_namespace_uri(None).unwrap_or(fallback_ns);

    [Scope::Namespaced(uri), Scope::Plain]
        .into_iter()
        .find_map(|scope| {
            let found = scope.descendant(root, "infNFe");
            if found.is_none() {
                debug!(scope = ?scope, "<infNFe> not found in scope");
            }
            found.map(|inf| (inf, scope))
        })
}

fn assemble(inf: Node, reader: FieldReader, settings: &EngineSettings) -> Result<ParsedInvoice> {
    let scope = reader.scope();
    let ide = scope.child(inf, "ide");
    let emit = scope.child(inf, "emit");

    let number = reader.text(ide, "nNF", UNKNOWN_INVOICE_NUMBER);
    let series = reader.text(ide, "serie", DEFAULT_SERIES);
    let issue_date = issue_date(&reader, ide);

    let mut products = Vec::new();
    for det in scope.children(inf, "det") {
        let Some(prod) = scope.child(det, "prod") else {
            debug!(item = det.attribute("nItem").unwrap_or(""), "<det> without <prod>; skipped");
            continue;
        };
        products.push(assemble_product(prod, &reader, settings));
    }

    let volumes = read_volumes(inf, &reader);
    let item_weights: Vec<Decimal> = products.iter().map(|p| p.weight_kg).collect();
    let weights = reconcile(&item_weights, &volumes, settings)?;

    let supplier = read_supplier(emit, &reader);

    info!(
        number = %number,
        series = %series,
        supplier = %supplier.name,
        products = products.len(),
        volumes = volumes.len(),
        net_kg = %weights.net_weight_kg,
        gross_kg = %weights.gross_weight_kg,
        "Invoice parsed"
    );

    Ok(ParsedInvoice {
        supplier,
        products,
        invoice: InvoiceHeader {
            number,
            series,
            issue_date,
            weights,
        },
    })
}

fn assemble_product(prod: Node, reader: &FieldReader, settings: &EngineSettings) -> ProductLine {
    let node = Some(prod);
    let name = reader.text(node, "xProd", NOT_AVAILABLE);

    let commercial = UnitQuantity::new(
        reader.number(node, "qCom", Decimal::ZERO),
        Unit::parse(&reader.text(node, "uCom", "")),
    );
    let tax = UnitQuantity::new(
        reader.number(node, "qTrib", Decimal::ZERO),
        Unit::parse(&reader.text(node, "uTrib", "")),
    );
    let inputs = ItemInputs {
        tax,
        commercial,
        description: &name,
    };

    let resolved = resolve_weight(&inputs, settings.item_tolerance_kg);
    let pricing = resolve_pricing(
        inputs.commercial_quantity(),
        reader.number(node, "vUnCom", Decimal::ZERO),
        reader.number(node, "vProd", Decimal::ZERO),
    );

    let unit = match resolved.unit_override {
        Some(unit) => unit.symbol().to_string(),
        None => reader
            .opt_text(node, "uCom")
            .or_else(|| reader.opt_text(node, "uTrib"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    };

    debug!(
        name = %name,
        qty = %pricing.quantity,
        unit = %unit,
        weight_kg = %resolved.weight_kg,
        source = ?resolved.source,
        "Product line"
    );

    ProductLine {
        code: reader.text(node, "cProd", ""),
        ncm: reader.text(node, "NCM", NOT_AVAILABLE),
        name,
        quantity: pricing.quantity,
        unit_price: pricing.unit_price,
        total_price: pricing.total,
        unit,
        weight_kg: resolved.weight_kg.normalize(),
        weight_source: resolved.source,
    }
}

/// `dhEmi` carries a timestamp; older layouts only have the date in `dEmi`.
fn issue_date(reader: &FieldReader, ide: Option<Node>) -> String {
    match reader.opt_text(ide, "dhEmi") {
        Some(stamp) => stamp.split('T').next().unwrap_or_default().to_string(),
        None => reader.text(ide, "dEmi", ""),
    }
}

fn read_volumes(inf: Node, reader: &FieldReader) -> Vec<VolumeWeight> {
    let scope = reader.scope();
    let Some(transp) = scope.child(inf, "transp") else {
        return Vec::new();
    };
    scope
        .children(transp, "vol")
        .map(|vol| VolumeWeight {
            net_kg: reader.number(Some(vol), "pesoL", Decimal::ZERO),
            gross_kg: reader.number(Some(vol), "pesoB", Decimal::ZERO),
        })
        .collect()
}

fn read_supplier(emit: Option<Node>, reader: &FieldReader) -> Supplier {
    let tax_id = reader
        .opt_text(emit, "CNPJ")
        .or_else(|| reader.opt_text(emit, "CPF"))
        .unwrap_or_default();

    let address_node = emit.and_then(|e| reader.scope().child(e, "enderEmit"));
    let address = ADDRESS_FIELDS
        .iter()
        .filter_map(|field| reader.opt_text(address_node, field))
        .collect::<Vec<_>>()
        .join(", ");

    Supplier {
        name: reader.text(emit, "xNome", NOT_AVAILABLE),
        tax_id,
        address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NFE_NAMESPACE, WeightSource};
    use crate::reconcile::WeightOrigin;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn parse(xml: &str) -> Result<ParsedInvoice> {
        parse_nfe_str(xml, &EngineSettings::default())
    }

    #[test]
    fn test_syntax_error() {
        let err = parse("<nfeProc><infNFe></nfeProc>").unwrap_err();
        assert!(matches!(err, EngineError::Syntax(ref msg) if !msg.is_empty()));
    }

    #[test]
    fn test_invalid_utf8_is_syntax_error() {
        let err = parse_nfe_xml(b"<a>\xFF</a>", &EngineSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn test_schema_not_recognized() {
        assert_eq!(parse("<nfeProc><NFe/></nfeProc>").unwrap_err(), EngineError::SchemaNotRecognized);
    }

    #[test]
    fn test_unnamespaced_fallback() {
        let xml = r#"<nfeProc><NFe><infNFe>
            <ide><nNF>42</nNF></ide>
            <det nItem="1"><prod><xProd>ARROZ</xProd><qCom>5</qCom><uCom>KG</uCom></prod></det>
        </infNFe></NFe></nfeProc>"#;
        let inv = parse(xml).unwrap();
        assert_eq!(inv.invoice.number, "42");
        assert_eq!(inv.invoice.series, DEFAULT_SERIES);
        assert_eq!(inv.products[0].weight_kg, dec("5"));
        assert_eq!(inv.products[0].weight_source, WeightSource::CommercialUnit);
    }

    #[test]
    fn test_prefixed_namespace_without_default() {
        let xml = format!(
            r#"<nfe:nfeProc xmlns:nfe="{NFE_NAMESPACE}"><nfe:infNFe>
                <nfe:ide><nfe:nNF>7</nfe:nNF></nfe:ide>
            </nfe:infNFe></nfe:nfeProc>"#
        );
        let inv = parse(&xml).unwrap();
        assert_eq!(inv.invoice.number, "7");
        assert!(inv.products.is_empty());
    }

    #[test]
    fn test_det_without_prod_skipped() {
        let xml = format!(
            r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe>
                <det nItem="1"/>
                <det nItem="2"><prod><xProd>FEIJAO</xProd></prod></det>
            </infNFe></NFe>"#
        );
        let inv = parse(&xml).unwrap();
        assert_eq!(inv.products.len(), 1);
        assert_eq!(inv.products[0].name, "FEIJAO");
        assert_eq!(inv.products[0].unit, NOT_AVAILABLE);
        assert_eq!(inv.products[0].ncm, NOT_AVAILABLE);
        assert_eq!(inv.net_weight_kg(), Decimal::ZERO);
        assert_eq!(inv.invoice.weights.net_origin, WeightOrigin::None);
    }

    #[test]
    fn test_issue_date_variants() {
        let with_time = format!(
            r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe><ide><dhEmi>2024-03-05T10:22:00-03:00</dhEmi></ide></infNFe></NFe>"#
        );
        assert_eq!(parse(&with_time).unwrap().invoice.issue_date, "2024-03-05");

        let legacy = format!(
            r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe><ide><dEmi>2010-11-30</dEmi></ide></infNFe></NFe>"#
        );
        assert_eq!(parse(&legacy).unwrap().invoice.issue_date, "2010-11-30");
    }

    #[test]
    fn test_supplier_defaults() {
        let xml = format!(r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe/></NFe>"#);
        let inv = parse(&xml).unwrap();
        assert_eq!(
            inv.supplier,
            Supplier {
                name: NOT_AVAILABLE.to_string(),
                tax_id: String::new(),
                address: String::new(),
            }
        );
        assert_eq!(inv.invoice.number, UNKNOWN_INVOICE_NUMBER);
        assert_eq!(inv.invoice.issue_date, "");
    }
}
