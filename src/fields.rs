// src/fields.rs

use roxmltree::Node;
use rust_decimal::Decimal;
use std::str::FromStr;

/// How element names are matched while walking a document.
///
/// Chosen once per document: either every lookup is qualified with one
/// namespace URI, or every lookup matches un-namespaced elements only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'s> {
    Namespaced(&'s str),
    Plain,
}

impl<'s> Scope<'s> {
    pub fn matches(&self, node: &Node, local: &str) -> bool {
        if !node.is_element() || node.tag_name().name() != local {
            return false;
        }
        match self {
            Scope::Namespaced(uri) => node.tag_name().namespace() == Some(*uri),
            Scope::Plain => node.tag_name().namespace().is_none(),
        }
    }

    /// First child element named `local`.
    pub fn child<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        local: &str,
    ) -> Option<Node<'a, 'input>> {
        node.children().find(|c| self.matches(c, local))
    }

    /// All child elements named `local`, in document order.
    pub fn children<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        local: &'s str,
    ) -> impl Iterator<Item = Node<'a, 'input>> + use<'a, 'input, 's> {
        let scope = *self;
        node.children().filter(move |c| scope.matches(c, local))
    }

    /// Walks a `/`-separated path of child element names.
    pub fn find<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        path: &str,
    ) -> Option<Node<'a, 'input>> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(node, |current, step| self.child(current, step))
    }

    /// First element named `local` anywhere under `node`, `node` included.
    pub fn descendant<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        local: &str,
    ) -> Option<Node<'a, 'input>> {
        node.descendants().find(|d| self.matches(d, local))
    }
}

/// Safe scalar extraction bound to one namespace [`Scope`].
///
/// Every lookup tolerates a missing parent, a missing node and empty text by
/// returning the caller's default.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'s> {
    scope: Scope<'s>,
}

impl<'s> FieldReader<'s> {
    pub fn new(scope: Scope<'s>) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> Scope<'s> {
        self.scope
    }

    /// Trimmed text at `path`, or `None` when absent or blank.
    pub fn opt_text(&self, node: Option<Node>, path: &str) -> Option<String> {
        let found = self.scope.find(node?, path)?;
        let text = found.text()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    pub fn text(&self, node: Option<Node>, path: &str, default: &str) -> String {
        self.opt_text(node, path)
            .unwrap_or_else(|| default.to_string())
    }

    /// Locale-formatted decimal at `path`. Unparsable text is treated exactly
    /// like a missing node.
    pub fn number(&self, node: Option<Node>, path: &str, default: Decimal) -> Decimal {
        self.opt_text(node, path)
            .and_then(|t| parse_locale_decimal(&t))
            .unwrap_or(default)
    }
}

/// Parses `"1,5"` or `"1.5"`. Comma is read as the decimal separator, so a
/// thousands-grouped value such as `"1.234,56"` does not parse.
pub fn parse_locale_decimal(text: &str) -> Option<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const NS: &str = "http://www.portalfiscal.inf.br/nfe";

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_locale_decimal() {
        assert_eq!(parse_locale_decimal("12,5"), Some(dec("12.5")));
        assert_eq!(parse_locale_decimal(" 0.400 "), Some(dec("0.4")));
        assert_eq!(parse_locale_decimal("7"), Some(dec("7")));
        assert_eq!(parse_locale_decimal(""), None);
        assert_eq!(parse_locale_decimal("abc"), None);
        assert_eq!(parse_locale_decimal("1.234,56"), None);
    }

    #[test]
    fn test_reader_defaults() {
        let xml = format!(
            r#"<prod xmlns="{NS}"><qCom>10,5000</qCom><xProd>  Queijo  </xProd><vProd></vProd><NCM>x1</NCM></prod>"#
        );
        let doc = Document::parse(&xml).unwrap();
        let prod = Some(doc.root_element());
        let reader = FieldReader::new(Scope::Namespaced(NS));

        assert_eq!(reader.number(prod, "qCom", Decimal::ZERO), dec("10.5"));
        assert_eq!(reader.text(prod, "xProd", "N/A"), "Queijo");
        // present but empty
        assert_eq!(reader.number(prod, "vProd", Decimal::ONE), Decimal::ONE);
        // present but not a number
        assert_eq!(reader.number(prod, "NCM", Decimal::ZERO), Decimal::ZERO);
        // missing
        assert_eq!(reader.text(prod, "cProd", ""), "");
        // missing parent
        assert_eq!(reader.text(None, "xProd", "N/A"), "N/A");
    }

    #[test]
    fn test_scope_does_not_mix_namespaces() {
        let xml = format!(r#"<root xmlns="{NS}"><a><b>1</b></a></root>"#);
        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();

        assert!(Scope::Namespaced(NS).find(root, "a/b").is_some());
        assert!(Scope::Plain.find(root, "a/b").is_none());

        let plain = Document::parse("<root><a><b>1</b></a></root>").unwrap();
        let root = plain.root_element();
        assert!(Scope::Plain.find(root, "a/b").is_some());
        assert!(Scope::Namespaced(NS).find(root, "a").is_none());
    }

    #[test]
    fn test_children_in_document_order() {
        let doc =
            Document::parse("<t><vol><n>1</n></vol><x/><vol><n>2</n></vol></t>").unwrap();
        let reader = FieldReader::new(Scope::Plain);
        let values: Vec<String> = Scope::Plain
            .children(doc.root_element(), "vol")
            .map(|v| reader.text(Some(v), "n", ""))
            .collect();
        assert_eq!(values, vec!["1", "2"]);
    }
}
