//! Parsed page plus the few structural queries the parsers need.
//!
//! Queries never fail: a missing element reads as an empty string.

use scraper::{ElementRef, Html, Selector};
use zsemplan_core::{Result, ZsemError};

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// First element matching `selector`.
    pub fn find(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// First `table` element of the page.
    pub fn first_table(&self) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")
    }
}

/// Compile a CSS selector from configuration.
pub fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ZsemError::Parse(format!("Invalid selector '{css}': {e:?}")))
}

/// The table matching `selector`, if present.
pub fn find_table<'a>(doc: &'a Document, selector: &Selector) -> Option<ElementRef<'a>> {
    doc.find(selector)
}

/// Row elements of a table, in document order.
pub fn rows_of(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    descendants_named(table, "tr").collect()
}

/// Data cells (`td`) of a row, in document order.
pub fn cells_of(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    descendants_named(row, "td").collect()
}

/// Spans that contain a hyperlink; each one is a parallel subgroup of a cell.
pub fn linked_spans_of(cell: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    descendants_named(cell, "span")
        .filter(|span| descendants_named(*span, "a").next().is_some())
        .collect()
}

/// Concatenated text of every descendant matching `selector`, trimmed.
pub fn text_of(scope: ElementRef<'_>, selector: &Selector) -> String {
    let text: String = matches_in(scope, selector).flat_map(|el| el.text()).collect();
    text.trim().to_string()
}

/// `href` of the first descendant matching `selector`, or empty.
pub fn href_of(scope: ElementRef<'_>, selector: &Selector) -> String {
    matches_in(scope, selector)
        .find_map(|el| el.value().attr("href"))
        .unwrap_or_default()
        .to_string()
}

/// Text of the element itself, trimmed.
pub fn own_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn matches_in<'a, 'b>(
    scope: ElementRef<'a>,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    scope.select(selector).filter(move |el| *el != scope)
}

fn descendants_named<'a>(
    scope: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="other"><tr><td>x</td></tr></table>
        <table class="tabela">
          <tr><th>Nr</th><th>Godz</th></tr>
          <tr>
            <td class="g"> 8:00- 8:45 </td>
            <td><span><span class="p">ang</span> <a class="n" href="n1.html">AB</a></span>
                <span class="p">extra</span></td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_find_table_by_class() {
        let doc = Document::parse(PAGE);
        let table = find_table(&doc, &compile("table.tabela").unwrap()).unwrap();
        assert_eq!(rows_of(table).len(), 2);
        assert_eq!(doc.first_table().unwrap().value().attr("class"), Some("other"));
    }

    #[test]
    fn test_cells_skip_header_th() {
        let doc = Document::parse(PAGE);
        let table = find_table(&doc, &compile("table.tabela").unwrap()).unwrap();
        let rows = rows_of(table);
        assert!(cells_of(rows[0]).is_empty());
        assert_eq!(cells_of(rows[1]).len(), 2);
    }

    #[test]
    fn test_text_concatenates_and_trims() {
        let doc = Document::parse(PAGE);
        let table = find_table(&doc, &compile("table.tabela").unwrap()).unwrap();
        let row = rows_of(table)[1];
        assert_eq!(text_of(row, &compile("td.g").unwrap()), "8:00- 8:45");
        assert_eq!(text_of(row, &compile("span.p").unwrap()), "angextra");
    }

    #[test]
    fn test_href_and_missing_match() {
        let doc = Document::parse(PAGE);
        let table = find_table(&doc, &compile("table.tabela").unwrap()).unwrap();
        let row = rows_of(table)[1];
        assert_eq!(href_of(row, &compile("a.n").unwrap()), "n1.html");
        assert_eq!(href_of(row, &compile("a.s").unwrap()), "");
        assert_eq!(text_of(row, &compile("a.s").unwrap()), "");
    }

    #[test]
    fn test_linked_spans_only() {
        let doc = Document::parse(PAGE);
        let table = find_table(&doc, &compile("table.tabela").unwrap()).unwrap();
        let cell = cells_of(rows_of(table)[1])[1];
        let spans = linked_spans_of(cell);
        assert_eq!(spans.len(), 1);
        assert_eq!(own_text(spans[0]), "ang AB");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(compile("td[["), Err(ZsemError::Parse(_))));
    }
}
