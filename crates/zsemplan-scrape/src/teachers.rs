//! Staff page → teacher identity.

use scraper::Selector;
use zsemplan_core::config::LayoutConfig;
use zsemplan_core::{Result, TeacherRecord};

use crate::document::{Document, compile, own_text};

/// Reads the title element of a staff page, e.g. `Kowalski (KJ)`.
pub struct TeacherDirectoryExtractor {
    title: Selector,
    id_offset: usize,
}

impl TeacherDirectoryExtractor {
    /// `id_offset` is the byte length of the URL prefix in front of the page
    /// file name, so the id of `{base}/plany/plany/n5.html` is `n5.html`.
    pub fn new(layout: &LayoutConfig, id_offset: usize) -> Result<Self> {
        Ok(Self {
            title: compile(&layout.teacher_title)?,
            id_offset,
        })
    }

    /// A page without the title element gives empty `name` and `short_label`.
    pub fn extract(&self, doc: &Document, url: &str) -> TeacherRecord {
        let title = doc.find(&self.title).map(own_text).unwrap_or_default();
        let mut tokens = title.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let short_label = tokens.next().map(short_label_of).unwrap_or_default();

        TeacherRecord {
            id: url.get(self.id_offset..).unwrap_or_default().to_string(),
            name,
            short_label,
        }
    }
}

/// Characters 1..3 of a token such as `(KJ)`; empty when the token is shorter.
fn short_label_of(token: &str) -> String {
    if token.chars().count() < 3 {
        return String::new();
    }
    token.chars().skip(1).take(2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "https://zsem.edu.pl/plany/plany/";

    fn extractor() -> TeacherDirectoryExtractor {
        TeacherDirectoryExtractor::new(&LayoutConfig::default(), PREFIX.len()).unwrap()
    }

    fn page(title: &str) -> Document {
        Document::parse(&format!(
            r#"<html><body><table><tr><td><span class="tytulnapis">{title}</span></td></tr></table></body></html>"#
        ))
    }

    #[test]
    fn test_extracts_name_short_and_id() {
        let url = format!("{PREFIX}n5.html");
        let record = extractor().extract(&page("Kowalski (KJ)"), &url);
        assert_eq!(
            record,
            TeacherRecord {
                id: "n5.html".into(),
                name: "Kowalski".into(),
                short_label: "KJ".into(),
            }
        );
    }

    #[test]
    fn test_two_digit_id() {
        let url = format!("{PREFIX}n42.html");
        let record = extractor().extract(&page("Nowak (AN)"), &url);
        assert_eq!(record.id, "n42.html");
    }

    #[test]
    fn test_missing_or_short_second_token() {
        let url = format!("{PREFIX}n1.html");
        let record = extractor().extract(&page("Wakat"), &url);
        assert_eq!(record.name, "Wakat");
        assert_eq!(record.short_label, "");

        let record = extractor().extract(&page("Lis (E"), &url);
        assert_eq!(record.short_label, "");
    }

    #[test]
    fn test_empty_title() {
        let url = format!("{PREFIX}n1.html");
        let record = extractor().extract(&page("  "), &url);
        assert_eq!(record.name, "");
        assert_eq!(record.short_label, "");
    }

    #[test]
    fn test_no_title_element_gives_empty_fields() {
        let doc = Document::parse("<html><body><h1>Plan nauczyciela</h1></body></html>");
        let record = extractor().extract(&doc, &format!("{PREFIX}n9.html"));
        assert_eq!(
            record,
            TeacherRecord {
                id: "n9.html".into(),
                name: String::new(),
                short_label: String::new(),
            }
        );
    }

    #[test]
    fn test_url_shorter_than_offset() {
        let record = extractor().extract(&page("Kowalski (KJ)"), "https://x/");
        assert_eq!(record.id, "");
    }
}
