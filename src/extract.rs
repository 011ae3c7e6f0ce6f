//! Full-text retrieval: per-document detail records and XML flattening.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Detail record for a single document.
///
/// Only the fields the pipeline consumes are kept; the detail endpoint
/// returns many more.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDetail {
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub full_text_xml_url: Option<String>,
}

/// Fetches document details and flattens full-text XML into plain text.
///
/// Every operation here is best-effort: failures are logged and reported as
/// "nothing to ingest" (`None` / empty string) so one broken document cannot
/// stop the run.
pub struct TextExtractor {
    client: Client,
    base_url: Url,
}

impl TextExtractor {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Single best-effort request for a document's detail record.
    pub async fn fetch_details(&self, document_number: &str) -> Option<DocumentDetail> {
        let url = match self.base_url.join(&format!("documents/{document_number}.json")) {
            Ok(url) => url,
            Err(err) => {
                warn!(document_number, error = %err, "could not build detail url");
                return None;
            }
        };

        let result = async {
            self.client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .json::<DocumentDetail>()
                .await
        }
        .await;

        match result {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(document_number, error = %err, "detail request failed");
                None
            }
        }
    }

    /// Retrieves the full-text XML resource and flattens it to plain text.
    ///
    /// Returns an empty string when the detail record has no full-text url or
    /// when the fetch fails; both mean "nothing to ingest" downstream.
    pub async fn extract_full_text(&self, detail: &DocumentDetail) -> String {
        let Some(xml_url) = detail.full_text_xml_url.as_deref() else {
            debug!("detail record has no full-text resource");
            return String::new();
        };

        let body = async {
            self.client
                .get(xml_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await;

        match body {
            Ok(xml) => flatten_full_text(&xml),
            Err(err) => {
                warn!(xml_url, error = %err, "full-text fetch failed");
                String::new()
            }
        }
    }
}

/// Concatenates the text of paragraph (`P`), heading (`HD`) and footnote
/// (`FTNT`) elements in document order, one blank line between each.
pub fn flatten_full_text(xml: &str) -> String {
    let selector = match Selector::parse("p, hd, ftnt") {
        Ok(selector) => selector,
        Err(err) => {
            warn!(error = %err, "text selector failed to parse");
            return String::new();
        }
    };

    let document = Html::parse_document(xml);
    let mut blocks = Vec::new();
    for element in document.select(&selector) {
        let text: String = element.text().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            blocks.push(trimmed.to_string());
        }
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_text_blocks_in_document_order() {
        let xml = r#"<RULE>
            <PREAMB>
                <HD>Summary</HD>
                <P>First paragraph of the rule.</P>
            </PREAMB>
            <GPH>graphic placeholder</GPH>
            <P>Second paragraph.</P>
            <FTNT>A footnote.</FTNT>
        </RULE>"#;

        let text = flatten_full_text(xml);
        assert_eq!(
            text,
            "Summary\n\nFirst paragraph of the rule.\n\nSecond paragraph.\n\nA footnote."
        );
    }

    #[test]
    fn skips_empty_elements() {
        let xml = "<DOC><P>  </P><P>Kept.</P><HD></HD></DOC>";
        assert_eq!(flatten_full_text(xml), "Kept.");
    }

    #[test]
    fn empty_input_yields_empty_text() {
        assert_eq!(flatten_full_text(""), "");
    }
}
