//! HTML listing source over reqwest and scraper.
//!
//! All selectors come from [`SelectorConfig`]; nothing here knows the
//! site's DOM beyond what the configuration says.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, RawListing, ScrapeConfig, SelectorConfig};
use crate::source::{ListingSource, SearchPage};
use crate::utils::resolve_url;

/// Scraper-backed listing source.
pub struct HtmlSource {
    client: Client,
    base_url: Url,
    search_url: String,
    selectors: SelectorConfig,
}

impl HtmlSource {
    /// Create a source from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Self::build_client(&config.scrape)?;
        let base_url = Url::parse(&config.scrape.base_url)?;
        Ok(Self {
            client,
            base_url,
            search_url: config.scrape.search_url.clone(),
            selectors: config.selectors.clone(),
        })
    }

    fn build_client(config: &ScrapeConfig) -> Result<Client> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(client)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    /// Extract listing links and the count banner from results HTML.
    fn parse_search_page(&self, html: &str) -> Result<SearchPage> {
        let document = Html::parse_document(html);
        let article_sel = Self::parse_selector(&self.selectors.article)?;
        let banner_sel = Self::parse_selector(&self.selectors.count_banner)?;

        let listing_urls = document
            .select(&article_sel)
            .filter_map(|article| article.value().attr(&self.selectors.article_link_attr))
            .filter(|href| !href.is_empty())
            .map(|href| resolve_url(&self.base_url, href))
            .collect();

        let result_count = document
            .select(&banner_sel)
            .next()
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .and_then(|banner| {
                banner
                    .split_once(&self.selectors.count_split)
                    .map(|(_, total)| total.trim().to_string())
            });

        Ok(SearchPage {
            listing_urls,
            result_count,
        })
    }

    /// Extract the raw listing fields from a detail page.
    fn parse_listing(&self, html: &str, url: &str) -> Result<RawListing> {
        let document = Html::parse_document(html);

        let title_sel = Self::parse_selector(&self.selectors.title)?;
        let label_sel = Self::parse_selector(&self.selectors.detail_label)?;
        let value_sel = Self::parse_selector(&self.selectors.detail_value)?;
        let checktag_sel = Self::parse_selector(&self.selectors.checktag)?;
        let views_sel = Self::parse_selector(&self.selectors.views)?;
        let date_sel = Self::parse_selector(&self.selectors.date)?;
        let street_sel = Self::parse_selector(&self.selectors.street)?;
        let locality_sel = Self::parse_selector(&self.selectors.locality)?;
        let image_sel = Self::parse_selector(&self.selectors.image)?;

        let title = document
            .select(&title_sel)
            .next()
            .map(|el| Self::clean_title(&el.text().collect::<String>()))
            .unwrap_or_default();

        // The label element's own text starts with the label; nested
        // markup carries the value, stripped by taking leading text.
        let detail_labels = document
            .select(&label_sel)
            .map(|el| {
                Self::clean(
                    el.text()
                        .next()
                        .unwrap_or_default(),
                )
            })
            .collect();

        let detail_values = document
            .select(&value_sel)
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .collect();

        let checktags = document
            .select(&checktag_sel)
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .collect();

        let views = document
            .select(&views_sel)
            .next()
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .unwrap_or_default();

        let date = document
            .select(&date_sel)
            .next()
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .unwrap_or_default();

        let street = document
            .select(&street_sel)
            .next()
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .unwrap_or_default();
        let locality = document
            .select(&locality_sel)
            .next()
            .map(|el| Self::clean(&el.text().collect::<String>()))
            .unwrap_or_default();
        let location = Self::clean(&format!("{street} {locality}"));

        let image_urls = document
            .select(&image_sel)
            .filter_map(|el| el.value().attr(&self.selectors.image_attr))
            .filter(|src| !src.is_empty())
            .map(|src| resolve_url(&self.base_url, src))
            .collect();

        Ok(RawListing {
            url: url.to_string(),
            title,
            views,
            date,
            location,
            detail_labels,
            detail_values,
            checktags,
            image_urls,
            local_image: None,
        })
    }

    /// Collapse whitespace runs (including non-breaking spaces) and trim.
    fn clean(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean a title, dropping the reservation marker prefix some
    /// listings carry ("• Reserviert").
    fn clean_title(text: &str) -> String {
        let cleaned = Self::clean(text);
        match cleaned.rfind('•') {
            Some(idx) => cleaned[idx + '•'.len_utf8()..].trim().to_string(),
            None => cleaned,
        }
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[async_trait]
impl ListingSource for HtmlSource {
    async fn search(&self) -> Result<SearchPage> {
        let html = self.fetch_text(&self.search_url).await?;
        self.parse_search_page(&html)
    }

    async fn fetch_listing(&self, url: &str) -> Result<RawListing> {
        let html = self.fetch_text(url).await?;
        self.parse_listing(&html, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HtmlSource {
        let mut config = Config::default();
        config.scrape.search_url = "https://example.com/s-wohnung-mieten".into();
        config.scrape.base_url = "https://example.com".into();
        HtmlSource::new(&config).unwrap()
    }

    #[test]
    fn test_parse_search_page() {
        let html = r#"
            <div class="breadcrump-summary">Anzeigen 1 - 25 von 135 Ergebnissen</div>
            <article data-href="/s-anzeige/wohnung-1"></article>
            <article data-href="/s-anzeige/wohnung-2"></article>
            <article></article>
        "#;
        let page = source().parse_search_page(html).unwrap();

        assert_eq!(
            page.listing_urls,
            vec![
                "https://example.com/s-anzeige/wohnung-1",
                "https://example.com/s-anzeige/wohnung-2",
            ]
        );
        assert_eq!(page.result_count.as_deref(), Some("135 Ergebnissen"));
    }

    #[test]
    fn test_parse_listing_fields() {
        let html = r#"
            <h1 id="viewad-title">  Schöne   Wohnung </h1>
            <span id="viewad-cntr-num">142</span>
            <div id="viewad-extra-info"><span>01.06.2026</span></div>
            <span id="street-address">Musterstraße 1,</span>
            <span id="viewad-locality">66111 Saarbrücken</span>
            <ul>
                <li class="addetailslist--detail">Zimmer<span class="addetailslist--detail--value">2</span></li>
                <li class="addetailslist--detail">Miete<span class="addetailslist--detail--value">650€</span></li>
            </ul>
            <ul>
                <li class="checktag">Balkon</li>
                <li class="checktag">Einbauküche</li>
            </ul>
            <img id="viewad-image" src="/img/1.jpg">
        "#;
        let raw = source()
            .parse_listing(html, "https://example.com/s-anzeige/wohnung-1")
            .unwrap();

        assert_eq!(raw.title, "Schöne Wohnung");
        assert_eq!(raw.views, "142");
        assert_eq!(raw.date, "01.06.2026");
        assert_eq!(raw.location, "Musterstraße 1, 66111 Saarbrücken");
        assert_eq!(raw.detail_labels, vec!["Zimmer", "Miete"]);
        assert_eq!(raw.detail_values, vec!["2", "650€"]);
        assert_eq!(raw.checktags, vec!["Balkon", "Einbauküche"]);
        assert_eq!(raw.image_urls, vec!["https://example.com/img/1.jpg"]);
    }

    #[test]
    fn test_clean_title_strips_reservation_marker() {
        assert_eq!(
            HtmlSource::clean_title("• Reserviert • Schöne Wohnung"),
            "Schöne Wohnung"
        );
        assert_eq!(HtmlSource::clean_title("Schöne Wohnung"), "Schöne Wohnung");
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(HtmlSource::parse_selector("[[invalid").is_err());
    }
}
