//! Directory-listing scraping for package discovery

use log::debug;
use scraper::{ElementRef, Html};
use url::Url;

/// Collect every anchor `href` in document order.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    visit(document.root_element(), &mut links);
    links
}

fn visit(element: ElementRef<'_>, links: &mut Vec<String>) {
    if element.value().name().eq_ignore_ascii_case("a")
        && let Some(href) = element.value().attr("href")
    {
        links.push(href.to_string());
    }

    for child in element.children() {
        if let Some(child) = ElementRef::wrap(child) {
            visit(child, links);
        }
    }
}

/// Resolve the anchors of a listing page against the page URL.
///
/// Anchors that do not form a valid URL are dropped.
pub fn resolve_links(base: &Url, html: &str) -> Vec<String> {
    anchor_hrefs(html)
        .into_iter()
        .filter_map(|href| match base.join(&href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                debug!("ignoring link {href}: {e}");
                None
            }
        })
        .collect()
}
