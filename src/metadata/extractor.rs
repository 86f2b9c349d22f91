//! Open Graph / meta tag extraction from raw HTML.

use regex::Regex;

use crate::models::UrlMetadata;

/// One `<meta>` tag, reduced to the attributes lookups care about.
#[derive(Debug, Default)]
struct MetaTag {
    property: Option<String>,
    name: Option<String>,
    content: Option<String>,
}

/// Pulls page details out of HTML with a handful of compiled patterns.
#[derive(Debug)]
pub struct HtmlExtractor {
    meta_tag: Regex,
    attribute: Regex,
    title: Regex,
    prices: Vec<Regex>,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let prices = [
            r"\$[\d,]+\.?\d*",
            r"€[\d,]+\.?\d*",
            r"£[\d,]+\.?\d*",
            r"[\d,]+\.?\d*\s*USD",
            r"[\d,]+\.?\d*\s*EUR",
            r"[\d,]+\.?\d*\s*GBP",
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            meta_tag: Regex::new(r"(?is)<meta\b([^>]*)>")?,
            attribute: Regex::new(r#"(?is)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?,
            prices,
        })
    }

    /// Extracts metadata from `html`, the page found at `page_url`.
    pub fn extract(&self, html: &str, page_url: &str) -> UrlMetadata {
        let tags = self.meta_tags(html);
        let meta = |property: &str, name: Option<&str>| lookup(&tags, property, name);

        let title = meta("og:title", None)
            .or_else(|| self.title_text(html))
            .or_else(|| meta("twitter:title", None));

        let description =
            meta("og:description", Some("description")).or_else(|| meta("twitter:description", None));

        let image = meta("og:image", None)
            .or_else(|| meta("twitter:image", None))
            .or_else(|| meta("image", None))
            .map(|image| resolve_url(&image, page_url));

        let site_name = meta("og:site_name", None)
            .or_else(|| meta("application-name", None))
            .or_else(|| hostname(page_url));

        let price = meta("product:price:amount", None)
            .or_else(|| meta("og:price:amount", None))
            .or_else(|| meta("price", None))
            .or_else(|| self.price_in_text(html));

        let currency = meta("product:price:currency", None)
            .or_else(|| meta("og:price:currency", None))
            .or_else(|| meta("currency", None));

        let availability =
            meta("product:availability", None).or_else(|| meta("og:availability", None));

        let kind = meta("og:type", None).unwrap_or_else(|| "website".to_string());

        UrlMetadata {
            title,
            description,
            image,
            site_name,
            price,
            currency,
            availability,
            kind: Some(kind),
        }
    }

    fn meta_tags(&self, html: &str) -> Vec<MetaTag> {
        self.meta_tag
            .captures_iter(html)
            .map(|tag| {
                let mut parsed = MetaTag::default();
                for attr in self.attribute.captures_iter(&tag[1]) {
                    let value = attr
                        .get(2)
                        .or_else(|| attr.get(3))
                        .map(|m| decode_entities(m.as_str()));
                    match attr[1].to_ascii_lowercase().as_str() {
                        "property" => parsed.property = value,
                        "name" => parsed.name = value,
                        "content" => parsed.content = value,
                        _ => {}
                    }
                }
                parsed
            })
            .collect()
    }

    fn title_text(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty())
    }

    /// First price-looking string in the page, trying `$` patterns first.
    fn price_in_text(&self, html: &str) -> Option<String> {
        self.prices
            .iter()
            .find_map(|pattern| pattern.find(html))
            .map(|m| m.as_str().to_string())
    }
}

/// Finds a tag's content: by `property`, then by `name`, then (for `og:`
/// properties) by the bare name without the prefix. Empty content counts as
/// missing.
fn lookup(tags: &[MetaTag], property: &str, name: Option<&str>) -> Option<String> {
    let found = find_content(tags, property, true)
        .or_else(|| name.and_then(|name| find_content(tags, name, false)))
        .or_else(|| {
            property
                .strip_prefix("og:")
                .and_then(|bare| find_content(tags, bare, false))
        });
    found.filter(|v| !v.is_empty())
}

/// Content of the first tag whose `property` (or `name`) equals `key`.
fn find_content(tags: &[MetaTag], key: &str, by_property: bool) -> Option<String> {
    tags.iter()
        .find(|tag| {
            let attr = if by_property { &tag.property } else { &tag.name };
            attr.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(key))
        })
        .map(|tag| tag.content.as_deref().unwrap_or("").trim().to_string())
}

fn resolve_url(image: &str, base: &str) -> String {
    reqwest::Url::parse(base)
        .and_then(|base| base.join(image))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| image.to_string())
}

pub(crate) fn hostname(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
