// src/core/scanner/fingerprint_scanner.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::ResultRow;
use crate::core::scanner::{http_client, Scanner};

/// Where in the response a rule looks.
#[derive(Debug, Clone, Copy)]
enum Source {
    Header(&'static str),
    MetaTag(&'static str),
    Body,
    ScriptSrc,
    LinkHref,
    Cookie,
}

/// (technology, category, source, pattern). A first capture group, when
/// present, is taken as the version.
const RULE_TABLE: &[(&str, &str, Source, &str)] = &[
    ("Nginx", "Web Server", Source::Header("server"), r"nginx(?:/([\d\.]+))?"),
    ("Apache", "Web Server", Source::Header("server"), r"Apache(?:/([\d\.]+))?"),
    ("Microsoft IIS", "Web Server", Source::Header("server"), r"Microsoft-IIS(?:/([\d\.]+))?"),
    ("Cloudflare", "CDN / WAF", Source::Header("server"), r"cloudflare"),
    ("Akamai", "CDN / WAF", Source::Header("server"), r"AkamaiGHost"),
    ("WordPress", "CMS", Source::MetaTag("generator"), r"WordPress ([\d\.]+)"),
    ("WordPress", "CMS", Source::Body, r"/wp-content/|/wp-includes/"),
    ("Drupal", "CMS", Source::MetaTag("generator"), r"Drupal ([\d\.]+)"),
    ("Drupal", "CMS", Source::Header("x-generator"), r"Drupal ([\d\.]+)"),
    ("Joomla", "CMS", Source::MetaTag("generator"), r"Joomla!"),
    ("PHP", "Language", Source::Header("x-powered-by"), r"PHP/([\d\.]+)"),
    ("PHP", "Language", Source::Cookie, r"PHPSESSID"),
    ("ASP.NET", "Framework", Source::Header("x-aspnet-version"), r"([\d\.]+)"),
    ("Java", "Language", Source::Cookie, r"JSESSIONID"),
    ("Next.js", "JS Framework", Source::ScriptSrc, r"/_next/static/"),
    ("Angular", "JS Framework", Source::Body, r#"ng-version="([\d\.]+)""#),
    ("React", "JS Library", Source::Body, r"react-dom|data-reactroot"),
    ("jQuery", "JS Library", Source::ScriptSrc, r"jquery[-.]?([\d\.]+\d)?"),
    ("Bootstrap", "UI Framework", Source::LinkHref, r"bootstrap(?:\.min)?\.css"),
    ("U.S. Web Design System", "UI Framework", Source::LinkHref, r"uswds"),
    ("Google Analytics", "Analytics", Source::ScriptSrc, r"google-analytics\.com/|googletagmanager\.com/"),
    ("Digital Analytics Program", "Analytics", Source::ScriptSrc, r"Universal-Federated-Analytics"),
];

struct Rule {
    tech: &'static str,
    category: &'static str,
    source: Source,
    pattern: Regex,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    RULE_TABLE
        .iter()
        .filter_map(|&(tech, category, source, pattern)| match Regex::new(pattern) {
            Ok(pattern) => Some(Rule { tech, category, source, pattern }),
            Err(e) => {
                error!(tech, error = %e, "Skipping fingerprint rule with invalid pattern.");
                None
            }
        })
        .collect()
});

/// Identifies the server software and front-end stack of a site.
///
/// Emits one row per detected technology, so a domain may contribute zero
/// rows or several.
#[derive(Debug, Default)]
pub struct FingerprintScanner;

#[async_trait]
impl Scanner for FingerprintScanner {
    fn name(&self) -> &str {
        "fingerprint"
    }

    fn headers(&self) -> &[&'static str] {
        &["Technology", "Category", "Version"]
    }

    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        info!(domain, "Starting fingerprint scan.");
        let client = http_client(options)?;
        let response = client.get(format!("https://{domain}")).send().await?;
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(bytes = body.len(), "Read response body.");

        let found = fingerprint(&headers, &body);
        info!(count = found.len(), "Fingerprint scan finished.");
        Ok(found
            .into_iter()
            .map(|(tech, (category, version))| {
                vec![tech.to_string(), category.to_string(), version.unwrap_or_default()]
            })
            .collect())
    }
}

/// Applies every rule to a response. Keyed by technology so output is stable.
fn fingerprint(headers: &HeaderMap, body: &str) -> BTreeMap<&'static str, (&'static str, Option<String>)> {
    let document = Html::parse_document(body);
    let cookies = headers
        .get_all("set-cookie")
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let mut found: BTreeMap<&'static str, (&'static str, Option<String>)> = BTreeMap::new();
    for rule in RULES.iter() {
        let hit = match rule.source {
            Source::Header(name) => match_text(headers.get(name).and_then(|v| v.to_str().ok()), &rule.pattern),
            Source::MetaTag(name) => match_meta(&document, name, &rule.pattern),
            Source::Body => match_text(Some(body), &rule.pattern),
            Source::ScriptSrc => match_attr(&document, "script[src]", "src", &rule.pattern),
            Source::LinkHref => match_attr(&document, "link[href]", "href", &rule.pattern),
            Source::Cookie => match_text(Some(&cookies), &rule.pattern),
        };
        let Some(version) = hit else { continue };
        debug!(tech = rule.tech, version = ?version, "Rule matched.");
        let entry = found.entry(rule.tech).or_insert((rule.category, None));
        if entry.1.is_none() {
            entry.1 = version;
        }
    }
    found
}

/// `None` when the pattern does not match; `Some(version)` otherwise.
fn match_text(text: Option<&str>, re: &Regex) -> Option<Option<String>> {
    let caps = re.captures(text?)?;
    Some(caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()))
}

fn match_meta(doc: &Html, name: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(&format!("meta[name='{name}']")).ok()?;
    let content = doc.select(&selector).next().and_then(|el| el.value().attr("content"));
    match_text(content, re)
}

fn match_attr(doc: &Html, css: &str, attr: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(|value| match_text(Some(value), re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn every_rule_compiles() {
        assert_eq!(RULES.len(), RULE_TABLE.len());
    }

    #[test]
    fn detects_from_headers_and_markup() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx/1.25.3"));
        headers.append("set-cookie", HeaderValue::from_static("PHPSESSID=abc; path=/"));
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 6.4.2">
            <link rel="stylesheet" href="/assets/uswds.min.css">
            <script src="/js/jquery-3.7.1.min.js"></script>
            </head><body></body></html>"#;

        let found = fingerprint(&headers, body);
        assert_eq!(found.get("Nginx"), Some(&("Web Server", Some("1.25.3".to_string()))));
        assert_eq!(found.get("WordPress"), Some(&("CMS", Some("6.4.2".to_string()))));
        assert_eq!(found.get("PHP"), Some(&("Language", None)));
        assert_eq!(found.get("jQuery"), Some(&("JS Library", Some("3.7.1".to_string()))));
        assert!(found.contains_key("U.S. Web Design System"));
        assert!(!found.contains_key("Apache"));
    }

    #[test]
    fn plain_page_detects_nothing() {
        let found = fingerprint(&HeaderMap::new(), "<html><body>hello</body></html>");
        assert!(found.is_empty());
    }
}
