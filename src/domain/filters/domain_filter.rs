//! Blacklisted domain, extension and scheme filter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use regex::Regex;

use super::{Filter, FilterConcern, FilterContext, PRIORITY_ACTIONING};

const NOTIFICATION: &str =
    "Your link has been removed, as it references a blacklisted scheme, domain or domain extension.";

/// A link found in message content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LinkInfo {
    pub scheme: Option<String>,
    pub host: String,
}

/// Removes messages linking to blacklisted domains.
///
/// Links are extracted first (`scheme://host...` and bare `www.host...`), and
/// only their hosts are compared, so a blacklisted name appearing elsewhere in
/// the text doesn't trigger. A host matches a domain entry when it equals it
/// or is a subdomain of it, and matches an extension entry when its last label
/// equals it.
pub struct DomainFilter {
    domains: Vec<String>,
    extensions: Vec<String>,
    schemes: BTreeSet<String>,
    url_re: Regex,
    www_re: Regex,
    scheme_re: Option<Regex>,
}

impl DomainFilter {
    pub fn new(
        domains: Vec<String>,
        extensions: Vec<String>,
        schemes: Vec<String>,
    ) -> Result<Self, regex::Error> {
        let schemes: BTreeSet<String> = schemes.into_iter().map(|s| s.to_lowercase()).collect();

        // Schemes like `magnet:` have no authority part
        let scheme_re = if schemes.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = schemes.iter().map(|s| regex::escape(s)).collect();
            Some(Regex::new(&format!(
                r"(?i)\b({}):[^\s]*",
                alternatives.join("|")
            ))?)
        };

        Ok(Self {
            domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            schemes,
            url_re: Regex::new(r"(?i)\b([a-z][a-z0-9+.\-]*)://([^\s/?#<>]+)")?,
            www_re: Regex::new(r"(?i)(?:^|[^\w./])(www\.[^\s/?#<>]+)")?,
            scheme_re,
        })
    }

    /// Every link in `content`.
    pub fn extract_links(&self, content: &str) -> BTreeSet<LinkInfo> {
        let mut links = BTreeSet::new();

        for caps in self.url_re.captures_iter(content) {
            let (Some(scheme), Some(authority)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            links.insert(LinkInfo {
                scheme: Some(scheme.as_str().to_lowercase()),
                host: normalize_host(authority.as_str()),
            });
        }

        for caps in self.www_re.captures_iter(content) {
            if let Some(host) = caps.get(1) {
                links.insert(LinkInfo {
                    scheme: None,
                    host: normalize_host(host.as_str()),
                });
            }
        }

        if let Some(scheme_re) = &self.scheme_re {
            for caps in scheme_re.captures_iter(content) {
                if let Some(scheme) = caps.get(1) {
                    links.insert(LinkInfo {
                        scheme: Some(scheme.as_str().to_lowercase()),
                        host: String::new(),
                    });
                }
            }
        }

        links
    }

    /// Links in `content` that hit a blacklist.
    pub fn find_blacklisted(&self, content: &str) -> BTreeSet<LinkInfo> {
        self.extract_links(content)
            .into_iter()
            .filter(|link| self.is_blacklisted(link))
            .collect()
    }

    fn is_blacklisted(&self, link: &LinkInfo) -> bool {
        if link
            .scheme
            .as_ref()
            .is_some_and(|scheme| self.schemes.contains(scheme))
        {
            return true;
        }

        if link.host.is_empty() {
            return false;
        }

        let domain_hit = self
            .domains
            .iter()
            .any(|domain| link.host == *domain || link.host.ends_with(&format!(".{}", domain)));

        let extension_hit = link
            .host
            .rsplit('.')
            .next()
            .is_some_and(|tld| self.extensions.iter().any(|ext| ext == tld));

        domain_hit || extension_hit
    }

    async fn inspect(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        let links = self.find_blacklisted(content);
        if links.is_empty() {
            return Ok(true);
        }

        let message = ctx.message;
        ctx.notifier.delete_ignoring_not_found(message).await?;

        let found: Vec<String> = links
            .iter()
            .map(|link| match (&link.scheme, link.host.is_empty()) {
                (Some(scheme), true) => format!("`{}:`", scheme),
                (Some(scheme), false) => format!("`{}://{}`", scheme, link.host),
                (None, _) => format!("`{}`", link.host),
            })
            .collect();

        let alert = format!(
            "Domain filter triggered by {} {} ({}), with the following message:\n\n{}",
            ctx.author_label(),
            ctx.notifier.describe_origin(message),
            found.join(", "),
            content
        );
        ctx.report_removal(self.name(), &alert, NOTIFICATION).await;

        Ok(false)
    }
}

/// Lower-case host without credentials, port or trailing dot.
fn normalize_host(authority: &str) -> String {
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.trim_end_matches('.').to_lowercase()
}

#[async_trait]
impl Filter for DomainFilter {
    fn name(&self) -> &'static str {
        "domain"
    }

    fn concerns(&self) -> &[FilterConcern] {
        &[FilterConcern::Content]
    }

    fn priority(&self) -> u32 {
        PRIORITY_ACTIONING
    }

    async fn check_create(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx, content).await
    }

    async fn check_edit(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx, content).await
    }
}
