use tracing::{debug, warn};

use crate::models::Contact;
use crate::serp::{OrganicResult, SerpClient};

/// How many profile results to keep per role keyword.
const RESULTS_PER_KEYWORD: usize = 3;

/// Contact enrichment seam. Best-effort by contract: implementations
/// return an empty list rather than failing.
pub trait ContactLookup {
    fn find(&self, company: &str, role_keywords: &[String]) -> Vec<Contact>;
}

/// Looks up people at a company matching role keywords, via web search
/// restricted to professional-profile pages.
pub struct ContactFinder {
    client: SerpClient,
}

impl ContactFinder {
    pub fn new(client: SerpClient) -> Self {
        Self { client }
    }
}

impl ContactLookup for ContactFinder {
    /// One search per keyword; failures are isolated per keyword and the
    /// remaining keywords still run. Results are not deduplicated across
    /// keywords.
    fn find(&self, company: &str, role_keywords: &[String]) -> Vec<Contact> {
        let mut people = Vec::new();

        for keyword in role_keywords {
            let q = format!("site:linkedin.com/in/ {} {}", keyword, company);
            match self.client.search_web(&q) {
                Ok(results) => {
                    people.extend(
                        results
                            .into_iter()
                            .take(RESULTS_PER_KEYWORD)
                            .filter_map(organic_to_contact),
                    );
                }
                Err(e) => {
                    warn!(company = %company, keyword = %keyword, error = %e,
                          "contact lookup failed, skipping keyword");
                }
            }
        }

        debug!(company = %company, found = people.len(), "contact lookup done");
        people
    }
}

fn organic_to_contact(result: OrganicResult) -> Option<Contact> {
    let name = result.title?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(Contact {
        name,
        profile_url: result.link,
        snippet: result.snippet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organic_to_contact_maps_fields() {
        let contact = organic_to_contact(OrganicResult {
            title: Some("Jane Doe - Chief of Staff - Acme".to_string()),
            link: Some("https://www.linkedin.com/in/janedoe".to_string()),
            snippet: Some("Chief of Staff at Acme since 2023.".to_string()),
        })
        .unwrap();

        assert_eq!(contact.name, "Jane Doe - Chief of Staff - Acme");
        assert_eq!(
            contact.profile_url.as_deref(),
            Some("https://www.linkedin.com/in/janedoe")
        );
        assert!(contact.snippet.unwrap().contains("Chief of Staff"));
    }

    #[test]
    fn test_organic_to_contact_requires_name() {
        assert!(
            organic_to_contact(OrganicResult {
                title: None,
                link: Some("https://www.linkedin.com/in/someone".to_string()),
                snippet: None,
            })
            .is_none()
        );
        assert!(
            organic_to_contact(OrganicResult {
                title: Some("   ".to_string()),
                link: None,
                snippet: None,
            })
            .is_none()
        );
    }
}
