use tracing::warn;

use crate::models::{Posting, Source};
use crate::serp::{JobResult, OrganicResult, SerpClient};

/// One listing provider. `fetch` never fails: a provider error (timeout,
/// quota, malformed payload) is logged and yields an empty batch so one
/// bad call cannot abort the run.
pub trait SourceAdapter {
    fn source(&self) -> Source;
    fn fetch(&self, query: &str, location: &str) -> Vec<Posting>;
}

// --- Google Jobs ---

/// Adapter over the SerpApi google_jobs engine.
pub struct GoogleJobsAdapter {
    client: SerpClient,
}

impl GoogleJobsAdapter {
    pub fn new(client: SerpClient) -> Self {
        Self { client }
    }
}

impl SourceAdapter for GoogleJobsAdapter {
    fn source(&self) -> Source {
        Source::GoogleJobs
    }

    fn fetch(&self, query: &str, location: &str) -> Vec<Posting> {
        let q = format!("{} {}", query, location);
        match self.client.search_jobs(&q) {
            Ok(results) => results
                .into_iter()
                .map(|job| job_result_to_posting(job, location))
                .collect(),
            Err(e) => {
                warn!(source = "google_jobs", query = %q, error = %e, "provider call failed");
                Vec::new()
            }
        }
    }
}

/// Each provider exposes the posting URL differently; google_jobs carries
/// apply links and a share link. Take the first apply option, else the
/// share link.
fn job_result_to_posting(job: JobResult, fallback_location: &str) -> Posting {
    let url = job
        .apply_options
        .iter()
        .find_map(|opt| opt.link.clone())
        .or(job.share_link);

    let location = match job.location {
        Some(loc) if !loc.trim().is_empty() => loc,
        _ => fallback_location.to_string(),
    };

    Posting {
        title: job.title,
        company_name: job.company_name,
        location,
        description: job.description,
        source: Source::GoogleJobs,
        url,
    }
}

// --- Job boards via site-restricted web search ---

/// Adapter that scrapes a job board indirectly: a plain google search
/// restricted to the board's domain. Organic results are filtered to links
/// that look like actual listings before conversion; a non-job page that
/// slips through is an acceptable false positive, not an error.
pub struct SiteSearchAdapter {
    client: SerpClient,
    source: Source,
    site: &'static str,
    /// URL substring that marks a direct listing on this board.
    job_path_marker: &'static str,
}

impl SiteSearchAdapter {
    pub fn lever(client: SerpClient) -> Self {
        Self {
            client,
            source: Source::Lever,
            site: "jobs.lever.co",
            job_path_marker: "jobs.lever.co/",
        }
    }

    pub fn greenhouse(client: SerpClient) -> Self {
        Self {
            client,
            source: Source::Greenhouse,
            site: "boards.greenhouse.io",
            job_path_marker: "/jobs/",
        }
    }

    fn convert(&self, result: OrganicResult, location: &str) -> Option<Posting> {
        let link = result.link?;
        if !is_job_link(&link, self.site, self.job_path_marker) {
            return None;
        }

        let raw_title = result.title.unwrap_or_default();
        let (title, company) = parse_board_title(&raw_title);
        let company = company.or_else(|| company_from_board_url(&link))?;

        Some(Posting {
            title,
            company_name: company,
            location: location.to_string(),
            description: result.snippet,
            source: self.source,
            url: Some(link),
        })
    }
}

impl SourceAdapter for SiteSearchAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn fetch(&self, query: &str, location: &str) -> Vec<Posting> {
        let q = format!("site:{} {} {}", self.site, query, location);
        match self.client.search_web(&q) {
            Ok(results) => results
                .into_iter()
                .filter_map(|r| self.convert(r, location))
                .collect(),
            Err(e) => {
                warn!(source = self.source.as_str(), query = %q, error = %e, "provider call failed");
                Vec::new()
            }
        }
    }
}

/// A listing link lives on the board's domain, carries the board's job
/// path, and is not a search/listing-index page.
pub fn is_job_link(url: &str, site: &str, job_path_marker: &str) -> bool {
    if !url.contains(site) || !url.contains(job_path_marker) {
        return false;
    }
    // Index and search pages on the same domain are not listings.
    if url.contains("/search") || url.contains("/jobs?") || url.ends_with(site) {
        return false;
    }
    true
}

/// Board result titles come as "Job Application for Title at Company"
/// (greenhouse) or "Company - Title" (lever). Returns (title, company).
pub fn parse_board_title(raw: &str) -> (String, Option<String>) {
    let text = raw.trim();

    let text = text.strip_prefix("Job Application for ").unwrap_or(text);

    if let Some(idx) = text.rfind(" at ") {
        let title = text[..idx].trim().to_string();
        let company = text[idx + 4..].trim().to_string();
        if !title.is_empty() && !company.is_empty() {
            return (title, Some(company));
        }
    }

    if let Some(idx) = text.find(" - ") {
        let company = text[..idx].trim().to_string();
        let title = text[idx + 3..].trim().to_string();
        if !title.is_empty() && !company.is_empty() {
            return (title, Some(company));
        }
    }

    (text.to_string(), None)
}

/// Fallback: the first path segment on lever/greenhouse boards is the
/// company slug ("jobs.lever.co/acme/...", "boards.greenhouse.io/acme/...").
pub fn company_from_board_url(url: &str) -> Option<String> {
    let after_host = url.split_once("lever.co/").map(|(_, rest)| rest).or_else(|| {
        url.split_once("greenhouse.io/").map(|(_, rest)| rest)
    })?;
    let slug = after_host.split('/').next()?.trim();
    if slug.is_empty() {
        return None;
    }
    Some(slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serp::ApplyOption;

    fn job(title: &str, company: &str) -> JobResult {
        JobResult {
            title: title.to_string(),
            company_name: company.to_string(),
            location: None,
            description: None,
            apply_options: vec![],
            share_link: None,
        }
    }

    #[test]
    fn test_url_resolution_prefers_apply_option() {
        let mut j = job("Senior PM", "Acme");
        j.apply_options = vec![
            ApplyOption {
                title: Some("Apply on Acme".to_string()),
                link: Some("https://acme.example/careers/123".to_string()),
            },
            ApplyOption {
                title: Some("Apply on LinkedIn".to_string()),
                link: Some("https://linkedin.example/job/123".to_string()),
            },
        ];
        j.share_link = Some("https://google.example/share".to_string());

        let posting = job_result_to_posting(j, "Remote");
        assert_eq!(posting.url.as_deref(), Some("https://acme.example/careers/123"));
    }

    #[test]
    fn test_url_resolution_falls_back_to_share_link() {
        let mut j = job("Senior PM", "Acme");
        j.share_link = Some("https://google.example/share".to_string());
        let posting = job_result_to_posting(j, "Remote");
        assert_eq!(posting.url.as_deref(), Some("https://google.example/share"));
    }

    #[test]
    fn test_url_resolution_skips_linkless_apply_options() {
        let mut j = job("Senior PM", "Acme");
        j.apply_options = vec![
            ApplyOption { title: Some("Apply".to_string()), link: None },
            ApplyOption {
                title: None,
                link: Some("https://acme.example/apply".to_string()),
            },
        ];
        let posting = job_result_to_posting(j, "Remote");
        assert_eq!(posting.url.as_deref(), Some("https://acme.example/apply"));
    }

    #[test]
    fn test_missing_location_defaults_to_query_location() {
        let posting = job_result_to_posting(job("Senior PM", "Acme"), "Remote");
        assert_eq!(posting.location, "Remote");

        let mut j = job("Senior PM", "Acme");
        j.location = Some("  ".to_string());
        let posting = job_result_to_posting(j, "Seattle");
        assert_eq!(posting.location, "Seattle");
    }

    #[test]
    fn test_is_job_link_filters_non_listings() {
        assert!(is_job_link(
            "https://jobs.lever.co/acme/1234-senior-pm",
            "jobs.lever.co",
            "jobs.lever.co/"
        ));
        assert!(is_job_link(
            "https://boards.greenhouse.io/acme/jobs/998877",
            "boards.greenhouse.io",
            "/jobs/"
        ));

        // wrong domain
        assert!(!is_job_link(
            "https://example.com/jobs/1",
            "boards.greenhouse.io",
            "/jobs/"
        ));
        // board landing page, not a listing
        assert!(!is_job_link(
            "https://jobs.lever.co",
            "jobs.lever.co",
            "jobs.lever.co/"
        ));
        // search pages
        assert!(!is_job_link(
            "https://boards.greenhouse.io/acme/jobs?dept=product",
            "boards.greenhouse.io",
            "/jobs/"
        ));
        assert!(!is_job_link(
            "https://jobs.lever.co/search?q=pm",
            "jobs.lever.co",
            "jobs.lever.co/"
        ));
    }

    #[test]
    fn test_parse_board_title_greenhouse() {
        let (title, company) =
            parse_board_title("Job Application for Senior Product Manager at Acme");
        assert_eq!(title, "Senior Product Manager");
        assert_eq!(company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_parse_board_title_lever() {
        let (title, company) = parse_board_title("Acme - Senior Product Manager");
        assert_eq!(title, "Senior Product Manager");
        assert_eq!(company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_parse_board_title_plain() {
        let (title, company) = parse_board_title("Senior Product Manager");
        assert_eq!(title, "Senior Product Manager");
        assert!(company.is_none());
    }

    #[test]
    fn test_company_from_board_url() {
        assert_eq!(
            company_from_board_url("https://jobs.lever.co/acme/1234").as_deref(),
            Some("acme")
        );
        assert_eq!(
            company_from_board_url("https://boards.greenhouse.io/stripe/jobs/55").as_deref(),
            Some("stripe")
        );
        assert!(company_from_board_url("https://example.com/x").is_none());
    }

    #[test]
    fn test_site_adapter_convert_requires_company() {
        let client = SerpClient::new("test-key".to_string());
        let adapter = SiteSearchAdapter::greenhouse(client);

        let ok = adapter.convert(
            OrganicResult {
                title: Some("Job Application for Senior PM at Acme".to_string()),
                link: Some("https://boards.greenhouse.io/acme/jobs/1".to_string()),
                snippet: Some("Own the roadmap.".to_string()),
            },
            "Remote",
        );
        let posting = ok.expect("listing link converts");
        assert_eq!(posting.company_name, "Acme");
        assert_eq!(posting.source, Source::Greenhouse);
        assert_eq!(posting.location, "Remote");

        // non-listing link is dropped
        let dropped = adapter.convert(
            OrganicResult {
                title: Some("Acme careers".to_string()),
                link: Some("https://boards.greenhouse.io/acme".to_string()),
                snippet: None,
            },
            "Remote",
        );
        assert!(dropped.is_none());
    }
}
