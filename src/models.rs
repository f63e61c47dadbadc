use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which search provider produced a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    GoogleJobs,
    Lever,
    Greenhouse,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::GoogleJobs => "google_jobs",
            Source::Lever => "lever",
            Source::Greenhouse => "greenhouse",
        }
    }
}

/// A normalized job opportunity as returned by a source adapter.
/// Exists only in memory until it is either dropped as a duplicate or
/// scored and persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub description: Option<String>,
    pub source: Source,
    pub url: Option<String>,
}

impl Posting {
    /// A posting needs a title and a company to be worth tracking.
    /// Provider results missing either are dropped before deduplication.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.company_name.trim().is_empty()
    }

    /// In-run dedup key: lowercase company|||title|||location.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|||{}|||{}",
            self.company_name.trim().to_lowercase(),
            self.title.trim().to_lowercase(),
            self.location.trim().to_lowercase()
        )
    }

    /// Stable identity hash used for cross-run dedup against the store.
    /// Case-insensitive over (company, title, location), order-sensitive.
    pub fn identity_hash(&self) -> String {
        let key = format!(
            "{}-{}-{}",
            self.company_name.trim().to_lowercase(),
            self.title.trim().to_lowercase(),
            self.location.trim().to_lowercase()
        );
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A person possibly associated with a target company. Best-effort;
/// duplicates across keyword queries are not filtered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub profile_url: Option<String>,
    pub snippet: Option<String>,
}

/// The durable record, one row per unique identity hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOpportunity {
    pub id: i64,
    pub job_hash: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub match_score: Option<i64>,
    pub ai_analysis: Option<String>,
    pub contacts: Vec<Contact>,
    pub status: String, // "new", "reviewing", "applied", "rejected", "closed"
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(company: &str, title: &str, location: &str) -> Posting {
        Posting {
            title: title.to_string(),
            company_name: company.to_string(),
            location: location.to_string(),
            description: None,
            source: Source::GoogleJobs,
            url: None,
        }
    }

    #[test]
    fn test_identity_hash_stable() {
        let a = posting("Acme", "Senior Product Manager", "Remote");
        let b = posting("Acme", "Senior Product Manager", "Remote");
        assert_eq!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn test_identity_hash_case_insensitive() {
        let a = posting("Acme", "Senior Product Manager", "Remote");
        let b = posting("ACME", "senior product manager", "REMOTE");
        assert_eq!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn test_identity_hash_differs_per_field() {
        let base = posting("Acme", "Senior Product Manager", "Remote");
        assert_ne!(
            base.identity_hash(),
            posting("Acme Corp", "Senior Product Manager", "Remote").identity_hash()
        );
        assert_ne!(
            base.identity_hash(),
            posting("Acme", "Principal Product Manager", "Remote").identity_hash()
        );
        assert_ne!(
            base.identity_hash(),
            posting("Acme", "Senior Product Manager", "Seattle").identity_hash()
        );
    }

    #[test]
    fn test_identity_hash_order_sensitive() {
        // Swapping company and title must not collide.
        let a = posting("Alpha", "Beta", "Remote");
        let b = posting("Beta", "Alpha", "Remote");
        assert_ne!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn test_dedup_key_normalizes() {
        let a = posting("  Acme  ", "Senior PM", "Remote");
        let b = posting("acme", "senior pm", "remote");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_is_valid_rejects_blank_fields() {
        assert!(posting("Acme", "Engineer", "Remote").is_valid());
        assert!(!posting("Acme", "", "Remote").is_valid());
        assert!(!posting("Acme", "   ", "Remote").is_valid());
        assert!(!posting("", "Engineer", "Remote").is_valid());
    }
}
