use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A location the candidate wants, with its deterministic score adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationWeight {
    pub name: String,
    pub weight: i64,
    /// Synonyms and abbreviations that also count as this location
    /// (e.g. "sf" for san francisco). Matched after the name itself.
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// A named group of target companies. The category label is only for
/// bookkeeping; the bonus is flat across categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCompanyGroup {
    pub category: String,
    pub companies: Vec<String>,
}

/// Candidate preferences. Pure data; the scorer and the query plan read
/// from it, nothing writes to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub title_keywords: Vec<String>,
    pub locations: Vec<LocationWeight>,
    pub industries: Vec<String>,
    pub target_companies: Vec<TargetCompanyGroup>,
    pub company_bonus: i64,
    pub experience_level: String,
    pub background: String,
    pub avoid: Vec<String>,
    pub contact_role_keywords: Vec<String>,
}

impl Profile {
    /// Load a profile from a JSON file, replacing the built-in one wholesale.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse profile file: {}", path.display()))
    }

    /// Every configured target company, category-independent.
    pub fn all_target_companies(&self) -> impl Iterator<Item = &str> {
        self.target_companies
            .iter()
            .flat_map(|g| g.companies.iter().map(|c| c.as_str()))
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            title_keywords: vec![
                "senior product manager".to_string(),
                "principal product manager".to_string(),
                "founding product manager".to_string(),
                "chief of staff".to_string(),
                "head of operations".to_string(),
                "general manager".to_string(),
            ],
            locations: vec![
                LocationWeight {
                    name: "remote".to_string(),
                    weight: 15,
                    synonyms: vec![
                        "work from home".to_string(),
                        "wfh".to_string(),
                        "anywhere".to_string(),
                        "distributed".to_string(),
                    ],
                },
                LocationWeight {
                    name: "seattle".to_string(),
                    weight: 10,
                    synonyms: vec![
                        "bellevue".to_string(),
                        "redmond".to_string(),
                        "kirkland".to_string(),
                    ],
                },
                LocationWeight {
                    name: "san francisco".to_string(),
                    weight: 8,
                    synonyms: vec![
                        "sf".to_string(),
                        "bay area".to_string(),
                        "south san francisco".to_string(),
                    ],
                },
                LocationWeight {
                    name: "new york".to_string(),
                    weight: 5,
                    synonyms: vec![
                        "nyc".to_string(),
                        "new york city".to_string(),
                        "manhattan".to_string(),
                        "brooklyn".to_string(),
                    ],
                },
            ],
            industries: vec![
                "AI productivity tools".to_string(),
                "consumer tech".to_string(),
                "marketplaces".to_string(),
                "wearables".to_string(),
                "fitness tech".to_string(),
                "creative tech".to_string(),
                "creator economy".to_string(),
                "consumer fintech".to_string(),
                "travel".to_string(),
                "digital health B2C".to_string(),
            ],
            target_companies: vec![
                TargetCompanyGroup {
                    category: "ai_productivity".to_string(),
                    companies: vec![
                        "Notion".to_string(),
                        "Linear".to_string(),
                        "Anthropic".to_string(),
                        "Perplexity".to_string(),
                    ],
                },
                TargetCompanyGroup {
                    category: "consumer_fintech".to_string(),
                    companies: vec![
                        "Stripe".to_string(),
                        "Ramp".to_string(),
                        "Mercury".to_string(),
                        "Chime".to_string(),
                    ],
                },
                TargetCompanyGroup {
                    category: "marketplaces".to_string(),
                    companies: vec![
                        "Airbnb".to_string(),
                        "Faire".to_string(),
                        "StockX".to_string(),
                    ],
                },
                TargetCompanyGroup {
                    category: "creator_economy".to_string(),
                    companies: vec![
                        "Substack".to_string(),
                        "Patreon".to_string(),
                        "Whatnot".to_string(),
                    ],
                },
                TargetCompanyGroup {
                    category: "fitness_wearables".to_string(),
                    companies: vec![
                        "Whoop".to_string(),
                        "Oura".to_string(),
                        "Strava".to_string(),
                    ],
                },
            ],
            company_bonus: 10,
            experience_level: "senior".to_string(),
            background: "MBA, 8+ years experience, healthcare data, Amazon, \
                         Expert Network, startup sensibilities"
                .to_string(),
            avoid: vec![
                "traditional finance".to_string(),
                "deep B2B healthcare".to_string(),
                "SaaS healthcare".to_string(),
                "energy".to_string(),
                "industrials".to_string(),
                "bureaucratic orgs".to_string(),
            ],
            contact_role_keywords: vec![
                "senior product manager".to_string(),
                "principal product manager".to_string(),
                "chief of staff".to_string(),
                "head of product".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_has_rule_tables() {
        let profile = Profile::default();
        assert!(!profile.title_keywords.is_empty());
        assert_eq!(profile.company_bonus, 10);

        let remote = profile
            .locations
            .iter()
            .find(|l| l.name == "remote")
            .expect("remote location configured");
        assert_eq!(remote.weight, 15);
    }

    #[test]
    fn test_all_target_companies_spans_categories() {
        let profile = Profile::default();
        let companies: Vec<&str> = profile.all_target_companies().collect();
        assert!(companies.contains(&"Stripe"));
        assert!(companies.contains(&"Notion"));
        assert!(companies.contains(&"Whoop"));
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = Profile::default();
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.locations.len(), profile.locations.len());
        assert_eq!(back.company_bonus, profile.company_bonus);
    }

    #[test]
    fn test_from_file_missing_path_errors() {
        let result = Profile::from_file(Path::new("/nonexistent/profile.json"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("profile file"));
    }
}
