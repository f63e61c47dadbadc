use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::ai::Judge;
use crate::contacts::ContactLookup;
use crate::db::{Database, FallbackLog, StoreError};
use crate::models::{Contact, Posting};
use crate::profile::Profile;
use crate::score::{ScoreResult, score_posting};
use crate::sources::SourceAdapter;

/// One search the aggregator will run against every adapter.
#[derive(Debug, Clone)]
pub struct PlanCell {
    pub query: String,
    pub location: String,
}

/// How many title keywords secondary locations get. The preferred location
/// is searched with every keyword; the rest with a reduced set, bounding
/// total external calls per run.
const SECONDARY_KEYWORDS: usize = 2;

/// Build the tiered query plan from the profile. Locations are taken in
/// profile order, first one preferred.
pub fn build_query_plan(profile: &Profile) -> Vec<PlanCell> {
    let mut plan = Vec::new();

    for (i, loc) in profile.locations.iter().enumerate() {
        let keywords: &[String] = if i == 0 {
            &profile.title_keywords
        } else {
            let n = SECONDARY_KEYWORDS.min(profile.title_keywords.len());
            &profile.title_keywords[..n]
        };
        for keyword in keywords {
            plan.push(PlanCell {
                query: keyword.clone(),
                location: loc.name.clone(),
            });
        }
    }

    plan
}

// --- Dedup/persistence gate ---

/// Admits postings whose identity hash the store has never seen, and
/// persists accepted ones. When the store is unreachable the gate degrades
/// to an append-only fallback log for the remainder of the run instead of
/// failing; fallback entries are not consulted for dedup.
pub struct Gate {
    db: Option<Database>,
    fallback: FallbackLog,
    degraded: bool,
}

impl Gate {
    pub fn new(db: Option<Database>, fallback: FallbackLog) -> Self {
        let degraded = db.is_none();
        if degraded {
            warn!(
                log = %fallback.path().display(),
                "durable store unavailable, degrading to fallback log"
            );
        }
        Self { db, fallback, degraded }
    }

    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Returns the identity hash if the posting is previously unseen, or
    /// None for a known duplicate (which is skipped entirely, not
    /// re-scored). A store failure admits the posting and degrades the
    /// gate for the rest of the run.
    pub fn admit(&mut self, posting: &Posting) -> Option<String> {
        let hash = posting.identity_hash();

        if self.degraded {
            return Some(hash);
        }

        let Some(db) = self.db.as_ref() else {
            return Some(hash);
        };
        match db.exists_by_hash(&hash) {
            Ok(true) => None,
            Ok(false) => Some(hash),
            Err(e) => {
                warn!(error = %e, "store check failed, degrading to fallback log");
                self.degraded = true;
                Some(hash)
            }
        }
    }

    /// Write one accepted posting. A conflict (another run inserted the
    /// same hash concurrently) is a benign no-op. Store failures degrade
    /// to the fallback log; the run never aborts here.
    pub fn persist(
        &mut self,
        hash: &str,
        posting: &Posting,
        score: &ScoreResult,
        contacts: &[Contact],
    ) {
        if !self.degraded {
            if let Some(db) = self.db.as_ref() {
                match db.insert_opportunity(hash, posting, score.final_score, &score.rationale, contacts) {
                    Ok(_) => return,
                    Err(StoreError::Conflict) => {
                        debug!(hash = %hash, "lost insert race, record already stored");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "store write failed, degrading to fallback log");
                        self.degraded = true;
                    }
                }
            }
        }

        if let Err(e) = self.fallback.append(hash, posting, score.final_score, &score.rationale, contacts) {
            warn!(error = %e, "fallback log write failed, record dropped");
        }
    }
}

// --- Run report ---

#[derive(Debug)]
pub struct ReportEntry {
    pub posting: Posting,
    pub score: ScoreResult,
    pub contacts: Vec<Contact>,
}

/// Everything one pass produced. Rendering is separate from collection so
/// callers (CLI today, a scheduler trigger tomorrow) can pick counts or
/// text.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total_discovered: usize,
    pub invalid_count: usize,
    pub unique_count: usize,
    pub skipped_known: usize,
    pub admitted_count: usize,
    pub judge_fallbacks: usize,
    pub store_degraded: bool,
    pub dry_run: bool,
    /// Newly admitted postings, ranked by final score descending; ties
    /// keep discovery order.
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn report_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "Discovered {} postings, {} unique",
            self.total_discovered, self.unique_count
        ));
        if self.invalid_count > 0 {
            out.push_str(&format!(" ({} dropped as incomplete)", self.invalid_count));
        }
        out.push('\n');
        out.push_str(&format!(
            "{} already tracked, {} newly admitted\n",
            self.skipped_known, self.admitted_count
        ));

        if self.dry_run {
            out.push_str("(dry run - nothing was persisted)\n");
        }
        if self.store_degraded {
            out.push_str("WARNING: durable store unavailable - new records went to the fallback log\n");
        }
        if self.judge_fallbacks > 0 {
            out.push_str(&format!(
                "WARNING: {} posting(s) scored with the neutral fallback (no AI judgment)\n",
                self.judge_fallbacks
            ));
        }

        if self.entries.is_empty() {
            out.push_str("\nNo new opportunities - everything found is already tracked.\n");
            return out;
        }

        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. [{}] {} at {} ({})\n",
                i + 1,
                entry.score.final_score,
                entry.posting.title,
                entry.posting.company_name,
                entry.posting.location
            ));
            if let Some(url) = &entry.posting.url {
                out.push_str(&format!("   {}\n", url));
            }
            let wrapped = textwrap::fill(&entry.score.rationale, 76);
            out.push_str(&textwrap::indent(&wrapped, "   "));
            out.push('\n');
            for contact in &entry.contacts {
                out.push_str(&format!(
                    "   - {} | {}\n",
                    contact.name,
                    contact.profile_url.as_deref().unwrap_or("(no profile link)")
                ));
            }
        }

        out
    }
}

// --- Driver ---

/// One discovery pass: aggregate -> dedup -> admit/score/enrich/persist ->
/// rank -> report. All collaborators are injected; the driver owns no
/// ambient state.
pub struct Pipeline {
    adapters: Vec<Box<dyn SourceAdapter>>,
    judge: Box<dyn Judge>,
    contacts: Box<dyn ContactLookup>,
    gate: Gate,
    profile: Profile,
    limit: usize,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        judge: Box<dyn Judge>,
        contacts: Box<dyn ContactLookup>,
        gate: Gate,
        profile: Profile,
        limit: usize,
        dry_run: bool,
    ) -> Self {
        Self { adapters, judge, contacts, gate, profile, limit, dry_run }
    }

    pub fn run(&mut self) -> RunReport {
        let plan = build_query_plan(&self.profile);
        info!(cells = plan.len(), adapters = self.adapters.len(), "starting discovery pass");

        // Aggregate: every adapter runs every plan cell; per-call failures
        // are absorbed inside fetch. Adapter order decides which copy of a
        // duplicate survives dedup below.
        let mut discovered: Vec<Posting> = Vec::new();
        for adapter in &self.adapters {
            for cell in &plan {
                let batch = adapter.fetch(&cell.query, &cell.location);
                debug!(
                    source = adapter.source().as_str(),
                    query = %cell.query,
                    location = %cell.location,
                    count = batch.len(),
                    "adapter batch"
                );
                discovered.extend(batch);
            }
        }
        let total_discovered = discovered.len();

        // Drop incomplete postings before dedup, silently but counted.
        let before = discovered.len();
        discovered.retain(|p| p.is_valid());
        let invalid_count = before - discovered.len();

        // In-memory dedup, first occurrence wins.
        let mut seen: HashSet<String> = HashSet::new();
        let mut unique: Vec<Posting> = Vec::new();
        for posting in discovered {
            if seen.insert(posting.dedup_key()) {
                unique.push(posting);
            }
        }
        let unique_count = unique.len();
        info!(total_discovered, unique_count, invalid_count, "aggregation done");

        // Admit, score, enrich, persist - bounded to the top N candidates
        // since judgment and contact lookups are the expensive steps.
        let mut entries: Vec<ReportEntry> = Vec::new();
        let mut skipped_known = 0;
        let mut judge_fallbacks = 0;

        for posting in unique.into_iter().take(self.limit) {
            let Some(hash) = self.gate.admit(&posting) else {
                skipped_known += 1;
                continue;
            };

            info!(company = %posting.company_name, title = %posting.title, "new opportunity");

            let score = score_posting(self.judge.as_ref(), &self.profile, &posting);
            info!(
                base = score.base_score,
                location = score.location_adjustment,
                company = score.company_adjustment,
                score = score.final_score,
                "scored"
            );
            if score.used_fallback {
                judge_fallbacks += 1;
            }

            let contacts = self
                .contacts
                .find(&posting.company_name, &self.profile.contact_role_keywords);

            if !self.dry_run {
                self.gate.persist(&hash, &posting, &score, &contacts);
            }

            entries.push(ReportEntry { posting, score, contacts });
        }

        // Rank. Sort is stable, so equal scores keep discovery order.
        entries.sort_by(|a, b| b.score.final_score.cmp(&a.score.final_score));

        RunReport {
            total_discovered,
            invalid_count,
            unique_count,
            skipped_known,
            admitted_count: entries.len(),
            judge_fallbacks,
            store_degraded: self.gate.degraded(),
            dry_run: self.dry_run,
            entries,
        }
    }
}
