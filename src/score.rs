use crate::ai::Judge;
use crate::models::Posting;
use crate::profile::Profile;

/// Neutral base used when the judgment call fails or returns nothing
/// parseable. Chosen so a missing judgment neither buries nor inflates a
/// posting once the deterministic adjustments land on top.
pub const FALLBACK_BASE_SCORE: i64 = 70;

pub const FALLBACK_MARKER: &str = "[no AI judgment - neutral base score applied]";

/// The outcome of scoring one posting. `final_score` is always in 0-100.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub base_score: i64,
    pub location_adjustment: i64,
    pub company_adjustment: i64,
    pub final_score: i64,
    pub rationale: String,
    /// True when the judge failed and the neutral base was substituted.
    pub used_fallback: bool,
}

/// Deterministic location weight. Exact substring match against configured
/// location names first, then synonym groups; first match wins, no match
/// scores 0.
pub fn location_weight(profile: &Profile, location: &str) -> i64 {
    let loc = location.to_lowercase();

    for entry in &profile.locations {
        if loc.contains(&entry.name.to_lowercase()) {
            return entry.weight;
        }
    }

    for entry in &profile.locations {
        for synonym in &entry.synonyms {
            if loc.contains(&synonym.to_lowercase()) {
                return entry.weight;
            }
        }
    }

    0
}

/// Deterministic target-company bonus. Case-insensitive substring match in
/// either direction, any category; flat bonus on match, 0 otherwise.
pub fn company_bonus(profile: &Profile, company_name: &str) -> i64 {
    let name = company_name.trim().to_lowercase();
    if name.is_empty() {
        return 0;
    }

    for target in profile.all_target_companies() {
        let target = target.to_lowercase();
        if name.contains(&target) || target.contains(&name) {
            return profile.company_bonus;
        }
    }

    0
}

/// Build the judgment prompt. The deterministic adjustments are embedded so
/// the judge is informed of them, but it is asked to score fit only - the
/// adjustments are applied in fusion, never by the model.
pub fn build_prompt(
    profile: &Profile,
    posting: &Posting,
    location_adjustment: i64,
    company_adjustment: i64,
) -> String {
    format!(
        "You are evaluating job fit for a {level} candidate with this profile:\n\
         - Background: {background}\n\
         - Seeking: {titles}\n\
         - Industries: {industries}\n\
         - Avoids: {avoid}\n\n\
         Job posting:\n\
         Title: {title}\n\
         Company: {company}\n\
         Location: {location}\n\
         Description: {description}\n\n\
         Deterministic adjustments already computed (do NOT add them yourself):\n\
         - Location adjustment: {loc_adj:+}\n\
         - Target-company adjustment: {comp_adj:+}\n\n\
         Score this job 0-100 on fit alone, considering:\n\
         1. Seniority level match\n\
         2. Industry alignment with preferences\n\
         3. Company stage/culture fit (growth-stage over bureaucratic)\n\
         4. Role complexity and strategic impact potential\n\n\
         Reply with 'Score: <number>' on the first line, then a 2-3 sentence \
         explanation of the fit factors.",
        level = profile.experience_level,
        background = profile.background,
        titles = profile.title_keywords.join(", "),
        industries = profile.industries.join(", "),
        avoid = profile.avoid.join(", "),
        title = posting.title,
        company = posting.company_name,
        location = posting.location,
        description = posting.description.as_deref().unwrap_or("(none)"),
        loc_adj = location_adjustment,
        comp_adj = company_adjustment,
    )
}

/// Score one posting: rule evaluation, AI judgment, then fusion. The only
/// non-deterministic input is the judge's base score; a judge failure is
/// absorbed here with the neutral fallback and never aborts the run.
pub fn score_posting(judge: &dyn Judge, profile: &Profile, posting: &Posting) -> ScoreResult {
    let location_adjustment = location_weight(profile, &posting.location);
    let company_adjustment = company_bonus(profile, &posting.company_name);

    let prompt = build_prompt(profile, posting, location_adjustment, company_adjustment);

    let (base_score, mut rationale, used_fallback) = match judge.judge(&prompt) {
        Ok(verdict) => (verdict.score, verdict.text.trim().to_string(), false),
        Err(e) => {
            tracing::warn!(
                company = %posting.company_name,
                title = %posting.title,
                error = %e,
                "judgment failed, using neutral base score"
            );
            (FALLBACK_BASE_SCORE, FALLBACK_MARKER.to_string(), true)
        }
    };

    let final_score = (base_score + location_adjustment + company_adjustment).clamp(0, 100);

    rationale.push_str(&format!(
        "\n[score: base {}, location {:+}, company {:+} -> final {}]",
        base_score, location_adjustment, company_adjustment, final_score
    ));

    ScoreResult {
        base_score,
        location_adjustment,
        company_adjustment,
        final_score,
        rationale,
        used_fallback,
    }
}
