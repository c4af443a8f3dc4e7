//! Steering profile store and weight normalization.
//!
//! Raw weights are stored exactly as entered (after clamping to `[0, 1]`);
//! normalization is a read-time projection, so the editor can always show
//! what was typed alongside what will be applied.

use chrono::Utc;

use crate::db::{DbError, MeetingDb};
use crate::types::{
    ListPatch, NormalizedWeights, SteeringPatch, SteeringProfile, SteeringWeights,
};

/// Project three raw weights onto a convex combination.
///
/// A non-positive sum yields the all-zero projection: no ranking signal,
/// callers fall back to insertion order. Otherwise the outputs sum to 1
/// (within floating-point tolerance).
pub fn normalize(news: f64, role_pains: f64, competitors: f64) -> NormalizedWeights {
    let sum = news + role_pains + competitors;
    if sum <= 0.0 {
        return NormalizedWeights {
            news: 0.0,
            role_pains: 0.0,
            competitors: 0.0,
        };
    }

    NormalizedWeights {
        news: news / sum,
        role_pains: role_pains / sum,
        competitors: competitors / sum,
    }
}

impl SteeringProfile {
    /// The weighting the ranking step actually consumes.
    pub fn applied_weights(&self) -> NormalizedWeights {
        normalize(
            self.weights.news,
            self.weights.role_pains,
            self.weights.competitors,
        )
    }
}

/// Split free text into trimmed, non-empty entries on commas and newlines.
pub fn split_entries(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn clamp_weight(weight: f64) -> f64 {
    weight.clamp(0.0, 1.0)
}

fn resolve_list(current: Vec<String>, patch: Option<ListPatch>) -> Vec<String> {
    match patch {
        None => current,
        Some(ListPatch::Items(items)) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Some(ListPatch::Text(text)) => split_entries(&text),
    }
}

/// Bootstrap profile used until the first explicit update.
pub fn default_profile() -> SteeringProfile {
    SteeringProfile {
        product_focus: "Always-on meeting prep agent".to_string(),
        icp: "B2B SaaS founders".to_string(),
        key_pains: vec!["Generic outreach".to_string(), "Low reply rates".to_string()],
        disallowed_claims: vec!["We guarantee outcomes".to_string()],
        competitor_list: vec!["CompetitorX".to_string(), "CompetitorY".to_string()],
        weights: SteeringWeights {
            news: 0.34,
            role_pains: 0.33,
            competitors: 0.33,
        },
        specificity_rules: vec![
            "Reference recent news".to_string(),
            "Avoid vague claims".to_string(),
        ],
        version: 1,
        updated_at: Utc::now(),
    }
}

/// Load the current profile, persisting the bootstrap default on first read.
pub fn get_or_init(db: &MeetingDb) -> Result<SteeringProfile, DbError> {
    if let Some(profile) = db.get_steering_profile()? {
        return Ok(profile);
    }

    let profile = default_profile();
    db.save_steering_profile(&profile)?;
    log::info!("Steering profile: bootstrapped default (version {})", profile.version);
    Ok(profile)
}

/// Merge a sparse patch into the current profile.
///
/// Weights are clamped to `[0, 1]` rather than rejected; list fields accept
/// free text and are split into entries. Every accepted patch bumps
/// `version` by exactly 1.
pub fn apply_patch(current: SteeringProfile, patch: SteeringPatch) -> SteeringProfile {
    let weights = match patch.weights {
        None => current.weights,
        Some(overrides) => SteeringWeights {
            news: clamp_weight(overrides.news.unwrap_or(current.weights.news)),
            role_pains: clamp_weight(overrides.role_pains.unwrap_or(current.weights.role_pains)),
            competitors: clamp_weight(
                overrides.competitors.unwrap_or(current.weights.competitors),
            ),
        },
    };

    SteeringProfile {
        product_focus: patch.product_focus.unwrap_or(current.product_focus),
        icp: patch.icp.unwrap_or(current.icp),
        key_pains: resolve_list(current.key_pains, patch.key_pains),
        disallowed_claims: resolve_list(current.disallowed_claims, patch.disallowed_claims),
        competitor_list: resolve_list(current.competitor_list, patch.competitor_list),
        weights,
        specificity_rules: resolve_list(current.specificity_rules, patch.specificity_rules),
        version: current.version + 1,
        updated_at: Utc::now(),
    }
}

/// Apply a patch against the persisted profile and write the result back.
pub fn update_profile(
    db: &MeetingDb,
    patch: SteeringPatch,
) -> Result<SteeringProfile, DbError> {
    let current = get_or_init(db)?;
    let updated = apply_patch(current, patch);
    db.save_steering_profile(&updated)?;
    log::info!("Steering profile: updated to version {}", updated.version);
    Ok(updated)
}
