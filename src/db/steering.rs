use super::*;

use rusqlite::params;

use crate::types::{SteeringProfile, SteeringWeights};

struct ProfileRow {
    product_focus: String,
    icp: String,
    key_pains: String,
    disallowed_claims: String,
    competitor_list: String,
    weight_news: f64,
    weight_role_pains: f64,
    weight_competitors: f64,
    specificity_rules: String,
    version: i64,
    updated_at: String,
}

fn decode_profile(row: ProfileRow) -> Result<SteeringProfile, DbError> {
    Ok(SteeringProfile {
        product_focus: row.product_focus,
        icp: row.icp,
        key_pains: from_json("key_pains", &row.key_pains)?,
        disallowed_claims: from_json("disallowed_claims", &row.disallowed_claims)?,
        competitor_list: from_json("competitor_list", &row.competitor_list)?,
        weights: SteeringWeights {
            news: row.weight_news,
            role_pains: row.weight_role_pains,
            competitors: row.weight_competitors,
        },
        specificity_rules: from_json("specificity_rules", &row.specificity_rules)?,
        version: row.version,
        updated_at: parse_timestamp("updated_at", &row.updated_at)?,
    })
}

impl MeetingDb {
    // =========================================================================
    // Steering profile (singleton row)
    // =========================================================================

    /// Load the current steering profile, if one has been persisted.
    pub fn get_steering_profile(&self) -> Result<Option<SteeringProfile>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT product_focus, icp, key_pains, disallowed_claims, competitor_list,
                    weight_news, weight_role_pains, weight_competitors,
                    specificity_rules, version, updated_at
             FROM steering_profile
             WHERE id = 1",
        )?;

        let mut rows = stmt.query_map([], |row| {
            Ok(ProfileRow {
                product_focus: row.get(0)?,
                icp: row.get(1)?,
                key_pains: row.get(2)?,
                disallowed_claims: row.get(3)?,
                competitor_list: row.get(4)?,
                weight_news: row.get(5)?,
                weight_role_pains: row.get(6)?,
                weight_competitors: row.get(7)?,
                specificity_rules: row.get(8)?,
                version: row.get(9)?,
                updated_at: row.get(10)?,
            })
        })?;

        match rows.next() {
            Some(row) => Ok(Some(decode_profile(row?)?)),
            None => Ok(None),
        }
    }

    /// Write the whole profile in one statement (last write wins).
    pub fn save_steering_profile(&self, profile: &SteeringProfile) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO steering_profile (
                id, product_focus, icp, key_pains, disallowed_claims, competitor_list,
                weight_news, weight_role_pains, weight_competitors,
                specificity_rules, version, updated_at
             ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                product_focus = excluded.product_focus,
                icp = excluded.icp,
                key_pains = excluded.key_pains,
                disallowed_claims = excluded.disallowed_claims,
                competitor_list = excluded.competitor_list,
                weight_news = excluded.weight_news,
                weight_role_pains = excluded.weight_role_pains,
                weight_competitors = excluded.weight_competitors,
                specificity_rules = excluded.specificity_rules,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![
                profile.product_focus,
                profile.icp,
                to_json("key_pains", &profile.key_pains)?,
                to_json("disallowed_claims", &profile.disallowed_claims)?,
                to_json("competitor_list", &profile.competitor_list)?,
                profile.weights.news,
                profile.weights.role_pains,
                profile.weights.competitors,
                to_json("specificity_rules", &profile.specificity_rules)?,
                profile.version,
                profile.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
