//! Prompt assembly for the SQL planner.
//!
//! Encodes the planner contract: output columns, the legal join path, the
//! depth-weighted rollup convention, and the series marker. Few-shot
//! examples demonstrate each query family.

use crate::guard::SERIES_MARKER;

use super::PlanRequest;

/// Depth used when the caller gives no explicit window; effectively "all
/// horizons".
const UNBOUNDED_DEPTH_CM: u32 = 9999;

/// A worked question -> SQL example.
#[derive(Debug, Clone, Copy)]
pub struct FewShot {
    pub question: &'static str,
    pub sql: &'static str,
}

/// Few-shot examples handed to the planner with every request.
pub const FEWSHOTS: &[FewShot] = &[
    FewShot {
        question: "hydric rating by map unit",
        sql: "WITH x AS (SELECT mu.mukey, ma.hydclprs AS value \
              FROM mapunit mu JOIN muaggatt ma USING(mukey)) \
              SELECT mukey, value FROM x",
    },
    FewShot {
        question: "weighted average awc to 100 cm",
        sql: "WITH hz AS (
  SELECT mu.mukey, co.cokey, co.comppct_r,
         MAX(0, MIN(ch.hzdepb_r, 100) - ch.hzdept_r) AS thk, ch.awc_r
  FROM mapunit mu JOIN component co USING(mukey) JOIN chorizon ch USING(cokey)
  WHERE ch.hzdept_r < 100
),
co_agg AS (
  SELECT mukey, cokey, SUM(awc_r*thk)/NULLIF(SUM(thk),0) AS comp_val
  FROM hz GROUP BY mukey, cokey
),
mu_agg AS (
  SELECT co.mukey,
         SUM(comp_val*(co.comppct_r/100.0))/NULLIF(SUM(co.comppct_r/100.0),0) AS value
  FROM co_agg JOIN component co USING(mukey, cokey) GROUP BY co.mukey
)
SELECT mukey, value FROM mu_agg",
    },
    FewShot {
        question: "list soil series",
        sql: "---SERIES---\nSELECT mu.mukey, co.cokey, co.compname, co.comppct_r, \
              NULL AS value FROM mapunit mu JOIN component co USING(mukey)",
    },
];

/// Builds the planner system prompt.
pub fn system_prompt(depth_cm: Option<u32>) -> String {
    let depth = depth_cm.unwrap_or(UNBOUNDED_DEPTH_CM);
    format!(
        "You are a SSURGO text-to-SQL planner.\n\
         Rules:\n\
         - Use only tables/columns that exist in the provided schema dump.\n\
         - Legal horizon path: mapunit.mukey -> component.mukey -> chorizon.cokey.\n\
         - If an attribute exists at MU level (muaggatt.*), prefer that \
         (No Aggregation Necessary).\n\
         - Mapunit-level Weighted Average uses component percent: comppct_r/100.\n\
         - Horizon depth rollups weight by thickness: \
         (MIN(hzdepb_r, {depth}) - hzdept_r), clipped to depth.\n\
         - Output columns must be (mukey, value). For \"series\" requests also \
         produce a per-component SELECT with columns \
         (mukey, cokey, compname, comppct_r, value) after a line: {SERIES_MARKER}.\n\
         - Never generate DDL, INSERT/UPDATE/DELETE, PRAGMA, or semicolons.\n"
    )
}

/// Builds the user prompt: schema, retrieved context, examples, controls,
/// and the question.
pub fn user_prompt(request: &PlanRequest) -> String {
    let context = request
        .context
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let shots = FEWSHOTS
        .iter()
        .map(|shot| format!("Q: {}\nSQL:\n{}", shot.question, shot.sql))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut out = format!(
        "Schema:\n{}\n\nContext:\n{}\n\nExamples:\n{}\n\n",
        request.schema_text, context, shots
    );
    if let Some(method) = request.method {
        out.push_str(&format!("Aggregation override: {method}\n"));
    }
    out.push_str(&format!(
        "Question:\n{}\nReturn only the SQL.",
        request.question
    ));
    out
}
