use crate::dto::candidate_dto::{CandidateFilter, CreateCandidatePayload, MetricsResponse};
use crate::error::{Error, Result};
use crate::models::candidate::{AnalysisStatus, Candidate, CandidateWithSkills, NotificationStatus};
use crate::models::skill::Skill;
use crate::services::scoring::{self, Classification, FitScore, Ratings, ScoringModel};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, seniority, profile_summary, performance, energy, culture, \
     fit_score, fit_score_classification, notification_status, llm_analysis_status, llm_analysis, \
     created_at, updated_at";

/// Intake data after presence checks and scoring, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub seniority: String,
    pub profile_summary: String,
    pub skill_ids: Vec<Uuid>,
    pub ratings: Option<Ratings>,
}

impl NewCandidate {
    /// Trims input and checks everything that does not need the store.
    pub fn from_payload(payload: CreateCandidatePayload, model: ScoringModel) -> Result<Self> {
        let required = |value: String, field: &str| -> Result<String> {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(Error::BadRequest(format!("{} is required", field)));
            }
            Ok(trimmed)
        };

        let name = required(payload.name, "name")?;
        let email = required(payload.email, "email")?.to_lowercase();
        let seniority = required(payload.seniority, "seniority")?;
        let profile_summary = required(payload.profile_summary, "profile_summary")?;

        let mut skill_ids = payload.skill_ids;
        skill_ids.sort();
        skill_ids.dedup();
        if skill_ids.is_empty() {
            return Err(Error::BadRequest("at least one skill is required".into()));
        }

        let ratings = match (payload.performance, payload.energy, payload.culture) {
            (Some(p), Some(e), Some(c)) => Some(Ratings {
                performance: to_rating(p, "performance")?,
                energy: to_rating(e, "energy")?,
                culture: to_rating(c, "culture")?,
            }),
            (None, None, None) if model == ScoringModel::Ratings => {
                return Err(Error::BadRequest(
                    "performance, energy and culture are required".into(),
                ))
            }
            (None, None, None) => None,
            _ => {
                return Err(Error::BadRequest(
                    "performance, energy and culture must be given together".into(),
                ))
            }
        };

        Ok(Self {
            name,
            email,
            phone: payload.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            seniority,
            profile_summary,
            skill_ids,
            ratings,
        })
    }

    pub fn score(&self, model: ScoringModel, skill_names: &[String]) -> FitScore {
        match (model, self.ratings) {
            (ScoringModel::Ratings, Some(ratings)) => scoring::score_by_ratings(ratings),
            _ => scoring::score_by_skills(&self.seniority, skill_names),
        }
    }
}

fn to_rating(value: i16, field: &str) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|v| i32::from(*v) <= scoring::MAX_SCORE)
        .ok_or_else(|| Error::BadRequest(format!("{} must be between 0 and 100", field)))
}

/// `ILIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_skills(&self) -> Result<Vec<Skill>> {
        let skills = sqlx::query_as::<_, Skill>("SELECT id, name FROM skills ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(skills)
    }

    /// Scores and stores a candidate with its skills in one transaction.
    pub async fn create_candidate(
        &self,
        new: NewCandidate,
        model: ScoringModel,
    ) -> Result<Candidate> {
        let skill_names: Vec<String> = sqlx::query("SELECT name FROM skills WHERE id = ANY($1)")
            .bind(&new.skill_ids)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<std::result::Result<_, _>>()?;

        if skill_names.len() != new.skill_ids.len() {
            return Err(Error::BadRequest("One or more skills do not exist.".into()));
        }

        let fit = new.score(model, &skill_names);
        tracing::info!(
            email = %new.email,
            model = ?model,
            score = fit.score,
            classification = %fit.classification,
            "scored candidate"
        );

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Candidate>(&format!(
            r#"
            INSERT INTO candidates (
                name, email, phone, seniority, profile_summary, performance, energy, culture,
                fit_score, fit_score_classification, notification_status, llm_analysis_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.seniority)
        .bind(&new.profile_summary)
        .bind(new.ratings.map(|r| i16::from(r.performance)))
        .bind(new.ratings.map(|r| i16::from(r.energy)))
        .bind(new.ratings.map(|r| i16::from(r.culture)))
        .bind(fit.score)
        .bind(fit.classification.label())
        .bind(NotificationStatus::Pending.as_str())
        .bind(AnalysisStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await;

        let candidate = match inserted {
            Ok(c) => c,
            Err(e) => {
                return Err(match Error::from(e) {
                    Error::Conflict(_) => Error::Conflict("Email already exists.".into()),
                    other => other,
                })
            }
        };

        sqlx::query(
            r#"
            INSERT INTO candidate_skills (candidate_id, skill_id)
            SELECT $1, skill_id FROM UNNEST($2::uuid[]) AS skill_id
            "#,
        )
        .bind(candidate.id)
        .bind(&new.skill_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(candidate)
    }

    pub async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<CandidateWithSkills>> {
        let classification = match filter.classification.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(label) => Some(
                label
                    .parse::<Classification>()
                    .map_err(Error::BadRequest)?
                    .label(),
            ),
        };
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let candidates = sqlx::query_as::<_, CandidateWithSkills>(
            r#"
            SELECT c.id, c.name, c.email, c.phone, c.seniority, c.profile_summary,
                   c.performance, c.energy, c.culture, c.fit_score, c.fit_score_classification,
                   c.notification_status, c.llm_analysis_status, c.llm_analysis,
                   c.created_at, c.updated_at,
                   COALESCE(
                       json_agg(json_build_object('name', s.name) ORDER BY s.name)
                           FILTER (WHERE s.id IS NOT NULL),
                       '[]'::json
                   ) AS skills
            FROM candidates c
            LEFT JOIN candidate_skills cs ON cs.candidate_id = c.id
            LEFT JOIN skills s ON s.id = cs.skill_id
            WHERE ($1::text IS NULL OR c.fit_score_classification = $1)
              AND ($2::text IS NULL OR c.name ILIKE $2 ESCAPE '\' OR c.email ILIKE $2 ESCAPE '\')
            GROUP BY c.id
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(classification)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    pub async fn get_metrics(&self) -> Result<MetricsResponse> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)::bigint AS total,
                   COALESCE(AVG(fit_score)::float8, 0) AS average
            FROM candidates
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(MetricsResponse {
            total_candidates: row.try_get("total")?,
            average_fit_score: row.try_get("average")?,
        })
    }
}
