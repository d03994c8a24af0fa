//! Fit-score calculation.
//!
//! Two models are available and exactly one is active per deployment
//! (`FIT_SCORE_MODEL`). Both are total: unknown seniority or skill names fall
//! back to default weights and the score is always clamped to `0..=100`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_SCORE: i32 = 100;

/// Raw points that normalize to a score of 100 under the skill model.
const SKILL_MODEL_SCALE: f64 = 80.0;
const DEFAULT_SKILL_POINTS: u32 = 3;

const SKILL_POINTS: &[(&str, u32)] = &[
    ("next.js", 7),
    ("supabase", 7),
    ("docker", 7),
    ("typescript", 5),
    ("node.js", 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringModel {
    /// Seniority plus weighted skills.
    Skills,
    /// Mean of performance, energy and culture ratings.
    Ratings,
}

impl FromStr for ScoringModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skills" | "skill" | "a" => Ok(ScoringModel::Skills),
            "ratings" | "rating" | "b" => Ok(ScoringModel::Ratings),
            other => Err(format!("unknown scoring model '{}' (expected skills or ratings)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
}

impl Seniority {
    pub fn points(self) -> u32 {
        match self {
            Seniority::Junior => 10,
            Seniority::Mid => 20,
            Seniority::Senior => 30,
        }
    }
}

impl FromStr for Seniority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "junior" | "júnior" => Ok(Seniority::Junior),
            "mid" | "pleno" => Ok(Seniority::Mid),
            "senior" | "sênior" => Ok(Seniority::Senior),
            other => Err(format!("unknown seniority '{}'", other)),
        }
    }
}

/// Ordered from worst to best within each model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Out of profile")]
    OutOfProfile,
    #[serde(rename = "Questionable fit")]
    QuestionableFit,
    #[serde(rename = "Promising")]
    Promising,
    #[serde(rename = "Approved fit")]
    ApprovedFit,
    #[serde(rename = "Ideal")]
    Ideal,
    #[serde(rename = "Extremely high fit")]
    ExtremelyHighFit,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::OutOfProfile => "Out of profile",
            Classification::QuestionableFit => "Questionable fit",
            Classification::Promising => "Promising",
            Classification::ApprovedFit => "Approved fit",
            Classification::Ideal => "Ideal",
            Classification::ExtremelyHighFit => "Extremely high fit",
        }
    }

    pub fn for_skill_score(score: i32) -> Self {
        match score {
            s if s >= 75 => Classification::Ideal,
            s if s >= 50 => Classification::Promising,
            _ => Classification::OutOfProfile,
        }
    }

    pub fn for_rating_score(score: i32) -> Self {
        match score {
            s if s >= 80 => Classification::ExtremelyHighFit,
            s if s >= 60 => Classification::ApprovedFit,
            s if s >= 40 => Classification::QuestionableFit,
            _ => Classification::OutOfProfile,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Classification::OutOfProfile,
            Classification::QuestionableFit,
            Classification::Promising,
            Classification::ApprovedFit,
            Classification::Ideal,
            Classification::ExtremelyHighFit,
        ]
        .into_iter()
        .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown classification '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitScore {
    pub score: i32,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratings {
    pub performance: u8,
    pub energy: u8,
    pub culture: u8,
}

pub fn skill_points(skill: &str) -> u32 {
    let key = skill.trim().to_lowercase();
    SKILL_POINTS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, points)| *points)
        .unwrap_or(DEFAULT_SKILL_POINTS)
}

/// Seniority/skill model. Unknown seniority contributes nothing.
pub fn score_by_skills<S: AsRef<str>>(seniority: &str, skills: &[S]) -> FitScore {
    let base = seniority.parse::<Seniority>().map(Seniority::points).unwrap_or(0);
    let raw = base + skills.iter().map(|s| skill_points(s.as_ref())).sum::<u32>();

    let normalized = (f64::from(raw) * 100.0 / SKILL_MODEL_SCALE).round();
    let score = (normalized as i32).min(MAX_SCORE);

    FitScore {
        score,
        classification: Classification::for_skill_score(score),
    }
}

/// Three-dimension model. Ratings above 100 are clamped.
pub fn score_by_ratings(ratings: Ratings) -> FitScore {
    let total = [ratings.performance, ratings.energy, ratings.culture]
        .into_iter()
        .map(|r| u32::from(r.min(MAX_SCORE as u8)))
        .sum::<u32>();
    let score = (f64::from(total) / 3.0).round() as i32;

    FitScore {
        score,
        classification: Classification::for_rating_score(score),
    }
}
