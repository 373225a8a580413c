use std::collections::BTreeSet;

use super::super::domain::{Candidate, ExperienceLevel, Job};

/// Score used whenever a dimension has no data to compare.
pub(crate) const UNKNOWN_SCORE: f64 = 50.0;

const UNDER_BAND_PENALTY: f64 = 25.0;
const OVER_BAND_PENALTY: f64 = 10.0;
const OVER_BAND_FLOOR: f64 = 50.0;

/// Case-insensitive split of required skills against the candidate's skills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SkillPartition {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub additional: Vec<String>,
}

impl SkillPartition {
    pub(crate) fn score(&self) -> f64 {
        let required = self.matched.len() + self.missing.len();
        if required == 0 {
            return 0.0;
        }
        self.matched.len() as f64 / required as f64 * 100.0
    }
}

pub(crate) fn partition_skills(candidate: &Candidate, job: &Job) -> SkillPartition {
    let held: BTreeSet<String> = candidate
        .skills
        .iter()
        .map(|skill| skill.name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut seen = BTreeSet::new();
    let mut partition = SkillPartition::default();
    for skill in job.required_skills() {
        let key = skill.to_lowercase();
        if !seen.insert(key.clone()) {
            continue;
        }
        if held.contains(&key) {
            partition.matched.push(skill.to_string());
        } else {
            partition.missing.push(skill.to_string());
        }
    }

    for skill in &candidate.skills {
        let name = skill.name.trim();
        let key = name.to_lowercase();
        if !name.is_empty() && seen.insert(key) {
            partition.additional.push(name.to_string());
        }
    }

    partition
}

pub(crate) fn experience_score(years: u32, level: ExperienceLevel) -> f64 {
    let (floor, ceiling) = level.year_band();
    if years < floor {
        let gap = f64::from(floor - years);
        return (100.0 - UNDER_BAND_PENALTY * gap).max(0.0);
    }
    match ceiling {
        Some(ceiling) if years > ceiling => {
            let excess = f64::from(years - ceiling);
            (100.0 - OVER_BAND_PENALTY * excess).max(OVER_BAND_FLOOR)
        }
        _ => 100.0,
    }
}

pub(crate) fn salary_score(expected: Option<u32>, job: &Job) -> f64 {
    match (expected, job.salary_max) {
        (Some(expected), Some(max)) if max > 0 => {
            if expected <= max {
                100.0
            } else {
                let excess = f64::from(expected - max) / f64::from(max);
                (100.0 * (1.0 - excess)).clamp(0.0, 100.0)
            }
        }
        _ => UNKNOWN_SCORE,
    }
}

/// Share of the candidate's preference keywords found in the job's culture text,
/// falling back to the description when no culture blurb exists.
pub(crate) fn culture_score(candidate: &Candidate, job: &Job) -> f64 {
    let preferences: BTreeSet<String> = candidate
        .work_preferences
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if preferences.is_empty() {
        return UNKNOWN_SCORE;
    }

    let text = job
        .company_culture
        .as_deref()
        .filter(|culture| !culture.trim().is_empty())
        .unwrap_or(&job.description)
        .to_lowercase();
    if text.trim().is_empty() {
        return UNKNOWN_SCORE;
    }

    let hits = preferences
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count();
    hits as f64 / preferences.len() as f64 * 100.0
}

/// One decimal place, matching how scores are displayed and persisted.
pub(crate) fn round_score(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
