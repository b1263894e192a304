use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::models::StudentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Academic,
    Psychosocial,
    Economic,
    Health,
    Other,
}

impl RiskCategory {
    /// Every category in precedence order, `Other` last.
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::Academic,
        RiskCategory::Psychosocial,
        RiskCategory::Economic,
        RiskCategory::Health,
        RiskCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Academic => "Academic",
            RiskCategory::Psychosocial => "Psychosocial",
            RiskCategory::Economic => "Economic",
            RiskCategory::Health => "Health",
            RiskCategory::Other => "Other",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keyword stems checked in order; the first category with a matching stem wins.
/// Stems are lowercase ASCII and cover English and Spanish spellings. A leading
/// space anchors a stem to the start of a word.
const KEYWORD_TABLE: &[(RiskCategory, &[&str])] = &[
    (
        RiskCategory::Academic,
        &[
            "academic", "study", "studies", "studying", "estudio", "homework", "subject",
            "course", "materia", "asignatura", " curso", "learning", "aprendizaje",
        ],
    ),
    (
        RiskCategory::Psychosocial,
        &[
            "psychosocial", "psicosocial", "emotion", "emocional", "famil", "social",
            "motivation", "motivac",
        ],
    ),
    (
        RiskCategory::Economic,
        &["economic", "financ", "job", "labor", "employ", "empleo", "work", "trabajo"],
    ),
    (
        RiskCategory::Health,
        &["health", "salud", "medic", "disability", "discapacidad"],
    ),
];

/// Classifies one label. Matching is a case- and accent-insensitive substring test.
///
/// ```
/// # use cohort_risk_analytics::classify::{classify, RiskCategory};
/// assert_eq!(classify("Problemas Académicos"), RiskCategory::Academic);
/// assert_eq!(classify("Salud mental"), RiskCategory::Health);
/// assert_eq!(classify("xyz"), RiskCategory::Other);
/// ```
pub fn classify(label: &str) -> RiskCategory {
    let folded = format!(" {}", fold(label));
    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| folded.contains(keyword)))
        .map_or(RiskCategory::Other, |(category, _)| *category)
}

/// Lowercases, strips Latin diacritics (precomposed or combining) and turns
/// punctuation into spaces.
fn fold(label: &str) -> String {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| !('\u{300}'..='\u{36f}').contains(c))
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other if other.is_alphanumeric() => other,
            _ => ' ',
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBucket {
    pub id: RiskCategory,
    pub label: String,
    /// Distinct factor labels, sorted.
    pub members: BTreeSet<String>,
    pub count: usize,
}

/// Groups every distinct risk-factor label of the population by category.
///
/// A label counts once no matter how many students carry it. Labels are trimmed
/// first and blank ones are ignored. All categories are returned, in precedence
/// order, even when empty.
pub fn aggregate_categories(records: &[StudentRecord]) -> Vec<CategoryBucket> {
    let grouped = records
        .iter()
        .flat_map(|record| record.risk_factors.iter())
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .fold(
            BTreeMap::<RiskCategory, BTreeSet<String>>::new(),
            |mut acc, label| {
                acc.entry(classify(label))
                    .or_default()
                    .insert(label.to_string());
                acc
            },
        );

    RiskCategory::ALL
        .into_iter()
        .map(|id| {
            let members = grouped.get(&id).cloned().unwrap_or_default();
            CategoryBucket {
                id,
                label: id.label().to_string(),
                count: members.len(),
                members,
            }
        })
        .collect()
}
