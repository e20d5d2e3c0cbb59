//! Causal resolution - maps free-text withdrawal reasons onto portal codes
//!
//! Order: exact table lookup, then ordered keyword scan, then the default code.
//! Never fails: a misspelled reason degrades to the default instead of stopping the batch.

use phf::phf_map;
use tracing::warn;

use crate::models::CausalCode;

/// Texts as they appear in the withdrawal sheets (normalised: trimmed, upper-case)
static EXACT_CAUSALS: phf::Map<&'static str, CausalCode> = phf_map! {
    "SUSPENSION POR SOLICITUD PERSONAL" => CausalCode::PersonalRequest,
    "SUSPENSION POR DESERCION" => CausalCode::Desertion,
    "INSUFICIENCIA ACADÉMICA" => CausalCode::AcademicInsufficiency,
    "INSUFICIENCIA ACADEMICA" => CausalCode::AcademicInsufficiency,
    "SUSPENSION TEMPORAL POR INASISTENCIA" => CausalCode::Absence,
    "APLICACIÓN DE MEDIDAS DISCIPLINARIAS" => CausalCode::Disciplinary,
    "BAJA DEFINITIVA" => CausalCode::Definitive,
    "FALLECIMIENTO" => CausalCode::Death,
    "PÉRDIDA DE REQUISITO" => CausalCode::RequirementLoss,
    "PERDIDA DE REQUISITO" => CausalCode::RequirementLoss,
};

/// Checked in order, first hit wins
const KEYWORDS: &[(&str, CausalCode)] = &[
    ("DESERCI", CausalCode::Desertion),
    ("INASISTENCIA", CausalCode::Absence),
    ("INSUFICIENCIA", CausalCode::AcademicInsufficiency),
    ("DISCIPLINARIA", CausalCode::Disciplinary),
    ("DEFINITIVA", CausalCode::Definitive),
    ("FALLECIMIENTO", CausalCode::Death),
    ("REQUISITO", CausalCode::RequirementLoss),
    ("PERSONAL", CausalCode::PersonalRequest),
    ("VOLUNTARIA", CausalCode::PersonalRequest),
];

/// How a code was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Keyword(&'static str),
    /// Nothing matched (or the text was empty)
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub code: CausalCode,
    pub matched: MatchKind,
}

/// Resolve a causal text; `None`, blank, `nan` and `none` all fall back to the default
pub fn resolve(text: Option<&str>) -> Resolution {
    let normalized = text.map(|t| t.trim().to_uppercase()).unwrap_or_default();

    if normalized.is_empty() || normalized == "NAN" || normalized == "NONE" {
        return Resolution {
            code: CausalCode::DEFAULT,
            matched: MatchKind::Default,
        };
    }

    if let Some(&code) = EXACT_CAUSALS.get(normalized.as_str()) {
        return Resolution {
            code,
            matched: MatchKind::Exact,
        };
    }

    if let Some(&(keyword, code)) = KEYWORDS.iter().find(|(k, _)| normalized.contains(k)) {
        return Resolution {
            code,
            matched: MatchKind::Keyword(keyword),
        };
    }

    warn!(
        "⚠️ Unrecognised causal '{}', using default {}",
        text.unwrap_or_default(),
        CausalCode::DEFAULT
    );
    Resolution {
        code: CausalCode::DEFAULT,
        matched: MatchKind::Default,
    }
}

/// Shorthand for callers that only need the code
pub fn resolve_code(text: &str) -> CausalCode {
    resolve(Some(text)).code
}
