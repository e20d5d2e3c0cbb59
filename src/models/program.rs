use serde::Deserialize;

use crate::error::ConfigError;

/// Program variant; selects the portal listing route and the input sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramType {
    /// Programa Nacional de Formación
    Pnf,
    /// Programa Nacional de Formación Avanzada
    Pnfa,
}

impl ProgramType {
    /// Route suffix used in `alumno-{slug}`
    pub fn slug(self) -> &'static str {
        match self {
            ProgramType::Pnf => "pnf",
            ProgramType::Pnfa => "pnfa",
        }
    }

    /// Sheet holding this program's withdrawals in the input workbook
    pub fn sheet_name(self) -> &'static str {
        match self {
            ProgramType::Pnf => "BAJAS TOTALES",
            ProgramType::Pnfa => "BAJAS PNFA TOTALES",
        }
    }
}

impl std::str::FromStr for ProgramType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pnf" => Ok(ProgramType::Pnf),
            "pnfa" => Ok(ProgramType::Pnfa),
            _ => Err(ConfigError::UnknownProgram(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProgramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" PNF ".parse::<ProgramType>().unwrap(), ProgramType::Pnf);
        assert_eq!("Pnfa".parse::<ProgramType>().unwrap(), ProgramType::Pnfa);
        assert!("pregrado".parse::<ProgramType>().is_err());
    }

    #[test]
    fn test_sheet_names() {
        assert_eq!(ProgramType::Pnf.sheet_name(), "BAJAS TOTALES");
        assert_eq!(ProgramType::Pnfa.sheet_name(), "BAJAS PNFA TOTALES");
    }
}
