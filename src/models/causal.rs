/// Withdrawal reason codes accepted by the portal's reason selector
///
/// The discriminant is the `<option value>` in the portal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CausalCode {
    /// Inasistencia
    Absence = 2,
    /// Insuficiencia académica
    AcademicInsufficiency = 3,
    /// Medidas disciplinarias
    Disciplinary = 4,
    /// Solicitud personal por escrito
    PersonalRequest = 5,
    /// Deserción
    Desertion = 6,
    /// Fallecimiento
    Death = 7,
    /// Pérdida de requisito
    RequirementLoss = 8,
    /// Baja definitiva
    Definitive = 9,
}

impl CausalCode {
    /// Code used when nothing else matches
    pub const DEFAULT: CausalCode = CausalCode::PersonalRequest;

    /// Portal option value
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Option value as sent to the form
    pub fn value(self) -> String {
        self.code().to_string()
    }

    /// Label shown by the portal
    pub fn label(self) -> &'static str {
        match self {
            CausalCode::Absence => "Inasistencia",
            CausalCode::AcademicInsufficiency => "Insuficiencia académica",
            CausalCode::Disciplinary => "Aplicación de medidas disciplinarias",
            CausalCode::PersonalRequest => "Solicitud personal por escrito",
            CausalCode::Desertion => "Deserción",
            CausalCode::Death => "Fallecimiento",
            CausalCode::RequirementLoss => "Pérdida de requisito",
            CausalCode::Definitive => "Baja definitiva",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(CausalCode::Absence),
            3 => Some(CausalCode::AcademicInsufficiency),
            4 => Some(CausalCode::Disciplinary),
            5 => Some(CausalCode::PersonalRequest),
            6 => Some(CausalCode::Desertion),
            7 => Some(CausalCode::Death),
            8 => Some(CausalCode::RequirementLoss),
            9 => Some(CausalCode::Definitive),
            _ => None,
        }
    }
}

impl std::fmt::Display for CausalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
