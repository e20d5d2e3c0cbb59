use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::ProgramType;

/// Program configuration
///
/// Defaults match the production portal. A TOML file (named by `SIGAE_CONFIG`)
/// may override any field, and environment variables override both.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal base address
    pub portal_base_url: String,
    /// Listing route, `{program}` is replaced by the program slug
    pub listing_path: String,
    /// Logout route used during teardown
    pub logout_path: String,
    /// Program variant processed by this run
    pub program: ProgramType,
    /// Input workbook: a `.csv` file or a directory with one `<sheet>.csv` per sheet
    pub input_file: String,
    /// Identifier column header
    pub identifier_column: String,
    /// Causal text columns, first non-empty wins
    pub causal_columns: Vec<String>,
    /// Pending-records checkpoint
    pub recovery_file: String,
    /// Append-only outcome journal
    pub journal_file: String,
    pub reports_dir: String,
    pub audits_dir: String,
    pub notices_dir: String,
    /// Plain-text notice template; notices are skipped when unset
    pub notice_template: Option<String>,
    /// Resume from the recovery file when one exists
    pub resume_pending: bool,
    // --- browser ---
    pub headless: bool,
    pub chrome_executable: Option<String>,
    /// Attach to an already running browser instead of launching one
    pub browser_debug_port: Option<u16>,
    // --- pacing ---
    pub inter_record_delay_ms: u64,
    pub short_wait_secs: u64,
    pub wait_secs: u64,
    pub redirect_wait_secs: u64,
    pub poll_interval_ms: u64,
    // --- result table ---
    /// Zero-based cell holding the identifier in listing rows
    pub identifier_cell_index: Option<usize>,
    /// Value for the listing's nationality filter; empty means any
    pub nationality_filter: String,
    /// Legacy behaviour: treat an uninspectable result table as "found"
    pub assume_found_on_inspection_error: bool,
    /// Run log file
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_base_url: "http://sigae.ucs.gob.ve".to_string(),
            listing_path: "/index.php?r=estudiante%2Falumno-{program}".to_string(),
            logout_path: "/index.php?r=site%2Flogout".to_string(),
            program: ProgramType::Pnf,
            input_file: "bajas.csv".to_string(),
            identifier_column: "CÉDULA".to_string(),
            causal_columns: vec!["CAUSAL".to_string(), "MOTIVO".to_string()],
            recovery_file: "pendientes_recuperacion.csv".to_string(),
            journal_file: "pendientes_recuperacion.journal".to_string(),
            reports_dir: "Reportes".to_string(),
            audits_dir: "Auditorias".to_string(),
            notices_dir: "Notificaciones".to_string(),
            notice_template: None,
            resume_pending: true,
            headless: false,
            chrome_executable: None,
            browser_debug_port: None,
            inter_record_delay_ms: 1000,
            short_wait_secs: 5,
            wait_secs: 15,
            redirect_wait_secs: 10,
            poll_interval_ms: 250,
            identifier_cell_index: None,
            nationality_filter: String::new(),
            assume_found_on_inspection_error: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// Load a TOML config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Defaults, then `SIGAE_CONFIG` file, then environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("SIGAE_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim())?,
            _ => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `KEY=value` overrides from any lookup (the process env in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SIGAE_URL") {
            self.portal_base_url = v;
        }
        if let Some(v) = lookup("SIGAE_PROGRAM") {
            self.program = v.parse()?;
        }
        if let Some(v) = lookup("INPUT_FILE") {
            self.input_file = v;
        }
        if let Some(v) = lookup("RECOVERY_FILE") {
            self.recovery_file = v;
        }
        if let Some(v) = lookup("NOTICE_TEMPLATE") {
            self.notice_template = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = lookup("RESUME_PENDING") {
            self.resume_pending = parse_var("RESUME_PENDING", &v, "bool")?;
        }
        if let Some(v) = lookup("HEADLESS") {
            self.headless = parse_var("HEADLESS", &v, "bool")?;
        }
        if let Some(v) = lookup("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = lookup("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = Some(parse_var("BROWSER_DEBUG_PORT", &v, "u16")?);
        }
        if let Some(v) = lookup("INTER_RECORD_DELAY_MS") {
            self.inter_record_delay_ms = parse_var("INTER_RECORD_DELAY_MS", &v, "u64")?;
        }
        if let Some(v) = lookup("NATIONALITY_FILTER") {
            self.nationality_filter = v.trim().to_string();
        }
        if let Some(v) = lookup("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        Ok(self)
    }

    /// Full listing URL for a program variant
    pub fn listing_url(&self, program: ProgramType) -> String {
        format!(
            "{}{}",
            self.portal_base_url.trim_end_matches('/'),
            self.listing_path.replace("{program}", program.slug())
        )
    }

    pub fn logout_url(&self) -> String {
        format!(
            "{}{}",
            self.portal_base_url.trim_end_matches('/'),
            self.logout_path
        )
    }

    pub fn waits(&self) -> WaitBounds {
        WaitBounds {
            short: Duration::from_secs(self.short_wait_secs),
            default: Duration::from_secs(self.wait_secs),
            redirect: Duration::from_secs(self.redirect_wait_secs),
            poll: Duration::from_millis(self.poll_interval_ms.max(10)),
        }
    }

    pub fn inter_record_delay(&self) -> Duration {
        Duration::from_millis(self.inter_record_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    var_name: &str,
    value: &str,
    expected_type: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}

/// Upper bounds for the driver's wait-for-condition loops
#[derive(Clone, Copy, Debug)]
pub struct WaitBounds {
    pub short: Duration,
    pub default: Duration,
    pub redirect: Duration,
    pub poll: Duration,
}

/// Portal login, supplied in plain text by the caller
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `SIGAE_USER` / `SIGAE_PASSWORD`
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("SIGAE_USER").ok()?;
        let password = std::env::var("SIGAE_PASSWORD").ok()?;
        Some(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
