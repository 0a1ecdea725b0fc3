//! Controller capability descriptor parsed from a version handshake reply
//!
//! A controller answers the version request with either a JSON object using
//! single-character keys or a legacy bare version string. Both forms are
//! normalized into [`ControllerInfo`]; anything that cannot be recovered is
//! reported as a non-fatal [`ParseDiagnostic`] and left at its default.

use crate::version::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Placeholder shown for an unknown board or family.
const UNKNOWN_NAME: &str = "????";

/// Hardware board a controller can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    Leonardo,
    Uno,
    Mega,
    Core,
    Photon,
    P1,
}

impl Board {
    /// Look up a board from its one-character wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(Self::Leonardo),
            "s" => Some(Self::Uno),
            "m" => Some(Self::Mega),
            "x" => Some(Self::Core),
            "y" => Some(Self::Photon),
            "p" => Some(Self::P1),
            _ => None,
        }
    }

    /// Microcontroller family this board belongs to.
    pub fn family(self) -> Family {
        match self {
            Self::Leonardo | Self::Uno | Self::Mega => Family::Arduino,
            Self::Core | Self::Photon | Self::P1 => Family::Particle,
        }
    }

    /// Human-readable board name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Leonardo => "Leonardo",
            Self::Uno => "Uno",
            Self::Mega => "Mega",
            Self::Core => "Core",
            Self::Photon => "Photon",
            Self::P1 => "p1",
        }
    }
}

/// Microcontroller platform family grouping the boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Arduino,
    Particle,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Self::Arduino => "Arduino",
            Self::Particle => "Particle",
        }
    }
}

/// Expansion shield attached to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shield {
    RevA,
    RevC,
    V1,
    V2,
    V3,
}

impl Shield {
    /// Look up a shield from its numeric wire code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::RevA),
            2 => Some(Self::RevC),
            3 => Some(Self::V1),
            4 => Some(Self::V2),
            5 => Some(Self::V3),
            _ => None,
        }
    }

    /// Human-readable shield name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RevA => "revA",
            Self::RevC => "revC",
            Self::V1 => "V1",
            Self::V2 => "V2",
            Self::V3 => "V3",
        }
    }
}

/// Wire encoding of a version reply, chosen by the leading character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    /// JSON object payload (`{"v":"0.2.4",...}`).
    Structured,
    /// Bare `major.minor.patch` text.
    Legacy,
}

impl ReplyFormat {
    /// Decide the encoding from the reply text.
    pub fn detect(s: &str) -> Self {
        if s.trim_start().starts_with('{') {
            Self::Structured
        } else {
            Self::Legacy
        }
    }
}

/// Non-fatal problem encountered while parsing a version reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDiagnostic {
    #[error("malformed version payload: {detail}")]
    MalformedPayload { detail: String },
    #[error("unrecognized board code {code:?}")]
    UnknownBoard { code: String },
    #[error("unrecognized shield code {code}")]
    UnknownShield { code: String },
    #[error("invalid version string {raw:?}")]
    InvalidVersion { raw: String },
}

/// Result of parsing a version reply: the descriptor plus any non-fatal
/// diagnostics collected along the way. Callers decide whether to log,
/// ignore or escalate the diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub info: ControllerInfo,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Capability descriptor reported by a controller during the version handshake.
///
/// Built once from the raw reply and never mutated afterwards. Missing or
/// unparseable fields stay at their defaults; an all-default descriptor carries
/// the sentinel version `0.0.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    /// Firmware version, `0.0.0` when unknown.
    #[serde(default)]
    pub version: Version,
    /// Firmware build number, 0 when unknown.
    #[serde(default)]
    pub build: u64,
    /// Short VCS commit id the firmware was built from.
    #[serde(default)]
    pub commit: Option<String>,
    /// Whether the firmware runs as a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Hardware board, if recognized.
    #[serde(default)]
    pub board: Option<Board>,
    /// Attached expansion shield, if recognized.
    #[serde(default)]
    pub shield: Option<Shield>,
    /// Log message format version.
    #[serde(default)]
    pub log_version: u64,
}

/// Single-character keys used by the structured reply form.
mod keys {
    pub const VERSION: &str = "v";
    pub const BUILD: &str = "n";
    pub const SIMULATOR: &str = "y";
    pub const BOARD: &str = "b";
    pub const SHIELD: &str = "s";
    pub const LOG: &str = "l";
    pub const COMMIT: &str = "c";
}

impl ControllerInfo {
    /// Parse a raw version reply.
    ///
    /// `None` or an empty string yields the sentinel descriptor with no
    /// diagnostics. Otherwise the trimmed reply is decoded per its
    /// [`ReplyFormat`]; nothing here ever fails hard.
    pub fn parse(raw: Option<&str>) -> ParseOutcome {
        let mut info = ControllerInfo::default();
        let mut diagnostics = Vec::new();

        if let Some(raw) = raw {
            let raw = raw.trim();
            if !raw.is_empty() {
                match ReplyFormat::detect(raw) {
                    ReplyFormat::Structured => {
                        parse_structured(raw, &mut info, &mut diagnostics)
                    }
                    ReplyFormat::Legacy => parse_legacy(raw, &mut info, &mut diagnostics),
                }
            }
        }

        ParseOutcome { info, diagnostics }
    }

    /// Version as text, `"0.0.0"` when unknown.
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// Whether the version is still the sentinel (no valid reply parsed yet).
    pub fn is_unknown(&self) -> bool {
        self.version.is_sentinel()
    }

    /// Family name, `"????"` when the board is unknown.
    pub fn family_name(&self) -> &'static str {
        self.board
            .map(|b| b.family().name())
            .unwrap_or(UNKNOWN_NAME)
    }

    /// Board name, `"????"` when the board is unknown.
    pub fn board_name(&self) -> &'static str {
        self.board.map(Board::name).unwrap_or(UNKNOWN_NAME)
    }

    /// `"<family> <board>"`, e.g. `"Arduino Mega"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.family_name(), self.board_name())
    }

    /// Full name with its indefinite article, e.g. `"an Arduino Mega"`.
    pub fn article_full_name(&self) -> String {
        format!("{} {}", article(self.family_name()), self.full_name())
    }

    /// Human-readable one-line summary of the controller.
    pub fn extended_description(&self) -> String {
        let mut out = format!("BrewPi v{}", self.version);
        if let Some(commit) = &self.commit {
            out.push_str(&format!(", running commit {commit}"));
        }
        if self.build != 0 {
            out.push_str(&format!(" build {}", self.build));
        }
        if self.board.is_some() {
            out.push_str(&format!(", running on {}", self.article_full_name()));
        }
        if let Some(shield) = self.shield {
            out.push_str(&format!(" with a {} shield", shield.name()));
        }
        if self.simulator {
            out.push_str(", running as simulator");
        }
        out
    }

    /// True when `candidate` names a newer firmware version than this one,
    /// i.e. a newer version is available. Unparsable candidates are never
    /// newer.
    pub fn is_newer(&self, candidate: &str) -> bool {
        Version::parse(candidate)
            .map(|candidate| self.version < candidate)
            .unwrap_or(false)
    }

    /// True when `candidate` names the same firmware version as this one.
    pub fn is_equal(&self, candidate: &str) -> bool {
        Version::parse(candidate)
            .map(|candidate| self.version == candidate)
            .unwrap_or(false)
    }
}

/// Indefinite article for a word, chosen by a case-insensitive check of its
/// first letter. Empty words get "a".
fn article(word: &str) -> &'static str {
    match word.chars().next() {
        Some(c) if "aeiou".contains(c.to_ascii_lowercase()) => "an",
        _ => "a",
    }
}

fn parse_structured(
    raw: &str,
    info: &mut ControllerInfo,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            debug!(payload = %raw, error = %err, "Version payload is not valid JSON");
            diagnostics.push(ParseDiagnostic::MalformedPayload {
                detail: err.to_string(),
            });
            return;
        }
    };
    let Some(map) = value.as_object() else {
        diagnostics.push(ParseDiagnostic::MalformedPayload {
            detail: "payload is not an object".to_string(),
        });
        return;
    };

    if let Some(value) = map.get(keys::VERSION) {
        match value.as_str() {
            Some(version) => parse_legacy(version, info, diagnostics),
            None => diagnostics.push(ParseDiagnostic::InvalidVersion {
                raw: value.to_string(),
            }),
        }
    }
    if let Some(value) = map.get(keys::SIMULATOR) {
        info.simulator = numeric_value(value) == Some(1);
    }
    if let Some(value) = map.get(keys::BOARD) {
        let code = value.as_str().unwrap_or_default().trim().to_string();
        match Board::from_code(&code) {
            Some(board) => info.board = Some(board),
            None => diagnostics.push(ParseDiagnostic::UnknownBoard { code }),
        }
    }
    if let Some(value) = map.get(keys::SHIELD) {
        match numeric_value(value).and_then(Shield::from_code) {
            Some(shield) => info.shield = Some(shield),
            None => diagnostics.push(ParseDiagnostic::UnknownShield {
                code: value.to_string(),
            }),
        }
    }
    if let Some(log_version) = map.get(keys::LOG).and_then(numeric_value) {
        info.log_version = log_version;
    }
    if let Some(build) = map.get(keys::BUILD).and_then(numeric_value) {
        info.build = build;
    }
    if let Some(commit) = map.get(keys::COMMIT).and_then(|v| v.as_str()) {
        info.commit = Some(commit.to_string());
    }
}

fn parse_legacy(raw: &str, info: &mut ControllerInfo, diagnostics: &mut Vec<ParseDiagnostic>) {
    match Version::parse(raw) {
        Some(version) => info.version = version,
        None => diagnostics.push(ParseDiagnostic::InvalidVersion {
            raw: raw.to_string(),
        }),
    }
}

/// Read a wire field as an integer. Controllers have emitted both JSON
/// numbers and numeric strings for the same keys over the years.
fn numeric_value(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_sentinel() {
        for raw in [None, Some(""), Some("   ")] {
            let outcome = ControllerInfo::parse(raw);
            assert_eq!(outcome.info, ControllerInfo::default());
            assert!(outcome.info.is_unknown());
            assert!(outcome.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ReplyFormat::detect("{\"v\":\"1.0.0\"}"), ReplyFormat::Structured);
        assert_eq!(ReplyFormat::detect("  {\"v\":\"1.0.0\"}"), ReplyFormat::Structured);
        assert_eq!(ReplyFormat::detect("0.2.4"), ReplyFormat::Legacy);
        assert_eq!(ReplyFormat::detect("garbage"), ReplyFormat::Legacy);
    }

    #[test]
    fn test_legacy_parse() {
        let outcome = ControllerInfo::parse(Some("0.2.4"));
        assert_eq!(outcome.info.version_string(), "0.2.4");
        assert!(outcome.diagnostics.is_empty());

        // Trailing content is carried as the version suffix
        let outcome = ControllerInfo::parse(Some("0.4.0rc1"));
        assert_eq!(outcome.info.version_string(), "0.4.0rc1");
    }

    #[test]
    fn test_legacy_parse_invalid_keeps_sentinel() {
        let outcome = ControllerInfo::parse(Some("not-a-version"));
        assert!(outcome.info.is_unknown());
        assert_eq!(
            outcome.diagnostics,
            vec![ParseDiagnostic::InvalidVersion {
                raw: "not-a-version".to_string()
            }]
        );
    }

    #[test]
    fn test_structured_parse_full() {
        let raw = r#"{"v":"1.5.0","y":1,"b":"m","s":2,"n":42,"c":"abc123"}"#;
        let outcome = ControllerInfo::parse(Some(raw));
        let info = &outcome.info;
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(info.version_string(), "1.5.0");
        assert!(info.simulator);
        assert_eq!(info.board, Some(Board::Mega));
        assert_eq!(info.board.unwrap().family(), Family::Arduino);
        assert_eq!(info.shield, Some(Shield::RevC));
        assert_eq!(info.build, 42);
        assert_eq!(info.commit.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extended_description_full() {
        let raw = r#"{"v":"1.5.0","y":1,"b":"m","s":2,"n":42,"c":"abc123"}"#;
        let outcome = ControllerInfo::parse(Some(raw));
        assert_eq!(
            outcome.info.extended_description(),
            "BrewPi v1.5.0, running commit abc123 build 42, \
             running on an Arduino Mega with a revC shield, running as simulator"
        );
    }

    #[test]
    fn test_extended_description_minimal() {
        let outcome = ControllerInfo::parse(Some("0.2.4"));
        assert_eq!(outcome.info.extended_description(), "BrewPi v0.2.4");
    }

    #[test]
    fn test_structured_numeric_strings() {
        let raw = r#"{"v":"0.4.0","y":"1","s":"3","n":"7","l":"2"}"#;
        let outcome = ControllerInfo::parse(Some(raw));
        assert!(outcome.info.simulator);
        assert_eq!(outcome.info.shield, Some(Shield::V1));
        assert_eq!(outcome.info.build, 7);
        assert_eq!(outcome.info.log_version, 2);
    }

    #[test]
    fn test_malformed_json_yields_sentinel_with_diagnostic() {
        let outcome = ControllerInfo::parse(Some(r#"{"v":"1.5.0","#));
        assert_eq!(outcome.info, ControllerInfo::default());
        assert!(matches!(
            outcome.diagnostics.as_slice(),
            [ParseDiagnostic::MalformedPayload { .. }]
        ));
    }

    #[test]
    fn test_non_object_payload() {
        let outcome = ControllerInfo::parse(Some("{}"));
        assert_eq!(outcome.info, ControllerInfo::default());
        assert!(outcome.diagnostics.is_empty());

        // An array is syntactically JSON but the wrong shape
        // (leading '[' selects the legacy form, which then fails to parse)
        let outcome = ControllerInfo::parse(Some("[1,2,3]"));
        assert!(outcome.info.is_unknown());
        assert!(!outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_board_code() {
        let raw = r#"{"v":"0.2.4","b":"z","n":3}"#;
        let outcome = ControllerInfo::parse(Some(raw));
        let info = &outcome.info;
        assert_eq!(info.board, None);
        assert_eq!(info.family_name(), "????");
        assert_eq!(info.board_name(), "????");
        // Other fields are unaffected
        assert_eq!(info.version_string(), "0.2.4");
        assert_eq!(info.build, 3);
        assert_eq!(
            outcome.diagnostics,
            vec![ParseDiagnostic::UnknownBoard {
                code: "z".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_shield_code() {
        let outcome = ControllerInfo::parse(Some(r#"{"v":"0.2.4","s":9}"#));
        assert_eq!(outcome.info.shield, None);
        assert!(matches!(
            outcome.diagnostics.as_slice(),
            [ParseDiagnostic::UnknownShield { .. }]
        ));
    }

    #[test]
    fn test_unrecognized_keys_ignored() {
        let outcome = ControllerInfo::parse(Some(r#"{"v":"0.2.4","q":"?","zz":9}"#));
        assert_eq!(outcome.info.version_string(), "0.2.4");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_simulator_flag_is_strict() {
        // Only the numeric value 1 means simulator
        for raw in [r#"{"y":0}"#, r#"{"y":2}"#, r#"{"y":"no"}"#] {
            assert!(!ControllerInfo::parse(Some(raw)).info.simulator);
        }
        assert!(ControllerInfo::parse(Some(r#"{"y":1}"#)).info.simulator);
    }

    #[test]
    fn test_board_lookup_tables() {
        let cases = [
            ("l", Board::Leonardo, Family::Arduino, "Leonardo"),
            ("s", Board::Uno, Family::Arduino, "Uno"),
            ("m", Board::Mega, Family::Arduino, "Mega"),
            ("x", Board::Core, Family::Particle, "Core"),
            ("y", Board::Photon, Family::Particle, "Photon"),
            ("p", Board::P1, Family::Particle, "p1"),
        ];
        for (code, board, family, name) in cases {
            assert_eq!(Board::from_code(code), Some(board));
            assert_eq!(board.family(), family);
            assert_eq!(board.name(), name);
        }
        assert_eq!(Board::from_code("q"), None);
    }

    #[test]
    fn test_shield_lookup_table() {
        let cases = [
            (1, Shield::RevA, "revA"),
            (2, Shield::RevC, "revC"),
            (3, Shield::V1, "V1"),
            (4, Shield::V2, "V2"),
            (5, Shield::V3, "V3"),
        ];
        for (code, shield, name) in cases {
            assert_eq!(Shield::from_code(code), Some(shield));
            assert_eq!(shield.name(), name);
        }
        assert_eq!(Shield::from_code(0), None);
        assert_eq!(Shield::from_code(6), None);
    }

    #[test]
    fn test_version_comparison() {
        let info = ControllerInfo::parse(Some("1.2.3")).info;
        assert!(info.is_equal("1.2.3"));
        assert!(info.is_newer("1.2.4"));
        assert!(!info.is_newer("1.2.3"));
        assert!(!info.is_newer("1.2.2"));
        assert!(!info.is_equal("1.2.4"));
        // Unparsable candidates are neither newer nor equal
        assert!(!info.is_newer("latest"));
        assert!(!info.is_equal("latest"));
    }

    #[test]
    fn test_article_choice() {
        assert_eq!(article("Arduino"), "an");
        assert_eq!(article("arduino"), "an");
        assert_eq!(article("Particle"), "a");
        assert_eq!(article(""), "a");
        assert_eq!(article("????"), "a");
    }

    #[test]
    fn test_full_names() {
        let info = ControllerInfo::parse(Some(r#"{"v":"0.2.4","b":"y"}"#)).info;
        assert_eq!(info.full_name(), "Particle Photon");
        assert_eq!(info.article_full_name(), "a Particle Photon");

        let info = ControllerInfo::parse(Some(r#"{"v":"0.2.4","b":"s"}"#)).info;
        assert_eq!(info.article_full_name(), "an Arduino Uno");
    }
}
