//! Generator configuration, loaded from JSON. Every field has a default, so an empty
//! object (or no file at all) is a valid configuration.

use crate::codegen::GenEnv;
use crate::guest::Mnemonic;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("parsing configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown mnemonic {0:?} in hand_written")]
    UnknownMnemonic(String),
    #[error("parts must be at least 1")]
    NoParts,
}

/// Names of the three generated files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub header: String,
    pub table: String,
    pub routines: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            header: "comptbl.h".into(),
            table: "compstbl.cpp".into(),
            routines: "compemu.cpp".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Highest CPU level translated (0 = 68000 .. 4 = 68040).
    pub cpu_level: u8,
    /// Comment every emitted word with its disassembly.
    pub annotate: bool,
    /// Number of `PART_n` blocks the routine file is split into.
    pub parts: usize,
    /// Mnemonics implemented by hand elsewhere; the generator leaves them out.
    pub hand_written: Vec<String>,
    pub env: GenEnv,
    pub output: OutputNames,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            cpu_level: 4,
            annotate: false,
            parts: 8,
            hand_written: Vec::new(),
            env: GenEnv::default(),
            output: OutputNames::default(),
        }
    }
}

impl GenConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: GenConfig = serde_json::from_str(text)?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_json(&text)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.parts == 0 {
            return Err(ConfigError::NoParts);
        }
        self.hand_written_mnemonics().map(|_| ())
    }

    pub fn hand_written_mnemonics(&self) -> Result<Vec<Mnemonic>, ConfigError> {
        self.hand_written
            .iter()
            .map(|s| Mnemonic::from_name(s).ok_or_else(|| ConfigError::UnknownMnemonic(s.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HostFeatures;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_the_default() {
        assert_eq!(GenConfig::from_json("{}").unwrap(), GenConfig::default());
    }

    #[test]
    fn partial_overrides() {
        let cfg = GenConfig::from_json(
            r#"{ "cpu_level": 0, "hand_written": ["nop", "RTS"], "env": { "host": { "armv6": false } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.cpu_level, 0);
        assert_eq!(cfg.parts, 8);
        assert_eq!(cfg.env.host, HostFeatures::ARMV5);
        assert_eq!(cfg.hand_written_mnemonics().unwrap(), vec![Mnemonic::Nop, Mnemonic::Rts]);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            GenConfig::from_json(r#"{ "hand_written": ["FROB"] }"#),
            Err(ConfigError::UnknownMnemonic(_))
        ));
        assert!(matches!(GenConfig::from_json(r#"{ "parts": 0 }"#), Err(ConfigError::NoParts)));
        assert!(matches!(GenConfig::from_json("[1]"), Err(ConfigError::Parse(_))));
    }
}
