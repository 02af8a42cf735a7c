//! Analysis configuration, read from `<ana_dir>/cfg.toml`.
//!
//! ```toml
//! model_id = "tiny"
//! crit_def = [["inc", "max", "inc"], ["emi", "min", "emi"]]
//! maxIter = 100
//! neutral = true
//! nClust = 3
//! ```

#![allow(non_snake_case)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asf::AsfParams;
use crate::error::{Error, Result};
use crate::parrep::ParRepParams;
use crate::types::Sense;

/// Name of the configuration file inside an analysis directory.
pub const CONFIG_FILE: &str = "cfg.toml";

/// Declaration of one criterion: `[name, sense, var_name]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(String, String, String)", into = "(String, String, String)")]
pub struct CritDef {
    pub name: String,
    pub sense: Sense,
    pub var_name: String,
}

impl CritDef {
    #[must_use]
    pub fn new(name: impl Into<String>, sense: Sense, var_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sense,
            var_name: var_name.into(),
        }
    }
}

impl TryFrom<(String, String, String)> for CritDef {
    type Error = Error;

    fn try_from((name, sense, var_name): (String, String, String)) -> Result<Self> {
        Ok(Self {
            name,
            sense: Sense::parse(&sense)?,
            var_name,
        })
    }
}

impl From<CritDef> for (String, String, String) {
    fn from(def: CritDef) -> Self {
        (def.name, def.sense.as_str().to_string(), def.var_name)
    }
}

fn default_max_iter() -> usize {
    1000
}
fn default_true() -> bool {
    true
}
fn default_verb() -> u8 {
    2
}
fn default_res_dir() -> String {
    "Results".to_string()
}
fn default_fn_out() -> String {
    "parFront.csv".to_string()
}
fn default_min_diff() -> f64 {
    1e-4
}
fn default_sol_eps() -> f64 {
    0.01
}
fn default_min_cube_size() -> f64 {
    5.0
}
fn default_min_edge() -> f64 {
    0.5
}
fn default_slope_r() -> f64 {
    10.0
}
fn default_asf_eps() -> f64 {
    1e-6
}
fn default_seed() -> u64 {
    42
}

/// Options of one analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Working directory; defaults to the directory holding `cfg.toml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ana_dir: Option<PathBuf>,
    /// Substantive model: `<ana_dir>/<model_id>.json` or a built-in model.
    pub model_id: String,
    pub crit_def: Vec<CritDef>,
    #[serde(default = "default_max_iter")]
    pub maxIter: usize,
    #[serde(default = "default_true")]
    pub parRep: bool,
    #[serde(default)]
    pub neutral: bool,
    /// User preference file; disables the cuboid exploration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usrAR: Option<String>,
    #[serde(default)]
    pub nClust: usize,
    #[serde(default = "default_verb")]
    pub verb: u8,
    #[serde(default = "default_res_dir")]
    pub resDir: String,
    /// File name of the Pareto-front table.
    #[serde(default = "default_fn_out")]
    pub fn_out: String,
    /// Write the 2D/3D scatter plots.
    #[serde(default)]
    pub showPlot: bool,
    /// Write the parallel-coordinates plot.
    #[serde(default)]
    pub hiPlot: bool,
    #[serde(default = "default_min_diff")]
    pub minDiff: f64,
    #[serde(default = "default_sol_eps")]
    pub solEps: f64,
    #[serde(default = "default_min_cube_size")]
    pub minCubeSize: f64,
    #[serde(default = "default_min_edge")]
    pub minEdge: f64,
    #[serde(default = "default_slope_r")]
    pub slopeR: f64,
    #[serde(default = "default_asf_eps")]
    pub asfEps: f64,
    #[serde(default)]
    pub degenExpand: bool,
    /// Model variables reported in `modelVars.csv`; empty reports all.
    #[serde(default)]
    pub repVars: Vec<String>,
    /// Seed of the clustering RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl AnalysisConfig {
    /// A configuration with default options.
    #[must_use]
    pub fn new(model_id: impl Into<String>, crit_def: Vec<CritDef>) -> Self {
        Self {
            ana_dir: None,
            model_id: model_id.into(),
            crit_def,
            maxIter: default_max_iter(),
            parRep: true,
            neutral: false,
            usrAR: None,
            nClust: 0,
            verb: default_verb(),
            resDir: default_res_dir(),
            fn_out: default_fn_out(),
            showPlot: false,
            hiPlot: false,
            minDiff: default_min_diff(),
            solEps: default_sol_eps(),
            minCubeSize: default_min_cube_size(),
            minEdge: default_min_edge(),
            slopeR: default_slope_r(),
            asfEps: default_asf_eps(),
            degenExpand: false,
            repVars: Vec::new(),
            seed: default_seed(),
        }
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `<ana_dir>/cfg.toml`; `ana_dir` defaults to `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file is missing or malformed.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut cfg = Self::from_toml(&text)?;
        if cfg.ana_dir.is_none() {
            cfg.ana_dir = Some(dir.to_path_buf());
        }
        Ok(cfg)
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on failure.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::DuplicateCriterion`].
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(Error::Config("model_id must not be empty".into()));
        }
        if self.crit_def.len() < 2 {
            return Err(Error::Config(format!(
                "crit_def must declare at least 2 criteria, found {}",
                self.crit_def.len()
            )));
        }
        for (i, def) in self.crit_def.iter().enumerate() {
            if def.name.is_empty() || def.var_name.is_empty() {
                return Err(Error::Config(format!("crit_def entry {i} has an empty name")));
            }
            if self.crit_def[..i].iter().any(|d| d.name == def.name) {
                return Err(Error::DuplicateCriterion(def.name.clone()));
            }
        }
        if self.maxIter == 0 {
            return Err(Error::Config("maxIter must be positive".into()));
        }
        if self.verb > 4 {
            return Err(Error::Config("verb must be in [0, 4]".into()));
        }
        for (key, v) in [
            ("minDiff", self.minDiff),
            ("solEps", self.solEps),
            ("minCubeSize", self.minCubeSize),
            ("minEdge", self.minEdge),
            ("slopeR", self.slopeR),
            ("asfEps", self.asfEps),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::Config(format!("{key} must be positive, got {v}")));
            }
        }
        if self.slopeR < 1.0 {
            return Err(Error::Config("slopeR must be at least 1".into()));
        }
        Ok(())
    }

    /// The analysis directory.
    #[must_use]
    pub fn ana_dir(&self) -> PathBuf {
        self.ana_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, p: &str) -> PathBuf {
        let p = Path::new(p);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.ana_dir().join(p)
        }
    }

    /// Directory receiving the result artefacts.
    #[must_use]
    pub fn res_dir(&self) -> PathBuf {
        self.resolve(&self.resDir)
    }

    /// Path of the user preference file, if any.
    #[must_use]
    pub fn usr_ar_path(&self) -> Option<PathBuf> {
        self.usrAR.as_deref().map(|p| self.resolve(p))
    }

    /// Path of the persisted substantive model.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.ana_dir().join(format!("{}.json", self.model_id))
    }

    #[must_use]
    pub fn asf_params(&self) -> AsfParams {
        AsfParams {
            slope_r: self.slopeR,
            eps: self.asfEps,
            min_diff: self.minDiff,
        }
    }

    #[must_use]
    pub fn rep_params(&self) -> ParRepParams {
        ParRepParams {
            sol_eps: self.solEps,
            min_cube_size: self.minCubeSize,
            min_edge: self.minEdge,
            degen_expand: self.degenExpand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: &str = r#"
model_id = "tiny"
crit_def = [["inc", "max", "inc"], ["emi", "min", "emi"]]
maxIter = 50
neutral = true
usrAR = "prefs.txt"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let cfg = AnalysisConfig::from_toml(CFG).unwrap();
        assert_eq!(cfg.crit_def[1], CritDef::new("emi", Sense::Minimize, "emi"));
        assert_eq!(cfg.maxIter, 50);
        assert!(cfg.parRep && cfg.neutral);
        assert_eq!(cfg.resDir, "Results");
        assert!((cfg.minDiff - 1e-4).abs() < 1e-15);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_bad_sense_is_rejected() {
        let text = CFG.replace("\"min\"", "\"minimize\"");
        let err = AnalysisConfig::from_toml(&text).unwrap_err();
        assert!(err.to_string().contains("minimize"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let text = format!("{CFG}\nmaxIters = 3\n");
        assert!(matches!(
            AnalysisConfig::from_toml(&text),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let base = AnalysisConfig::from_toml(CFG).unwrap();
        let mut cfg = base.clone();
        cfg.crit_def.truncate(1);
        assert!(cfg.validate().is_err());
        let mut cfg = base.clone();
        cfg.crit_def[1].name = "inc".into();
        assert!(matches!(cfg.validate(), Err(Error::DuplicateCriterion(_))));
        let mut cfg = base.clone();
        cfg.maxIter = 0;
        assert!(cfg.validate().is_err());
        let mut cfg = base.clone();
        cfg.verb = 5;
        assert!(cfg.validate().is_err());
        let mut cfg = base;
        cfg.solEps = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_paths_resolve_against_ana_dir() {
        let mut cfg = AnalysisConfig::from_toml(CFG).unwrap();
        cfg.ana_dir = Some(PathBuf::from("/tmp/ana"));
        assert_eq!(cfg.res_dir(), PathBuf::from("/tmp/ana/Results"));
        assert_eq!(cfg.usr_ar_path(), Some(PathBuf::from("/tmp/ana/prefs.txt")));
        assert_eq!(cfg.model_path(), PathBuf::from("/tmp/ana/tiny.json"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let cfg = AnalysisConfig::from_toml(CFG).unwrap();
        let back = AnalysisConfig::from_toml(&cfg.to_toml().unwrap()).unwrap();
        assert_eq!(cfg, back);
    }
}
