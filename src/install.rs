//! Template analysis directory.

use std::path::{Path, PathBuf};

use crate::config::{AnalysisConfig, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::models;

/// Preference file written next to the configuration; not referenced by it.
pub const USER_PREFS_TEMPLATE: &str = "usrPrefs.txt";

const USER_PREFS: &str = "\
* Preference sets for the tiny model. Set usrAR = \"usrPrefs.txt\" in cfg.toml
* to replay them after the corners instead of exploring the Pareto front.
* <criterion> <aspiration> <reservation> [n]
inc 8000 2000
emi 2000 8000
#
inc 5000 1000
emi 1000 6000 n
";

/// Materialize a runnable analysis of the built-in `tiny` model in `dir`.
///
/// Writes `cfg.toml`, the model as `tiny.json` and an example preference
/// file. Returns the configuration path.
///
/// # Errors
///
/// Returns [`Error::Config`] when `dir` already holds a `cfg.toml`, and
/// I/O or serialization errors.
pub fn install(dir: &Path) -> Result<PathBuf> {
    let cfg_path = dir.join(CONFIG_FILE);
    if cfg_path.exists() {
        return Err(Error::Config(format!(
            "{} already exists; refusing to overwrite",
            cfg_path.display()
        )));
    }
    std::fs::create_dir_all(dir)?;

    let mut config = AnalysisConfig::new("tiny", models::tiny_criteria());
    config.maxIter = 100;
    config.neutral = true;
    config.nClust = 3;
    config.showPlot = true;
    config.hiPlot = true;
    config.validate()?;

    models::tiny().save(&dir.join("tiny.json"))?;
    std::fs::write(dir.join(USER_PREFS_TEMPLATE), USER_PREFS)?;
    std::fs::write(&cfg_path, config.to_toml()?)?;
    trace_info!(dir = %dir.display(), "analysis template installed");
    Ok(cfg_path)
}
