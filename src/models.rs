//! Built-in substantive models.
//!
//! | Id | Criteria | Description |
//! |---|---|---|
//! | `tiny` | `inc` (max), `emi` (min) | three activities sharing a capacity |
//! | `simplex4` | `f0`..`f3` (max) | the unit simplex in four dimensions |

use std::path::Path;

use crate::config::CritDef;
use crate::error::{Error, Result};
use crate::model::{Cmp, LinearModel};
use crate::types::Sense;

/// Ids of the built-in models.
pub const BUILTIN: [&str; 2] = ["tiny", "simplex4"];

/// Income/emission trade-off.
///
/// `x, y >= 0`, `z in [0, 100]`, `10 <= x + y + z <= 100`,
/// `inc = 10x + 0.5y + 100z`, `emi = 20x + 0.5y + 100z`.
#[must_use]
pub fn tiny() -> LinearModel {
    let mut m = LinearModel::new("tiny");
    m.var("x", Some(0.0), None);
    m.var("y", Some(0.0), None);
    m.var("z", Some(0.0), Some(100.0));
    m.constraint("cap_lo", &[("x", 1.0), ("y", 1.0), ("z", 1.0)], Cmp::Ge, 10.0);
    m.constraint("cap_hi", &[("x", 1.0), ("y", 1.0), ("z", 1.0)], Cmp::Le, 100.0);
    m.outcome("inc", &[("x", 10.0), ("y", 0.5), ("z", 100.0)]);
    m.outcome("emi", &[("x", 20.0), ("y", 0.5), ("z", 100.0)]);
    m
}

/// Criteria of [`tiny`].
#[must_use]
pub fn tiny_criteria() -> Vec<CritDef> {
    vec![
        CritDef::new("inc", Sense::Maximize, "inc"),
        CritDef::new("emi", Sense::Minimize, "emi"),
    ]
}

/// `x_k >= 0`, `sum x_k = 1`, `f_k = x_k` for `k = 0..4`.
#[must_use]
pub fn simplex4() -> LinearModel {
    let mut m = LinearModel::new("simplex4");
    let names: Vec<String> = (0..4).map(|k| format!("x{k}")).collect();
    for n in &names {
        m.var(n.as_str(), Some(0.0), None);
    }
    let terms: Vec<(&str, f64)> = names.iter().map(|n| (n.as_str(), 1.0)).collect();
    m.constraint("simplex", &terms, Cmp::Eq, 1.0);
    for (k, n) in names.iter().enumerate() {
        m.outcome(&format!("f{k}"), &[(n.as_str(), 1.0)]);
    }
    m
}

/// Criteria of [`simplex4`].
#[must_use]
pub fn simplex4_criteria() -> Vec<CritDef> {
    (0..4)
        .map(|k| CritDef::new(format!("f{k}"), Sense::Maximize, format!("f{k}")))
        .collect()
}

/// A built-in model by id.
#[must_use]
pub fn builtin(id: &str) -> Option<LinearModel> {
    match id {
        "tiny" => Some(tiny()),
        "simplex4" => Some(simplex4()),
        _ => None,
    }
}

/// Load `<ana_dir>/<model_id>.json`, falling back to a built-in model.
///
/// # Errors
///
/// Returns [`Error::MissingModel`] when neither exists and
/// [`Error::Serialization`] when the file cannot be parsed.
pub fn resolve(ana_dir: &Path, model_id: &str) -> Result<LinearModel> {
    let path = ana_dir.join(format!("{model_id}.json"));
    if path.exists() {
        trace_info!(path = %path.display(), "loading model");
        return LinearModel::load(&path);
    }
    builtin(model_id).ok_or(Error::MissingModel(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_compile() {
        for id in BUILTIN {
            let m = builtin(id).unwrap();
            assert!(m.compile().is_ok(), "{id}");
        }
        assert!(builtin("energy").is_none());
    }

    #[test]
    fn test_criteria_refer_to_model_variables() {
        let m = tiny();
        assert!(tiny_criteria().iter().all(|d| m.has_var(&d.var_name)));
        let m = simplex4();
        assert!(simplex4_criteria().iter().all(|d| m.has_var(&d.var_name)));
    }

    #[test]
    fn test_resolve_missing_model() {
        let dir = std::env::temp_dir();
        assert!(matches!(
            resolve(&dir, "no_such_model_anywhere"),
            Err(Error::MissingModel(_))
        ));
    }
}
