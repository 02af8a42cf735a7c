use crate::config::AnalysisConfig;
use crate::criterion::Criteria;
use crate::error::{Error, Result};
use crate::model::LinearModel;
use crate::models;
use crate::payoff::{self, PAYOFF_FILE};
use crate::preference::UserPreferences;
use crate::solver::{MicrolpSolver, Solver};

use super::Analysis;

/// A builder for [`Analysis`] instances.
///
/// Created via [`Analysis::builder()`]. Collects the model, the solver and
/// the persistence switch before the analysis is checked and constructed.
///
/// # Defaults
///
/// - Model: `<ana_dir>/<model_id>.json`, else the built-in model of that id
/// - Solver: [`MicrolpSolver`]
/// - User preferences: read from `usrAR` when configured
/// - Persistence: off (no payoff file, no result artefacts)
///
/// # Examples
///
/// ```
/// use mcma::{Analysis, AnalysisConfig, MicrolpSolver};
/// use mcma::models;
///
/// let config = AnalysisConfig::new("tiny", models::tiny_criteria());
/// let analysis = Analysis::builder(config)
///     .model(models::tiny())
///     .solver(MicrolpSolver::new())
///     .build()
///     .unwrap();
/// assert_eq!(analysis.criteria().len(), 2);
/// ```
pub struct AnalysisBuilder {
    config: AnalysisConfig,
    model: Option<LinearModel>,
    solver: Option<Box<dyn Solver>>,
    user: Option<UserPreferences>,
    persist: bool,
}

impl AnalysisBuilder {
    pub(super) fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            model: None,
            solver: None,
            user: None,
            persist: false,
        }
    }

    /// Use `model` instead of resolving `model_id`.
    #[must_use]
    pub fn model(mut self, model: LinearModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the LP/MIP engine.
    #[must_use]
    pub fn solver(mut self, solver: impl Solver + 'static) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }

    /// Replay `prefs` after the corners instead of exploring with cuboids.
    #[must_use]
    pub fn user_preferences(mut self, prefs: UserPreferences) -> Self {
        self.user = Some(prefs);
        self
    }

    /// Read and write the payoff table in `ana_dir` and write the result
    /// artefacts to `resDir`.
    #[must_use]
    pub fn persist(mut self, on: bool) -> Self {
        self.persist = on;
        self
    }

    /// Validate the configuration and construct the analysis.
    ///
    /// With persistence on, `ana_dir` is created when missing and an
    /// existing payoff table is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options or report variables,
    /// [`Error::MissingModel`], [`Error::UnknownVariable`] for criteria not
    /// defined by the model, and payoff or preference file errors.
    pub fn build(self) -> Result<Analysis> {
        let config = self.config;
        config.validate()?;

        let model = match self.model {
            Some(m) => m,
            None => models::resolve(&config.ana_dir(), &config.model_id)?,
        };
        for def in &config.crit_def {
            if !model.has_var(&def.var_name) {
                return Err(Error::UnknownVariable {
                    criterion: def.name.clone(),
                    var_name: def.var_name.clone(),
                });
            }
        }
        let var_names: Vec<String> = if config.repVars.is_empty() {
            model.vars.iter().map(|v| v.name.clone()).collect()
        } else {
            if let Some(v) = config.repVars.iter().find(|v| !model.has_var(v)) {
                return Err(Error::Config(format!(
                    "repVars: model '{}' has no variable '{v}'",
                    model.name
                )));
            }
            config.repVars.clone()
        };

        let mut criteria = Criteria::new(&config.crit_def, config.minDiff)?;
        if self.persist {
            std::fs::create_dir_all(config.ana_dir())?;
            payoff::load(&config.ana_dir().join(PAYOFF_FILE), &mut criteria)?;
        }

        let user = match (self.user, config.usr_ar_path()) {
            (Some(u), _) => Some(u),
            (None, Some(path)) => Some(UserPreferences::load(&path)?),
            (None, None) => None,
        };

        Ok(Analysis {
            model,
            criteria,
            user,
            solver: self.solver.unwrap_or_else(|| Box::new(MicrolpSolver::new())),
            var_names,
            persist: self.persist,
            config,
        })
    }
}
