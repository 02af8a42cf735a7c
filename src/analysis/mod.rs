//! The iteration loop of an analysis.
//!
//! Every iteration runs the same fixed sequence: the workflow chooses
//! preferences, an [`AsfBlock`] is linked to the compiled model, the
//! solver is called, the criterion values are read back, the block is
//! detached and the workflow digests the solution. The loop ends when the
//! workflow has no preferences left or `maxIter` iterations were run.
//!
//! ```no_run
//! use mcma::Analysis;
//!
//! let mut analysis = Analysis::from_dir("ana/tiny").unwrap();
//! let report = analysis.run().unwrap();
//! println!("{} Pareto solutions", report.summary.n_unique);
//! ```

mod builder;
pub mod export;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

pub use self::builder::AnalysisBuilder;
use crate::asf::{AsfBlock, AsfParams, AsfValues};
use crate::cluster::{Clustering, KMeans, KMedoids};
use crate::config::AnalysisConfig;
use crate::criterion::{Criteria, Criterion};
use crate::error::{Error, Result};
use crate::model::{LinearModel, Program};
use crate::parrep::{ParRep, Progress};
use crate::pareto::achievement_hypervolume;
use crate::payoff::PAYOFF_FILE;
use crate::preference::{Preferences, UserPreferences};
use crate::solver::Solver;
use crate::types::{Sense, SolveStatus};
use crate::workflow::{Outcome, Stage, WorkFlow, WorkflowOptions};

/// Attributes of one criterion in one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct CritState {
    pub utopia: Option<f64>,
    pub asp: Option<f64>,
    pub val: Option<f64>,
    pub res: Option<f64>,
    pub nadir: Option<f64>,
    pub a_val: Option<f64>,
    pub active: bool,
}

/// Log entry of one iteration.
#[derive(Clone, Debug)]
pub struct IterRecord {
    pub itr: usize,
    pub stage: Stage,
    pub status: SolveStatus,
    pub outcome: Outcome,
    pub criteria: Vec<CritState>,
    /// Scalarizing values; `None` unless the solve was optimal.
    pub asf: Option<AsfValues>,
    /// Values of the reported model variables; empty unless optimal.
    pub vars: Vec<f64>,
}

/// Cluster representatives and assignment of the unique solutions.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterReport {
    /// k-means assignment over achievement vectors.
    pub kmeans: Clustering,
    /// Iteration of the k-medoids representative of each cluster.
    pub medoid_itrs: Vec<usize>,
}

/// Counters written to `summary.json`.
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub model_id: String,
    pub n_iterations: usize,
    pub iterations_by_stage: BTreeMap<String, usize>,
    pub n_failed: usize,
    pub n_rejected: usize,
    pub n_resets: usize,
    pub max_iter_reached: bool,
    pub final_stage: Stage,
    pub n_unique: usize,
    pub n_close: usize,
    pub n_dominated: usize,
    pub n_cubes: usize,
    pub n_cubes_left: usize,
    pub n_cubes_dropped: usize,
    pub n_cubes_pruned: usize,
    /// Hypervolume of the unique achievement vectors (reference at 0).
    pub hypervolume: f64,
    pub progress: Progress,
    pub clusters: Option<ClusterReport>,
}

/// Everything an analysis produced.
#[derive(Clone, Debug)]
pub struct Report {
    pub names: Vec<String>,
    pub senses: Vec<Sense>,
    /// Names of the model variables in [`IterRecord::vars`].
    pub var_names: Vec<String>,
    pub records: Vec<IterRecord>,
    pub rep: ParRep,
    pub summary: Summary,
}

impl Report {
    /// Cluster id of each unique solution, in [`ParRep::unique`] order.
    #[must_use]
    pub fn cluster_labels(&self) -> Option<&[usize]> {
        self.summary.clusters.as_ref().map(|c| c.kmeans.labels.as_slice())
    }
}

/// A configured analysis, ready to [`run`](Self::run).
pub struct Analysis {
    config: AnalysisConfig,
    model: LinearModel,
    criteria: Criteria,
    user: Option<UserPreferences>,
    solver: Box<dyn Solver>,
    var_names: Vec<String>,
    persist: bool,
}

impl core::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Analysis")
            .field("model_id", &self.config.model_id)
            .field("n_criteria", &self.criteria.len())
            .field("persist", &self.persist)
            .finish_non_exhaustive()
    }
}

impl Analysis {
    /// Start configuring an analysis.
    #[must_use]
    pub fn builder(config: AnalysisConfig) -> AnalysisBuilder {
        AnalysisBuilder::new(config)
    }

    /// Load `<dir>/cfg.toml` and set up an analysis persisting its payoff
    /// table and reports.
    ///
    /// # Errors
    ///
    /// Returns configuration, model and payoff-file errors.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let config = AnalysisConfig::load(dir.as_ref())?;
        AnalysisBuilder::new(config).persist(true).build()
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Criteria with their current reference points.
    #[must_use]
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Run the iteration loop, then cluster and, when persisting, write
    /// the result artefacts.
    ///
    /// # Errors
    ///
    /// Returns the fatal errors of the workflow (payoff failures, all
    /// corners failed, inconsistent user preferences), model errors while
    /// linking the scalarizing block, and I/O errors of the artefacts.
    pub fn run(&mut self) -> Result<Report> {
        let mut program = self.model.compile()?;
        crit_columns(&program, &self.criteria)?;
        let var_cols: Vec<usize> = self
            .var_names
            .iter()
            .filter_map(|v| program.var_index(v))
            .collect();

        let options = WorkflowOptions {
            par_rep: self.config.parRep && self.user.is_none(),
            neutral: self.config.neutral,
            payoff_path: self.persist.then(|| self.config.ana_dir().join(PAYOFF_FILE)),
            rep: self.config.rep_params(),
        };
        let mut wf = WorkFlow::new(&self.criteria, options, self.user.take());
        let asf_params = self.config.asf_params();
        let mut records = Vec::new();
        let mut max_iter_reached = false;

        loop {
            let itr = records.len() + 1;
            if itr > self.config.maxIter {
                trace_info!(max_iter = self.config.maxIter, "iteration limit reached");
                max_iter_reached = true;
                break;
            }
            let Some(prefs) = wf.itr_start(itr, &mut self.criteria)? else {
                break;
            };
            let stage = wf.stage();

            let step = solve_step(
                &mut program,
                self.solver.as_ref(),
                &mut self.criteria,
                &prefs,
                asf_params,
            )?;
            let status = step.status;
            let vars: Vec<f64> = if status.is_optimal() {
                var_cols.iter().map(|&col| step.values[col]).collect()
            } else {
                Vec::new()
            };
            let asf_vals = step.asf;

            let criteria = self.criteria.iter().map(crit_state).collect();
            let outcome = wf.itr_sol(itr, &mut self.criteria, status)?;
            trace_info!(itr, %stage, %status, ?outcome, "iteration done");
            records.push(IterRecord {
                itr,
                stage,
                status,
                outcome,
                criteria,
                asf: asf_vals,
                vars,
            });
        }

        let report = self.finish(&wf, records, max_iter_reached);
        if self.persist {
            export::write_reports(&report, &self.config)?;
        }
        Ok(report)
    }

    fn finish(&self, wf: &WorkFlow, records: Vec<IterRecord>, max_iter_reached: bool) -> Report {
        let rep = wf.rep().clone();
        let a_vals: Vec<Vec<f64>> = rep.unique().map(|s| s.a_vals.clone()).collect();

        let clusters = (self.config.nClust > 0 && !a_vals.is_empty()).then(|| {
            let kmeans = KMeans::new(self.config.nClust, self.config.seed).fit(&a_vals);
            let medoids = KMedoids::new(self.config.nClust, self.config.seed).fit(&a_vals);
            let itrs: Vec<usize> = rep.unique().map(|s| s.itr_id).collect();
            let medoid_itrs = medoids
                .centres
                .iter()
                .filter_map(|m| a_vals.iter().position(|a| a == m).map(|i| itrs[i]))
                .collect();
            ClusterReport { kmeans, medoid_itrs }
        });

        let mut iterations_by_stage = BTreeMap::new();
        for r in &records {
            *iterations_by_stage.entry(r.stage.to_string()).or_insert(0) += 1;
        }
        let summary = Summary {
            model_id: self.config.model_id.clone(),
            n_iterations: records.len(),
            iterations_by_stage,
            n_failed: records
                .iter()
                .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
                .count(),
            n_rejected: records
                .iter()
                .filter(|r| r.outcome == Outcome::Rejected)
                .count(),
            n_resets: wf.n_resets(),
            max_iter_reached,
            final_stage: wf.stage(),
            n_unique: rep.n_unique(),
            n_close: rep.n_close(),
            n_dominated: rep.n_dominated(),
            n_cubes: rep.cubes().len(),
            n_cubes_left: rep.n_candidates(),
            n_cubes_dropped: rep.n_dropped(),
            n_cubes_pruned: rep.n_pruned(),
            hypervolume: achievement_hypervolume(&a_vals),
            progress: rep.progress().clone(),
            clusters,
        };
        trace_info!(
            n_iterations = summary.n_iterations,
            n_unique = summary.n_unique,
            hypervolume = summary.hypervolume,
            "analysis finished"
        );

        Report {
            names: self.criteria.iter().map(|c| c.name.clone()).collect(),
            senses: self.criteria.iter().map(|c| c.sense).collect(),
            var_names: self.var_names.clone(),
            records,
            rep,
            summary,
        }
    }
}

/// Result of one scalarized solve.
#[derive(Clone, Debug)]
pub struct Step {
    pub status: SolveStatus,
    /// Scalarizing values; `None` unless optimal.
    pub asf: Option<AsfValues>,
    /// Values of the substantive model columns; empty unless optimal.
    pub values: Vec<f64>,
}

/// Solve one iteration: link an [`AsfBlock`] for `prefs` (already applied
/// to `criteria`), solve, read the criterion values back and detach.
///
/// Preferences whose A/R fall outside the current `[N, U]` of a criterion
/// are not solved; the step reports [`SolveStatus::Infeasible`] and leaves
/// the criterion values unset.
///
/// # Errors
///
/// Returns [`Error::UnknownVariable`] for criteria without a model column
/// and model errors while linking the block.
pub fn solve_step(
    program: &mut Program,
    solver: &dyn Solver,
    criteria: &mut Criteria,
    prefs: &Preferences,
    params: AsfParams,
) -> Result<Step> {
    let failed = |status| Step {
        status,
        asf: None,
        values: Vec::new(),
    };
    if let Err(e) = prefs.check(criteria) {
        trace_warn!(error = %e, "preferences outside the payoff range, not solved");
        return Ok(failed(SolveStatus::Infeasible));
    }
    let crit_cols = crit_columns(program, criteria)?;
    let n_model_cols = program.columns().len();

    let asf = AsfBlock::new(criteria, prefs.selfish, params);
    let handle = program.link(&asf)?;
    let mut sol = solver.solve(program);
    if sol.status.is_optimal() && sol.values.len() < program.columns().len() {
        sol.status = SolveStatus::Failed;
    }
    let step = if sol.status.is_optimal() {
        for (c, &col) in criteria.iter_mut().zip(&crit_cols) {
            c.set_val(sol.values[col]);
        }
        let vals = asf.read(program, &sol.values, sol.objective);
        sol.values.truncate(n_model_cols);
        Step {
            status: sol.status,
            asf: Some(vals),
            values: sol.values,
        }
    } else {
        failed(sol.status)
    };
    program.detach(handle);
    debug_assert_eq!(program.columns().len(), n_model_cols);
    Ok(step)
}

fn crit_columns(program: &Program, criteria: &Criteria) -> Result<Vec<usize>> {
    criteria
        .iter()
        .map(|c| {
            program.var_index(&c.var_name).ok_or_else(|| Error::UnknownVariable {
                criterion: c.name.clone(),
                var_name: c.var_name.clone(),
            })
        })
        .collect()
}

fn crit_state(c: &Criterion) -> CritState {
    CritState {
        utopia: c.utopia(),
        asp: c.asp(),
        val: c.val(),
        res: c.res(),
        nadir: c.nadir(),
        a_val: c.a_val(),
        active: c.is_active,
    }
}
