//! Substantive models and the solver-neutral linear program they compile to.
//!
//! A [`LinearModel`] is an opaque block of named variables and linear
//! constraints. Every iteration compiles it (once) into a [`Program`] and
//! appends a [`ConstraintBlock`], typically the achievement scalarizing
//! block, which refers to model variables by name. The block is removed
//! again with [`Program::detach`] so nothing leaks into the next iteration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Domain of a model variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    /// Real-valued.
    #[default]
    Continuous,
    /// Integer-valued.
    Integer,
    /// 0/1.
    Binary,
}

/// Relation between the two sides of a linear row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

/// A named model variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    #[serde(default)]
    pub kind: VarKind,
    /// Lower bound; `None` means unbounded below.
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper bound; `None` means unbounded above.
    #[serde(default)]
    pub upper: Option<f64>,
}

/// A named linear constraint over model variables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDef {
    pub name: String,
    /// `(variable name, coefficient)` pairs.
    pub terms: Vec<(String, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// A linear or mixed-integer substantive model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub name: String,
    pub vars: Vec<VarDef>,
    pub constraints: Vec<ConstraintDef>,
}

impl LinearModel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a continuous variable with optional bounds.
    pub fn var(&mut self, name: impl Into<String>, lower: Option<f64>, upper: Option<f64>) {
        self.vars.push(VarDef {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        });
    }

    /// Add a variable of the given kind.
    pub fn var_of(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: Option<f64>,
        upper: Option<f64>,
    ) {
        self.vars.push(VarDef {
            name: name.into(),
            kind,
            lower,
            upper,
        });
    }

    /// Add a constraint `sum(coef * var) cmp rhs`.
    pub fn constraint(
        &mut self,
        name: impl Into<String>,
        terms: &[(&str, f64)],
        cmp: Cmp,
        rhs: f64,
    ) {
        self.constraints.push(ConstraintDef {
            name: name.into(),
            terms: terms.iter().map(|&(v, c)| (v.to_string(), c)).collect(),
            cmp,
            rhs,
        });
    }

    /// Define an outcome variable `name = sum(coef * var)`.
    pub fn outcome(&mut self, name: &str, terms: &[(&str, f64)]) {
        self.var(name, None, None);
        let mut row: Vec<(&str, f64)> = vec![(name, 1.0)];
        row.extend(terms.iter().map(|&(v, c)| (v, -c)));
        self.constraint(format!("def_{name}"), &row, Cmp::Eq, 0.0);
    }

    #[must_use]
    pub fn has_var(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    /// Compile the model into a [`Program`] with a zero objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is declared twice or a
    /// constraint refers to an undeclared variable.
    pub fn compile(&self) -> Result<Program> {
        let mut program = Program::default();
        for v in &self.vars {
            if program.index.contains_key(&v.name) {
                return Err(Error::Config(format!(
                    "model '{}' declares variable '{}' twice",
                    self.name, v.name
                )));
            }
            program.add_var(
                &v.name,
                v.kind,
                v.lower.unwrap_or(f64::NEG_INFINITY),
                v.upper.unwrap_or(f64::INFINITY),
            );
        }
        for c in &self.constraints {
            let mut terms = Vec::with_capacity(c.terms.len());
            for (name, coef) in &c.terms {
                let idx = program.var_index(name).ok_or_else(|| {
                    Error::Config(format!(
                        "constraint '{}' of model '{}' uses undeclared variable '{name}'",
                        c.name, self.name
                    ))
                })?;
                terms.push((idx, *coef));
            }
            program.add_row(terms, c.cmp, c.rhs);
        }
        Ok(program)
    }

    /// Load a model persisted as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingModel`] if the file does not exist and
    /// [`Error::Serialization`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingModel(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Persist the model as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// A column of a [`Program`].
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

/// A row of a [`Program`]: `sum(coef * x[col]) cmp rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub terms: Vec<(usize, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// Solver-neutral LP/MIP whose objective is always maximized.
#[derive(Clone, Debug, Default)]
pub struct Program {
    columns: Vec<Column>,
    rows: Vec<Row>,
    objective: Vec<f64>,
    index: HashMap<String, usize>,
}

/// Marks the state of a [`Program`] before a block was linked.
#[derive(Debug)]
#[must_use = "a linked block must be detached before the next iteration"]
pub struct BlockHandle {
    n_columns: usize,
    n_rows: usize,
    objective: Vec<f64>,
}

impl Program {
    /// Add a column and return its index.
    pub fn add_var(&mut self, name: &str, kind: VarKind, lower: f64, upper: f64) -> usize {
        let idx = self.columns.len();
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        self.columns.push(Column {
            name: name.to_string(),
            kind,
            lower,
            upper,
        });
        self.objective.push(0.0);
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Add a row. Repeated columns in `terms` are merged.
    pub fn add_row(&mut self, terms: Vec<(usize, f64)>, cmp: Cmp, rhs: f64) {
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(terms.len());
        for (col, coef) in terms {
            match merged.iter_mut().find(|(c, _)| *c == col) {
                Some(entry) => entry.1 += coef,
                None => merged.push((col, coef)),
            }
        }
        self.rows.push(Row {
            terms: merged,
            cmp,
            rhs,
        });
    }

    /// Set the objective coefficient of a column (maximized).
    pub fn set_objective(&mut self, col: usize, coef: f64) {
        self.objective[col] = coef;
    }

    #[must_use]
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// Remember the current size so a block can be removed later.
    pub fn mark(&self) -> BlockHandle {
        BlockHandle {
            n_columns: self.columns.len(),
            n_rows: self.rows.len(),
            objective: self.objective.clone(),
        }
    }

    /// Link a block: append its columns and rows.
    ///
    /// # Errors
    ///
    /// Propagates the block's error; the program is left unchanged then.
    pub fn link(&mut self, block: &dyn ConstraintBlock) -> Result<BlockHandle> {
        let handle = self.mark();
        if let Err(e) = block.append(self) {
            self.detach(BlockHandle {
                n_columns: handle.n_columns,
                n_rows: handle.n_rows,
                objective: handle.objective.clone(),
            });
            return Err(e);
        }
        Ok(handle)
    }

    /// Remove everything added after `handle` was taken and restore the objective.
    pub fn detach(&mut self, handle: BlockHandle) {
        for col in self.columns.drain(handle.n_columns..) {
            self.index.remove(&col.name);
        }
        self.rows.truncate(handle.n_rows);
        self.objective = handle.objective;
    }
}

/// A block of variables and constraints appended to a compiled model.
///
/// Implementations resolve model variables by name through
/// [`Program::var_index`] and must not modify existing rows.
pub trait ConstraintBlock {
    /// Append this block's columns, rows and objective to `program`.
    ///
    /// # Errors
    ///
    /// Returns an error when a referenced variable does not exist or the
    /// block cannot be formulated for the current state.
    fn append(&self, program: &mut Program) -> Result<()>;
}
