//! Result artefacts written to `resDir`.
//!
//! | File | Content |
//! |---|---|
//! | `iters.csv` | one row per iteration: criterion attributes and ASF values |
//! | `modelVars.csv` | reported model variables per iteration |
//! | `<fn_out>` (`parFront.csv`) | unique Pareto solutions with parents, dominance status and cluster ids |
//! | `summary.json` | counters, progress, hypervolume, clusters |
//! | `parFront.html` | Plotly charts, with `showPlot` or `hiPlot` |

use std::io::Write;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::parrep::Admission;
use crate::visualization::{FrontData, write_html_report};
use crate::workflow::Outcome;

use super::Report;

pub const ITERS_FILE: &str = "iters.csv";
pub const MODEL_VARS_FILE: &str = "modelVars.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const HTML_FILE: &str = "parFront.html";

/// Write every artefact of `report` into the configured result directory.
///
/// # Errors
///
/// Returns an I/O error if the directory or a file cannot be written.
pub fn write_reports(report: &Report, config: &AnalysisConfig) -> Result<()> {
    let dir = config.res_dir();
    std::fs::create_dir_all(&dir)?;

    write_csv(&dir.join(ITERS_FILE), |w| iters_csv(report, w))?;
    write_csv(&dir.join(MODEL_VARS_FILE), |w| model_vars_csv(report, w))?;
    write_csv(&dir.join(&config.fn_out), |w| front_csv(report, w))?;
    std::fs::write(
        dir.join(SUMMARY_FILE),
        serde_json::to_string_pretty(&report.summary)?,
    )?;
    if config.showPlot || config.hiPlot {
        write_html_report(&front_data(report), dir.join(HTML_FILE), config.showPlot, config.hiPlot)?;
    }
    trace_info!(dir = %dir.display(), "reports written");
    Ok(())
}

fn write_csv(
    path: &Path,
    f: impl FnOnce(&mut std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut w = std::io::BufWriter::new(std::fs::File::create(path)?);
    f(&mut w)?;
    w.flush()
}

/// Iteration log.
///
/// Columns: `itr,stage,status,outcome`, then per criterion `<c>_U`,
/// `<c>_A`, `<c>_val`, `<c>_R`, `<c>_N`, `<c>_sense`, `<c>_active`,
/// `<c>_ach`, then `af,cafMin,cafReg`. Unset attributes are empty cells.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn iters_csv(report: &Report, mut w: impl Write) -> std::io::Result<()> {
    write!(w, "itr,stage,status,outcome")?;
    for name in &report.names {
        for attr in ["U", "A", "val", "R", "N", "sense", "active", "ach"] {
            write!(w, ",{}", csv_escape(&format!("{name}_{attr}")))?;
        }
    }
    writeln!(w, ",af,cafMin,cafReg")?;

    for r in &report.records {
        write!(w, "{},{},{},{}", r.itr, r.stage, r.status, outcome_label(r.outcome))?;
        for (c, sense) in r.criteria.iter().zip(&report.senses) {
            write!(
                w,
                ",{},{},{},{},{},{sense},{},{}",
                cell(c.utopia),
                cell(c.asp),
                cell(c.val),
                cell(c.res),
                cell(c.nadir),
                u8::from(c.active),
                cell(c.a_val),
            )?;
        }
        match &r.asf {
            Some(a) => writeln!(
                w,
                ",{},{},{}",
                a.af,
                cell(Some(a.caf_min)),
                cell(Some(a.caf_reg))
            )?,
            None => writeln!(w, ",,,")?,
        }
    }
    Ok(())
}

/// Reported model variables, one row per iteration; failed iterations
/// have empty cells.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn model_vars_csv(report: &Report, mut w: impl Write) -> std::io::Result<()> {
    write!(w, "itr")?;
    for v in &report.var_names {
        write!(w, ",{}", csv_escape(v))?;
    }
    writeln!(w)?;
    for r in &report.records {
        write!(w, "{}", r.itr)?;
        if r.vars.is_empty() {
            for _ in &report.var_names {
                write!(w, ",")?;
            }
        } else {
            for v in &r.vars {
                write!(w, ",{v}")?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Unique Pareto solutions.
///
/// Columns: `itr_id,cube_id,parent1,parent2,dominated_by,cluster`, one
/// value column per criterion, then one `<c>_ach` column per criterion.
/// Solutions not produced from a cuboid have empty parent cells;
/// `dominated_by` holds the dominating iteration, 0 for every row here.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn front_csv(report: &Report, mut w: impl Write) -> std::io::Result<()> {
    write!(w, "itr_id,cube_id,parent1,parent2,dominated_by,cluster")?;
    for name in &report.names {
        write!(w, ",{}", csv_escape(name))?;
    }
    for name in &report.names {
        write!(w, ",{}", csv_escape(&format!("{name}_ach")))?;
    }
    writeln!(w)?;

    let labels = report.cluster_labels();
    for (k, s) in report.rep.unique().enumerate() {
        let (p1, p2) = report
            .rep
            .parents(s)
            .map_or((String::new(), String::new()), |(a, b)| (a.to_string(), b.to_string()));
        let cube = s.cube_id.map(|c| c.to_string()).unwrap_or_default();
        let cluster = labels.map(|l| l[k].to_string()).unwrap_or_default();
        let dominated_by = s.dominated_by.unwrap_or(0);
        write!(w, "{},{cube},{p1},{p2},{dominated_by},{cluster}", s.itr_id)?;
        for v in &s.vals {
            write!(w, ",{v}")?;
        }
        for a in &s.a_vals {
            write!(w, ",{a}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Collect the unique solutions for the HTML charts.
#[must_use]
pub fn front_data(report: &Report) -> FrontData {
    let unique: Vec<_> = report.rep.unique().collect();
    FrontData {
        names: report.names.clone(),
        senses: report.senses.clone(),
        itr_ids: unique.iter().map(|s| s.itr_id).collect(),
        vals: unique.iter().map(|s| s.vals.clone()).collect(),
        a_vals: unique.iter().map(|s| s.a_vals.clone()).collect(),
        clusters: report.cluster_labels().map(<[usize]>::to_vec),
    }
}

fn outcome_label(o: Outcome) -> String {
    match o {
        Outcome::Payoff => "payoff".to_string(),
        Outcome::Failed(status) => format!("failed:{status}"),
        Outcome::Rejected => "rejected".to_string(),
        Outcome::Reset => "reset".to_string(),
        Outcome::Admitted(Admission::Unique) => "unique".to_string(),
        Outcome::Admitted(Admission::Close(itr)) => format!("close:{itr}"),
        Outcome::Admitted(Admission::Dominated(itr)) => format!("dominated:{itr}"),
    }
}

fn cell(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => x.to_string(),
        _ => String::new(),
    }
}

/// Escape a value for CSV output. Wraps in quotes if it contains commas,
/// quotes, or newlines.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("inc"), "inc");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_cells_and_labels() {
        assert_eq!(cell(None), "");
        assert_eq!(cell(Some(f64::NAN)), "");
        assert_eq!(cell(Some(2.5)), "2.5");
        assert_eq!(
            outcome_label(Outcome::Failed(crate::types::SolveStatus::Infeasible)),
            "failed:infeasible"
        );
        assert_eq!(outcome_label(Outcome::Admitted(Admission::Close(4))), "close:4");
    }
}
