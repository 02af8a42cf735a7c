//! Persisting and reloading the payoff table.

use mcma::criterion::Criteria;
use mcma::payoff::{self, PAYOFF_FILE};
use mcma::{CritDef, Error, Sense};

fn temp_path() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut path = std::env::temp_dir();
    path.push(format!(
        "mcma_payoff_test_{}_{}_{PAYOFF_FILE}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

fn criteria() -> Criteria {
    let defs = vec![
        CritDef::new("cost", Sense::Minimize, "cost"),
        CritDef::new("profit", Sense::Maximize, "profit"),
        CritDef::new("risk", Sense::Minimize, "risk"),
    ];
    Criteria::new(&defs, 1e-4).unwrap()
}

#[test]
fn roundtrip_reproduces_reference_points() {
    let path = temp_path();
    let mut c = criteria();
    c[0].set_payoff(1.0 / 3.0, 1234.567_890_123).unwrap();
    c[1].set_payoff(9.876_543_21e7, -2.5e-3).unwrap();
    c[2].set_payoff(0.0, 0.1).unwrap();
    payoff::save(&path, &c).unwrap();

    let mut loaded = criteria();
    assert!(payoff::load(&path, &mut loaded).unwrap());
    assert!(loaded.payoff_complete());
    for (a, b) in c.iter().zip(&loaded) {
        assert_eq!(a.utopia(), b.utopia());
        assert_eq!(a.nadir(), b.nadir());
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn file_lines_follow_the_grammar() {
    let path = temp_path();
    let mut c = criteria();
    c[0].set_payoff(1.0, 10.0).unwrap();
    c[1].set_payoff(10.0, 1.0).unwrap();
    c[2].set_payoff(2.0, 4.0).unwrap();
    payoff::save(&path, &c).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    let fields: Vec<&str> = lines[1].split_whitespace().collect();
    assert_eq!(fields[0], "profit");
    assert_eq!(fields[1], "U");
    assert_eq!(fields[3], "N");
    assert_eq!(fields[2].parse::<f64>().unwrap(), 10.0);

    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_file_means_no_table() {
    let mut c = criteria();
    assert!(!payoff::load(&temp_path(), &mut c).unwrap());
    assert!(!c.payoff_complete());
}

#[test]
fn incomplete_table_is_discarded() {
    let path = temp_path();
    std::fs::write(&path, "cost U 1 N 10\nprofit U 10 N 1\nvolume U 3 N 4\n").unwrap();
    let mut c = criteria();
    assert!(!payoff::load(&path, &mut c).unwrap());
    assert!(c.iter().all(|cr| cr.utopia().is_none() && cr.nadir().is_none()));
    std::fs::remove_file(&path).ok();
}

#[test]
fn malformed_line_reports_its_number() {
    let path = temp_path();
    std::fs::write(&path, "cost U 1 N 10\n\nprofit U ten N 1\n").unwrap();
    let mut c = criteria();
    match payoff::load(&path, &mut c) {
        Err(Error::PayoffParse { line, .. }) => assert_eq!(line, 3),
        other => panic!("unexpected {other:?}"),
    }
    std::fs::remove_file(&path).ok();
}

#[test]
fn values_contradicting_the_sense_are_rejected() {
    let path = temp_path();
    // utopia of a minimized criterion above its nadir
    std::fs::write(&path, "cost U 10 N 1\nprofit U 10 N 1\nrisk U 1 N 2\n").unwrap();
    let mut c = criteria();
    assert!(payoff::load(&path, &mut c).is_err());
    std::fs::remove_file(&path).ok();
}
