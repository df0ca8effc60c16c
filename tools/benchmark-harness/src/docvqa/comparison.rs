//! Side-by-side comparison of parser summaries

use super::evaluation::EvaluationResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One parser's headline numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub parser: String,
    pub evaluated_questions: usize,
    pub exact_match_rate: f64,
    pub normalized_match_rate: f64,
    pub average_similarity: f64,
    pub high_similarity_rate: f64,
    pub medium_similarity_rate: f64,
    pub low_similarity_rate: f64,
    pub no_match_rate: f64,
    pub mean_anls: f64,
    pub mean_average_precision: Option<f64>,
    pub average_processing_time: f64,
}

impl From<&EvaluationResult> for ComparisonRow {
    fn from(result: &EvaluationResult) -> Self {
        Self {
            parser: result.parser.clone(),
            evaluated_questions: result.evaluated_questions,
            exact_match_rate: result.exact_match_rate,
            normalized_match_rate: result.normalized_match_rate,
            average_similarity: result.average_similarity,
            high_similarity_rate: result.high_similarity_rate,
            medium_similarity_rate: result.medium_similarity_rate,
            low_similarity_rate: result.low_similarity_rate,
            no_match_rate: result.no_match_rate,
            mean_anls: result.mean_anls,
            mean_average_precision: result.mean_average_precision,
            average_processing_time: result.average_processing_time,
        }
    }
}

/// The winning parser for one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub parser: String,
    pub value: f64,
}

/// Rankings plus the flat table they were drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    pub fastest: Option<Ranking>,
    pub most_accurate_exact: Option<Ranking>,
    pub most_accurate_similarity: Option<Ranking>,
    pub best_anls: Option<Ranking>,
    pub best_map: Option<Ranking>,
}

/// Pick the row whose metric is strictly better than every earlier one
fn pick(rows: &[ComparisonRow], metric: impl Fn(&ComparisonRow) -> Option<f64>, lower_is_better: bool) -> Option<Ranking> {
    let mut best: Option<Ranking> = None;
    for row in rows {
        let Some(value) = metric(row) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some(current) if lower_is_better => value < current.value,
            Some(current) => value > current.value,
        };
        if better {
            best = Some(Ranking {
                parser: row.parser.clone(),
                value,
            });
        }
    }
    best
}

/// Rank parsers; the earliest parser wins ties
pub fn compare(results: &[EvaluationResult]) -> Comparison {
    let rows: Vec<ComparisonRow> = results.iter().map(ComparisonRow::from).collect();
    let evaluated = |f: fn(&ComparisonRow) -> f64| move |row: &ComparisonRow| (row.evaluated_questions > 0).then(|| f(row));

    Comparison {
        fastest: pick(&rows, evaluated(|r| r.average_processing_time), true),
        most_accurate_exact: pick(&rows, evaluated(|r| r.exact_match_rate), false),
        most_accurate_similarity: pick(&rows, evaluated(|r| r.average_similarity), false),
        best_anls: pick(&rows, evaluated(|r| r.mean_anls), false),
        best_map: pick(&rows, |r| r.mean_average_precision, false),
        rows,
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Fixed-width text table, one line per parser
pub fn render_table(comparison: &Comparison) -> String {
    let width = comparison
        .rows
        .iter()
        .map(|row| row.parser.len())
        .max()
        .unwrap_or(0)
        .max("Parser".len());

    let mut table = String::new();
    let _ = writeln!(
        table,
        "{:<width$}  {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6} {:>6} {:>8}",
        "Parser", "Exact", "Norm", "AvgSim", "High", "Med", "Low", "NoMatch", "ANLS", "MAP", "Time"
    );
    let _ = writeln!(table, "{}", "-".repeat(width + 2 + 8 * 7 + 7 * 2 + 9));

    for row in &comparison.rows {
        let map = row
            .mean_average_precision
            .map_or_else(|| "-".to_string(), |m| format!("{:.3}", m));
        let _ = writeln!(
            table,
            "{:<width$}  {:>7} {:>7} {:>7.3} {:>7} {:>7} {:>7} {:>7} {:>6.3} {:>6} {:>7.2}s",
            row.parser,
            percent(row.exact_match_rate),
            percent(row.normalized_match_rate),
            row.average_similarity,
            percent(row.high_similarity_rate),
            percent(row.medium_similarity_rate),
            percent(row.low_similarity_rate),
            percent(row.no_match_rate),
            row.mean_anls,
            map,
            row.average_processing_time,
        );
    }

    let mut winners = Vec::new();
    let labels = [
        ("Fastest", &comparison.fastest),
        ("Best exact match", &comparison.most_accurate_exact),
        ("Best similarity", &comparison.most_accurate_similarity),
        ("Best ANLS", &comparison.best_anls),
        ("Best MAP", &comparison.best_map),
    ];
    for (label, ranking) in labels {
        if let Some(ranking) = ranking {
            winners.push(format!("{}: {} ({:.3})", label, ranking.parser, ranking.value));
        }
    }
    if !winners.is_empty() {
        table.push('\n');
        table.push_str(&winners.join("\n"));
        table.push('\n');
    }

    table
}
