//! Line clustering and run merging.
//!
//! Text layers list glyph runs in paint order, which is rarely reading order
//! and often splits words at kerning adjustments. Runs are grouped by
//! baseline first, then neighbours with the same style are glued together.

use crate::types::{GlyphRun, StyledRun, TextLine};
use std::cmp::Ordering;

/// Baseline distance, as a fraction of the larger font size, within which
/// two runs belong to the same line.
const BASELINE_TOLERANCE_EM: f64 = 0.55;

/// Largest horizontal gap, as a fraction of the font size, that still joins
/// two runs.
const MERGE_GAP_EM: f64 = 0.8;

/// Gaps wider than this fraction of the font size get a separating space.
const SPACE_GAP_EM: f64 = 0.2;

/// Group runs into lines sharing an approximate baseline.
///
/// Lines come out top to bottom with their runs sorted left to right. A
/// line's baseline is the baseline of the run that opened it.
pub fn cluster_lines(mut runs: Vec<GlyphRun>) -> Vec<TextLine> {
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut running_max = 0.0_f64;

    for run in runs {
        let joins = lines.last().is_some_and(|line| {
            let tolerance = running_max.max(run.font_size) * BASELINE_TOLERANCE_EM;
            (run.y - line.baseline_y).abs() <= tolerance
        });

        match lines.last_mut() {
            Some(line) if joins => {
                running_max = running_max.max(run.font_size);
                line.runs.push(run);
            }
            _ => {
                running_max = run.font_size;
                lines.push(TextLine {
                    baseline_y: run.y,
                    runs: vec![run],
                });
            }
        }
    }

    for line in &mut lines {
        line.runs
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }

    lines
}

/// Collapse adjacent runs of one line that share a style and nearly touch.
///
/// Expects runs sorted left to right. Merging its own output changes nothing.
pub fn merge_runs(runs: Vec<GlyphRun>) -> Vec<StyledRun> {
    let mut merged: Vec<StyledRun> = Vec::with_capacity(runs.len());

    for run in runs {
        match merged.last_mut() {
            Some(prev) if can_merge(prev, &run) => {
                let gap = run.x - prev.right();
                if gap > prev.font_size * SPACE_GAP_EM {
                    prev.text.push(' ');
                }
                prev.text.push_str(&run.text);
                prev.width = run.right() - prev.x;
            }
            _ => merged.push(run),
        }
    }

    merged
}

fn can_merge(prev: &GlyphRun, next: &GlyphRun) -> bool {
    prev.same_style(next) && next.x - prev.right() < prev.font_size * MERGE_GAP_EM
}

/// Cluster runs into lines and merge each line's runs.
pub fn build_text_lines(runs: Vec<GlyphRun>) -> Vec<TextLine> {
    cluster_lines(runs)
        .into_iter()
        .map(|line| TextLine {
            baseline_y: line.baseline_y,
            runs: merge_runs(line.runs),
        })
        .filter(|line| !line.runs.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RgbColor;

    fn run(text: &str, x: f64, y: f64, size: f64, width: f64) -> GlyphRun {
        GlyphRun {
            text: text.to_string(),
            font_size: size,
            bold: false,
            italic: false,
            font_face: "Arial".to_string(),
            color: RgbColor::BLACK,
            x,
            y,
            width,
        }
    }

    #[test]
    fn test_close_baselines_share_a_line() {
        let lines = cluster_lines(vec![
            run("a", 10.0, 700.0, 24.0, 10.0),
            run("b", 30.0, 704.0, 24.0, 10.0),
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].baseline_y, 704.0);
        let texts: Vec<&str> = lines[0].runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_distant_baselines_split() {
        let lines = cluster_lines(vec![
            run("lower", 10.0, 700.0, 10.0, 10.0),
            run("upper", 10.0, 730.0, 10.0, 10.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].runs[0].text, "upper");
        assert_eq!(lines[1].runs[0].text, "lower");
    }

    #[test]
    fn test_running_max_widens_tolerance() {
        // A 30pt run then a 10pt run 12pt lower: 30 * 0.55 = 16.5 keeps it.
        let lines = cluster_lines(vec![
            run("Big", 10.0, 500.0, 30.0, 40.0),
            run("sub", 60.0, 488.0, 10.0, 15.0),
        ]);
        assert_eq!(lines.len(), 1);

        // The max resets on a new line.
        let lines = cluster_lines(vec![
            run("Big", 10.0, 500.0, 30.0, 40.0),
            run("a", 10.0, 400.0, 10.0, 5.0),
            run("b", 10.0, 388.0, 10.0, 5.0),
        ]);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_merge_inserts_space_for_word_gap() {
        let merged = merge_runs(vec![
            run("Hello", 10.0, 700.0, 12.0, 50.0),
            run("World", 65.0, 700.0, 12.0, 55.0),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello World");
        assert_eq!(merged[0].x, 10.0);
        assert!((merged[0].right() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_without_space_for_kerning_gap() {
        let merged = merge_runs(vec![
            run("Hel", 10.0, 700.0, 12.0, 18.0),
            run("lo", 29.0, 700.0, 12.0, 12.0),
        ]);
        assert_eq!(merged[0].text, "Hello");
    }

    #[test]
    fn test_style_change_or_wide_gap_keeps_runs_apart() {
        let mut bold = run("bold", 45.0, 700.0, 12.0, 20.0);
        bold.bold = true;
        let merged = merge_runs(vec![
            run("plain", 10.0, 700.0, 12.0, 30.0),
            bold,
            run("far", 200.0, 700.0, 12.0, 20.0),
        ]);
        assert_eq!(merged.len(), 3);

        let mut red = run("red", 41.0, 700.0, 12.0, 20.0);
        red.color = RgbColor::new(255, 0, 0);
        assert_eq!(merge_runs(vec![run("x", 10.0, 700.0, 12.0, 30.0), red]).len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let runs = vec![
            run("The", 10.0, 700.0, 12.0, 20.0),
            run("quick", 33.0, 700.0, 12.0, 30.0),
            run("brown", 66.0, 700.0, 12.0, 30.0),
            run("fox", 300.0, 700.0, 12.0, 20.0),
        ];
        let once = merge_runs(runs);
        let twice = merge_runs(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_single_run_round_trip() {
        let mut hello = run("Hello", 10.0, 700.0, 12.0, 30.0);
        hello.color = RgbColor::new(255, 0, 0);
        let lines = build_text_lines(vec![hello]);

        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.runs.len(), 1);
        assert_eq!(line.runs[0].text, "Hello");
        assert_eq!(line.runs[0].color, RgbColor::new(255, 0, 0));
        assert!((line.top(792.0) - 89.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_text_lines(Vec::new()).is_empty());
    }
}
