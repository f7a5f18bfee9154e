//! Human-readable output: per-stage tables, the summary slowdown matrix,
//! and the `Tee` writer that duplicates everything to a timestamped log.

use crate::stats::StageStats;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writer that duplicates every byte to stdout and to a flat log file
/// named by the UTC start time (`<results>/%Y%m%d%H%M%S.log`).
///
/// On an aborted run, everything written so far is already on disk: the
/// file is opened at construction and flushed with stdout.
pub struct Tee {
    stdout: io::Stdout,
    file: File,
    path: PathBuf,
}

impl Tee {
    pub fn create(results_dir: impl AsRef<Path>) -> Result<Self> {
        let results_dir = results_dir.as_ref();
        fs::create_dir_all(results_dir)
            .with_context(|| format!("Failed to create results dir {}", results_dir.display()))?;

        let path = results_dir.join(format!("{}.log", Utc::now().format("%Y%m%d%H%M%S")));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;

        Ok(Self {
            stdout: io::stdout(),
            file,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        self.file.flush()
    }
}

/// Task banner: the label framed by `#` rules.
pub fn render_banner(label: &str) -> String {
    let rule = "#".repeat(60);
    format!("{}\n{}\n{}\n", rule, label, rule)
}

/// Per-stage median table for one configuration, values in whole
/// microseconds, with a separated `Total` row.
pub fn render_stage_table(stats: &[StageStats], total_median_us: f64) -> String {
    let rule = format!("{}  {}", "-".repeat(28), "-".repeat(10));
    let mut out = String::new();

    out.push_str(&format!("{:<28}  {:>10}\n", "transform", "median"));
    out.push_str(&rule);
    out.push('\n');
    for stage in stats {
        out.push_str(&format!("{:<28}  {:>10.0}\n", stage.name, stage.median_us));
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("{:<28}  {:>10.0}\n", "Total", total_median_us));
    out
}

/// Short `[a]`, `[b]`, ... identifier for the i-th recorded configuration.
pub fn config_id(index: usize) -> String {
    let id = (b'a' + (index % 26) as u8) as char;
    format!("[{}]", id)
}

/// Pairwise slowdown matrix, rows and columns in recording order. Row
/// labels carry the configuration description plus its short identifier;
/// slowdown is computed as row total / column total.
pub fn render_summary_table(labels: &[String], matrix: &[Vec<f64>]) -> String {
    let label_width = labels
        .iter()
        .enumerate()
        .map(|(i, l)| l.len() + config_id(i).len() + 2)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("{:>label_width$}", ""));
    for i in 0..labels.len() {
        out.push_str(&format!("  {:>6}", config_id(i)));
    }
    out.push('\n');

    for (i, (label, row)) in labels.iter().zip(matrix).enumerate() {
        let tagged = format!("{}  {}", label, config_id(i));
        out.push_str(&format!("{:>label_width$}", tagged));
        for value in row {
            out.push_str(&format!("  {:>6.2}", value));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::slowdown_matrix;

    #[test]
    fn test_stage_table_layout() {
        let stats = vec![
            StageStats {
                name: "to_image_tensor".to_string(),
                median_us: 120.4,
                count: 5,
            },
            StageStats {
                name: "normalize".to_string(),
                median_us: 80.6,
                count: 5,
            },
        ];
        let table = render_stage_table(&stats, 201.0);

        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("transform"));
        assert!(lines[2].starts_with("to_image_tensor"));
        assert!(lines[2].trim_end().ends_with("120"));
        assert!(lines[3].trim_end().ends_with("81"));
        assert!(lines.last().unwrap().starts_with("Total"));
        assert!(lines.last().unwrap().trim_end().ends_with("201"));
    }

    #[test]
    fn test_summary_table_ids_and_ratios() {
        let labels = vec!["tensor, current".to_string(), "tensor, legacy".to_string()];
        let table = render_summary_table(&labels, &slowdown_matrix(&[100.0, 50.0]));

        assert!(table.contains("[a]"));
        assert!(table.contains("[b]"));
        assert!(table.contains("2.00"));
        assert!(table.contains("0.50"));
        assert!(table.contains("1.00"));
    }

    #[test]
    fn test_tee_duplicates_to_timestamped_log() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut tee = Tee::create(dir.path())?;

        write!(tee, "hello benchmark")?;
        tee.flush()?;

        let name = tee
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap()
            .to_string();
        assert_eq!(name.len(), 14, "UTC timestamp to the second: {}", name);
        assert!(name.chars().all(|c| c.is_ascii_digit()));

        let logged = std::fs::read_to_string(tee.path())?;
        assert_eq!(logged, "hello benchmark");
        Ok(())
    }
}
