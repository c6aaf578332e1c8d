use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use csv::{Writer, WriterBuilder};
use scatterforge::{IterationReport, ReferenceSet, RunReport, SsResult};
use std::fmt::Display;
use std::fs::File;
use std::path::Path;

const STATS_HEADER: [&str; 10] = [
    "Iterations",
    "Accumulated_function_evaluations",
    "Min_cost_refset",
    "Average_cost_refset",
    "Var_cost_refset",
    "Replacement_in_reference_set",
    "Local_searches",
    "Flatzones",
    "Duplicates",
    "Candidate_set_size",
];

/// Tab-separated run statistics, one row per progress report, closed by an
/// `#eof` marker.
pub struct StatsLog {
    wtr: Writer<File>,
}

impl StatsLog {
    pub fn create<P: AsRef<Path>>(path: P) -> SsResult<Self> {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        wtr.write_record(STATS_HEADER)?;
        Ok(Self { wtr })
    }

    pub fn record(&mut self, r: &IterationReport) -> SsResult<()> {
        self.wtr.write_record([
            r.iteration.to_string(),
            r.evaluations.to_string(),
            r.best_cost.to_string(),
            r.mean_cost.to_string(),
            r.cost_variance.to_string(),
            r.replacements.to_string(),
            r.local_searches.to_string(),
            r.flatzones.to_string(),
            r.duplicates.to_string(),
            r.candidate_set_size.to_string(),
        ])?;
        self.wtr.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> SsResult<()> {
        self.wtr.write_record(["#eof"])?;
        self.wtr.flush()?;
        Ok(())
    }
}

fn numeric(value: impl Display) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

pub fn print_summary(name: &str, report: &RunReport) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new(name).add_attribute(Attribute::Bold),
        Cell::new("Value"),
    ]);

    let c = &report.counters;
    table.add_row(vec![
        Cell::new("Best cost").fg(Color::Green),
        numeric(format!("{:.6e}", report.best.cost)).fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("Stop reason"), numeric(format!("{:?}", report.stop_reason))]);
    table.add_row(vec![Cell::new("Iterations"), numeric(report.iterations)]);
    table.add_row(vec![Cell::new("Evaluations"), numeric(c.evaluations)]);
    table.add_row(vec![Cell::new("Replacements"), numeric(c.replacements)]);
    table.add_row(vec![
        Cell::new("Duplicates (replaced)"),
        numeric(format!("{} ({})", c.duplicates, c.duplicates_replaced)),
    ]);
    table.add_row(vec![Cell::new("Flatzones"), numeric(c.flatzones)]);
    table.add_row(vec![Cell::new("Local searches"), numeric(c.local_searches)]);
    table.add_row(vec![Cell::new("Regenerations"), numeric(c.regenerations)]);
    table.add_row(vec![Cell::new("Seed"), numeric(report.seed)]);
    table.add_row(vec![
        Cell::new("Elapsed"),
        numeric(format!("{:.2}s", report.elapsed.as_secs_f64())),
    ]);
    println!("\n{}", table);

    let mut params = Table::new();
    params.load_preset(ASCII_FULL);
    params.set_header(vec!["Dim", "Best parameter"]);
    for (i, x) in report.best.params.iter().enumerate() {
        params.add_row(vec![numeric(i), numeric(x)]);
    }
    println!("{}", params);
}

pub fn print_reference_set(ref_set: &ReferenceSet, limit: usize) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Cost").fg(Color::Cyan),
        Cell::new("Parameters"),
    ]);

    for (rank, m) in ref_set.members().iter().take(limit).enumerate() {
        let params: Vec<String> = m.params.iter().map(|x| format!("{:.5}", x)).collect();
        table.add_row(vec![
            numeric(rank),
            numeric(format!("{:.6e}", m.cost)).fg(Color::Cyan),
            Cell::new(params.join(", ")),
        ]);
    }
    if ref_set.len() > limit {
        table.add_row(vec![
            Cell::new("..."),
            Cell::new(format!("{} more", ref_set.len() - limit)),
            Cell::new(""),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_matrix<T: Display>(title: &str, rows: &[Vec<T>]) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut header = vec![Cell::new(title).add_attribute(Attribute::Bold)];
    header.extend((0..cols).map(|k| Cell::new(format!("R{}", k))));
    table.set_header(header);

    for (i, row) in rows.iter().enumerate() {
        let mut cells = vec![Cell::new(format!("x{}", i))];
        cells.extend(row.iter().map(|v| numeric(v)));
        table.add_row(cells);
    }
    println!("\n{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn stats_log_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = StatsLog::create(&path).unwrap();
        log.record(&IterationReport {
            iteration: 10,
            evaluations: 420,
            best_cost: 0.5,
            mean_cost: 1.5,
            cost_variance: 0.25,
            replacements: 7,
            local_searches: 0,
            flatzones: 1,
            duplicates: 3,
            candidate_set_size: 38,
            best_params: vec![0.0, 1.0],
            elapsed: Duration::from_millis(5),
        })
        .unwrap();
        log.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Iterations\tAccumulated_function_evaluations"));
        assert_eq!(lines[1], "10\t420\t0.5\t1.5\t0.25\t7\t0\t1\t3\t38");
        assert_eq!(lines[2], "#eof");
    }
}
