use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use scatterforge::benchmarks::Benchmark;
use strum::IntoEnumIterator;

pub fn run() {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Function").add_attribute(Attribute::Bold),
        Cell::new("Default bounds"),
        Cell::new("Optimum (2-D)").fg(Color::Cyan),
    ]);

    for bench in Benchmark::iter() {
        let (lo, hi) = bench.default_bounds();
        let optimum: Vec<String> = bench.optimum(2).iter().map(|x| format!("{}", x)).collect();
        table.add_row(vec![
            Cell::new(bench.to_string()),
            Cell::new(format!("[{}, {}]", lo, hi)),
            Cell::new(format!("({})", optimum.join(", "))).fg(Color::Cyan),
        ]);
    }
    println!("{}", table);
}
