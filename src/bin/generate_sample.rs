use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use waste_insight::config::PipelineConfig;
use waste_insight::data::{render_template, CellValue, Field, RecordSet, WasteRecord};
use waste_insight::output::write_grid;

/// Write a synthetic waste log in the raw spreadsheet template layout.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output CSV path
    #[arg(long, default_value = "sample_waste_log.csv")]
    out: PathBuf,

    /// Number of data rows
    #[arg(long, default_value_t = 400)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const LINES: [(&str, &str, f64); 6] = [
    ("سليتر1", "سليتر 1", 18.0),
    ("سليتر2", "سليتر 2", 22.0),
    ("تناية1", "تناية 1", 30.0),
    ("تناية2", "تناية 2", 26.0),
    ("تناية3", "تناية 3", 34.0),
    ("تناية4", "تناية 4", 24.0),
];
const OPERATORS: [(&str, f64); 6] = [
    ("أحمد", -2.0),
    ("محمد", 0.0),
    ("سعيد", 3.0),
    ("خالد", 1.0),
    ("ياسر", -1.0),
    ("مصطفى", 5.0),
];
const SHIFTS: [&str; 3] = ["صباحي", "مسائي", "ليلي"];
const QUALITIES: [&str; 2] = ["A", "B"];
const THICKNESSES: [f64; 4] = [0.2, 0.25, 0.3, 0.4];
const SIZES: [f64; 3] = [1000.0, 1200.0, 1250.0];

/// Box-Muller transform for a normal draw.
fn gauss(rng: &mut ChaCha8Rng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `None` only if one of the value tables is empty.
fn sample_record(rng: &mut ChaCha8Rng, index: usize) -> Option<WasteRecord> {
    let &(line, variant, line_base) = LINES.choose(rng)?;
    let &(operator, operator_effect) = OPERATORS.choose(rng)?;
    let thickness = *THICKNESSES.choose(rng)?;
    let weight = rng.gen_range(500.0..3000.0_f64).round();
    let second_grade = (weight * rng.gen_range(0.0..0.05)).round();
    let export = (weight * rng.gen_range(0.2..0.6)).round();
    let local = weight - export - second_grade;

    let mut waste = line_base + operator_effect + weight * 0.01 + gauss(rng, 0.0, 4.0)
        - thickness * 10.0;
    // A few heavy events that the per-line fence should catch.
    if rng.gen_bool(0.02) {
        waste *= 8.0;
    }
    let waste = (waste.max(0.5) * 10.0).round() / 10.0;

    let line_label = match rng.gen_range(0..10) {
        0 => format!("{variant} "),
        1 => variant.to_string(),
        _ => line.to_string(),
    };

    let mut record = WasteRecord::new()
        .with(Field::WasteKg, waste)
        .with(Field::Weight, weight)
        .with(Field::SecondGrade, second_grade)
        .with(Field::Local, local)
        .with(Field::Export, export)
        .with(Field::Thickness, thickness)
        .with(Field::Size, *SIZES.choose(rng)?)
        .with(Field::Order, format!("{}", 24000 + index))
        .with(Field::Operator, operator)
        .with(Field::Quality, *QUALITIES.choose(rng)?)
        .with(Field::Line, line_label)
        .with(Field::Shift, *SHIFTS.choose(rng)?);

    // Typical spreadsheet noise.
    match rng.gen_range(0..40) {
        0 => record.set(Field::WasteKg, CellValue::Text("n/a".into())),
        1 => record.set(Field::Operator, CellValue::Text("   ".into())),
        2 => record.set(Field::WasteKg, CellValue::Number(-5.0)),
        3 => record.set(Field::WasteKg, CellValue::Number(950.0)),
        4 => record.set(Field::Weight, CellValue::Text("؟".into())),
        5 => record.set(Field::Quality, CellValue::Missing),
        _ => {}
    }
    Some(record)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = PipelineConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut records: Vec<WasteRecord> = (0..args.rows)
        .map(|i| sample_record(&mut rng, i))
        .collect::<Option<_>>()
        .context("sample value tables are empty")?;
    records.shuffle(&mut rng);
    let columns = config.schema.fields.iter().map(|s| s.field).collect();
    let set = RecordSet::new(columns, records);

    let mut grid = render_template(&set, &config);
    // Report title and row serials in metadata columns the cleaner ignores.
    if let Some(first) = grid.rows.first_mut().and_then(|row| row.first_mut()) {
        *first = CellValue::Text("تقرير الهالك اليومي".into());
    }
    let data_start = config.layout.data_start_row;
    for (serial, row) in grid.rows.iter_mut().skip(data_start).enumerate() {
        if let Some(cell) = row.get_mut(0) {
            *cell = CellValue::Number((serial + 1) as f64);
        }
    }

    write_grid(&grid, &args.out)
        .with_context(|| format!("writing sample to {}", args.out.display()))?;
    println!(
        "Wrote {} raw rows ({} header/metadata rows) to {}",
        args.rows,
        data_start,
        args.out.display()
    );
    Ok(())
}
