//! Which car parameters go along with fewer sales?
//!
//! This example shows how to:
//! - Load a CSV file and declare the column taxonomy
//! - Bin numeric columns and inspect the chosen breaks
//! - Encode, add partial combinations and score every segment
//! - Project what-if substitutions between sibling segments
//!
//! The data is synthetic and does not necessarily reflect real world
//! dependence.
//!
//! Run with:
//! ```bash
//! cargo run --example cars_dependence
//! ```

use fast_insights::binning::get_breaks;
use fast_insights::formatters::{FormatterConfig, MarkdownFormatter};
use fast_insights::logging::setup::{init_logging, LoggingConfig};
use fast_insights::prelude::*;
use fast_insights::sources::read_csv;

const CARS: &str = "\
color,age,max_speed,num_of_sales,year_of_sale
green,10,100,45,2000
red,20,60,50,2000
red,30,80,50,2000
red,2,110,101,2000
green,5,,99,2000
red,15,80,65,2000
";

fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging(LoggingConfig::development())?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cars.csv");
    std::fs::write(&path, CARS)?;

    // year_of_sale is constant and gets pruned with a warning
    let mut model = ModelData::builder(read_csv(&path)?, "num_of_sales")
        .categorical(["color"])
        .numeric(["age", "max_speed", "year_of_sale"])
        .config(ModelConfig::default().with_target(TargetSpec::quantile(0.5)))
        .build()?;
    println!("y threshold: {:?}\n", model.target().pivot());

    let bins = model.make_bins(&QuantileBinner::new(3), None)?;
    for (column, breaks) in get_breaks(&bins) {
        println!("{column} {breaks:?}");
    }

    model.convert_to_binary(Some(bins))?;
    model.construct_partial_combs("color", true)?;

    let report = calculate_dependence(&model)?;
    let human = HumanFormatter::with_config(FormatterConfig::default().with_max_rows(Some(10)));
    println!("\n{}", human.format_report(&report)?);

    let comparisons = compare_intervals(&model, "color_green")?;
    println!("{}", human.format_comparisons(&comparisons)?);

    let slow = model
        .segments()?
        .with_base("max_speed")
        .next()
        .map(|s| s.name().to_string());
    if let Some(slow) = slow {
        let comparisons = compare_intervals(&model, &slow)?;
        println!("{}", MarkdownFormatter::new().format_comparisons(&comparisons)?);
    }

    Ok(())
}
