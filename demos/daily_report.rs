use anyhow::{Context, Result};
use chrono::NaiveDate;
use consumption_monitor::*;

/// Usage: daily_report <workbook.xlsx> [config.json] [YYYY-MM-DD]
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: daily_report <workbook.xlsx> [config.json] [YYYY-MM-DD]")?;

    let config = match args.next() {
        Some(config_path) if config_path != "-" => ReportConfig::from_json_file(&config_path)?,
        _ => ReportConfig::default(),
    };
    let as_of = match args.next() {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{}'", raw))?,
        None => chrono::Local::now().date_naive(),
    };

    println!("📊 Processing {} as of {}...\n", path, as_of);

    let bytes = FileSource::new(&path).fetch_workbook_bytes()?;
    let processor = ReportProcessor::new(config)?;
    let report = processor.process_bytes_as_of(&bytes, as_of)?;

    println!(
        "✅ {} clients across {} days ({} to {})\n",
        report.client_data_for_display.len(),
        report.combined_date_headers.len(),
        report.combined_date_headers.first().map(String::as_str).unwrap_or("-"),
        report.combined_date_headers.last().map(String::as_str).unwrap_or("-"),
    );

    println!(
        "{:<30} {:>10} {:>10} {:>10} {:>12}  {}",
        "Client", "Monthly", "Fortnight", "Weekly", "Yesterday", "Comments"
    );
    println!("{}", "-".repeat(100));
    for row in &report.client_data_for_display {
        println!(
            "{:<30} {:>10} {:>10} {:>10} {:>12}  {}",
            row.client,
            row.monthly_avg,
            row.fortnightly_avg,
            row.weekly_avg,
            row.yesterday_data.display_text(),
            row.comments
        );
    }

    let digest = AlertDigest::from_report(&report);
    if digest.is_empty() {
        println!("\n🟢 No alerts.");
    } else {
        println!("\n🔴 {} alerts:", digest.len());
        for alert in digest.alerts() {
            println!("  - {}", alert.line());
        }
    }

    if std::env::var("REPORT_JSON").is_ok() {
        println!("\n{}", report.to_json_pretty()?);
    }

    Ok(())
}
