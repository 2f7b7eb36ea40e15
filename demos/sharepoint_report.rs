use consumption_monitor::sharepoint::GraphDriveSource;
use consumption_monitor::{
    dispatch_alerts, AlertOptions, ReportConfig, ReportProcessor, SmtpNotifier, SmtpSettings,
};
use dotenv::dotenv;
use std::error::Error;

/// Pulls the workbook from SharePoint, builds today's report and emails the
/// alert digest. Reads its settings from the environment (or a `.env` file).
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    println!("☁️  Fetching workbook from SharePoint...");
    let source = GraphDriveSource::from_env()?;
    let bytes = source.fetch_workbook_bytes().await?;
    println!("✅ Downloaded {} bytes.\n", bytes.len());

    let config = match std::env::var("REPORT_CONFIG") {
        Ok(path) => ReportConfig::from_json_file(path)?,
        Err(_) => ReportConfig::default(),
    };
    let today = chrono::Local::now().date_naive();
    let report = ReportProcessor::new(config)?.process_bytes_as_of(&bytes, today)?;
    println!(
        "📊 {} clients, {} days in window.",
        report.client_data_for_display.len(),
        report.combined_date_headers.len()
    );

    let notifier = SmtpNotifier::new(SmtpSettings::from_env()?);
    let options = AlertOptions::from_env();
    let sent = dispatch_alerts(&report, &notifier, &options, today)?;

    if sent {
        println!("📧 Alert email sent to {}.", options.recipients.join(", "));
    } else {
        println!("🟢 Nothing to send.");
    }

    Ok(())
}
