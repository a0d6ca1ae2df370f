//! Runs a single sync pass, from the WebUntis timetable configured in the environment to the CalDAV calendar

use untis_caldav_sync::client::Client;
use untis_caldav_sync::error::EXIT_CONFIG;
use untis_caldav_sync::traits::CalendarStore;
use untis_caldav_sync::{Config, Reconciler, Result, SyncWindow, UntisClient};


#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(EXIT_CONFIG);
        },
    };
    log::debug!("Using {:?}", config);

    if let Err(err) = run(&config).await {
        eprintln!("error: {}", err);
        std::process::exit(err.exit_code());
    }
}

async fn run(config: &Config) -> Result<()> {
    let mut client = Client::new(
        config.caldav.url.clone(),
        &config.caldav.username,
        &config.caldav.password,
        config.http_timeout,
    )?;
    let calendar = client.find_or_create_calendar(&config.caldav.calendar_name).await?;
    log::info!("Syncing into {} ({})", calendar.name(), calendar.url());
    let untis = UntisClient::new(&config.untis, config.http_timeout)?;

    let today = SyncWindow::today(config.timezone);
    let window = SyncWindow::around(today, config.days_past, config.days_ahead, config.timezone);

    let mut reconciler = Reconciler::new(untis, calendar, config.event_builder(), config.sync_settings());
    let result = reconciler.sync(&window).await;

    if let Err(err) = reconciler.source_mut().logout().await {
        log::warn!("Unable to log out from the timetable server: {}", err);
    }

    let report = result?;
    println!("{} (calendar: {})", report, reconciler.store().name());
    report.check_failure_ratio(config.max_failure_ratio)
}
