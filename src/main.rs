use color_eyre::{eyre::eyre, Result};
use dualshock::config::Config;
use dualshock::{hid, Event, EventData};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load().await?;
    info!("Using controller settings: {:?}", config.controller);

    // Erster gefundener Controller
    let controllers = hid::find(&config.device, &config.controller)?;
    let controller = controllers
        .into_iter()
        .next()
        .ok_or_else(|| eyre!("No connected DualShock 4 controllers found"))?;

    controller.connect().await?;
    info!(
        "Controller #1 | {:<10} | name: {}, connection: {}",
        "Connect",
        controller,
        controller.connection_type()
    );

    controller.on(Event::BatteryUpdate, |data| {
        if let EventData::Battery(battery) = data {
            info!(
                "Controller #1 | {:<10} | capacity: {}%, charging: {}, cable: {}",
                "Battery", battery.capacity, battery.is_charging, battery.is_cable_connected
            );
        }
        Ok(())
    });
    controller.on(Event::CrossPress, |_| {
        info!("Controller #1 | {:<10} | state: press", "Cross");
        Ok(())
    });
    controller.on(Event::CrossRelease, |_| {
        info!("Controller #1 | {:<10} | state: release", "Cross");
        Ok(())
    });
    controller.on(Event::RightStickMove, |data| {
        if let EventData::Stick(stick) = data {
            info!("Controller #1 | {:<10} | x: {}, y: {}", "RightStick", stick.x, stick.y);
        }
        Ok(())
    });

    controller.rumble(&config.demo.rumble()?)?;
    controller.led(&config.demo.led()?)?;

    // Disconnect on Ctrl-C; listen() returns once the loop has stopped
    let shutdown = controller.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for Ctrl-C: {}", e);
            return;
        }
        match shutdown.disconnect().await {
            Ok(()) => info!("Controller #1 | {:<10} | bye!", "Disconnect"),
            Err(e) => warn!("Disconnect failed: {}", e),
        }
    });

    controller.listen().await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
