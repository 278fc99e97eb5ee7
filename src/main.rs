mod cache;
mod config;
mod controller;
mod departures;
mod display;
mod error;
mod logging;
mod schedule;
mod transit;
mod weather;

use std::future::{pending, Future};
use tracing::{error, info};

use config::Config;
use controller::Controller;
use transit::HafasClient;
use weather::OpenMeteoClient;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create/get config.
    let path = Config::path()?;
    let (config, created) = Config::load(&path).await?;

    let _log_guard = logging::init(&config.log)?;
    if created {
        info!(path = %path.display(), "wrote default config");
    }
    config.log_summary();

    let tz = config.tz()?;
    let transit = HafasClient::new(&config.transit_api_url, tz)?;
    let weather = OpenMeteoClient::new(&config.weather_api_url)?;
    let panel = display::open(&config.display)?;

    let controller = Controller::new(config, transit, weather, panel)?;

    if let Err(e) = controller.run(shutdown_signal()).await {
        error!("refresh loop failed, shutting down: {}", e);
        return Err(e.into());
    }

    info!("bye");
    Ok(())
}

/// Resolves on ctrl-c or, on unix, SIGTERM (systemd, `kill`). The handlers are
/// installed right away so a signal arriving before the first poll counts.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let terminate = {
        use tokio::signal::unix::{signal, SignalKind};

        signal(SignalKind::terminate())
            .map_err(|e| error!("could not listen for SIGTERM: {}", e))
            .ok()
    };

    async move {
        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupted"),
                Err(e) => {
                    error!("could not listen for ctrl-c: {}", e);
                    pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Some(mut stream) => {
                    stream.recv().await;
                    info!("terminated");
                }
                None => pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = pending::<()>();

        tokio::select! {
            _ = interrupt => {}
            _ = terminate => {}
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn sigterm_requests_shutdown() {
        let shutdown = shutdown_signal();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        assert!(tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .is_ok());
    }
}
