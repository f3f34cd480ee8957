//! Foreground tracking session.
//!
//! Plays the roles the mobile shell splits across the OS service and
//! the bridge: launches the controller, answers the confirmation
//! prompt on stdin when the configuration demands one, and relays
//! events to stdout until Ctrl-C.

use std::error::Error;
use std::io::Write;
use std::sync::Arc;

use geotrack_core::{
    Config, LogPresenter, RemoteSink, SimulatedProvider, StateStore, TrackingController,
    TrackingState,
};

pub fn run(latitude: f64, longitude: f64) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let store = StateStore::open()?;
    let provider = Arc::new(SimulatedProvider::new(latitude, longitude));
    let presenter = Arc::new(LogPresenter);
    let sink = RemoteSink::new(&config.collector.endpoint, &config.collector.name)?;
    let controller = TrackingController::new(&config, store, provider, presenter, sink);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut events = controller.subscribe_events();
        controller.launch()?;

        if controller.state() == TrackingState::AwaitingConfirmation {
            // Stand-in for the actionable notification.
            let confirmed = tokio::task::spawn_blocking(ask_confirmation).await??;
            if confirmed {
                controller.confirm()?;
            } else {
                controller.decline();
                println!("tracking declined");
                return Ok(());
            }
        }

        println!("tracking... press Ctrl-C to stop");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ev) => println!("{}", serde_json::to_string(&ev)?),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        controller.shutdown();
        Ok::<(), Box<dyn Error>>(())
    })
}

fn ask_confirmation() -> Result<bool, std::io::Error> {
    print!("Start location tracking? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
