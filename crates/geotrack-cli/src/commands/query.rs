//! Query surface over the persisted record.
//!
//! These read the same record the running service writes, so they work
//! whether or not a tracking session is active in another process.

use std::error::Error;

use geotrack_core::StateStore;

pub fn status(json: bool) -> Result<(), Box<dyn Error>> {
    let store = StateStore::open()?;
    let running = store.is_tracking()?;
    if json {
        println!("{}", serde_json::json!({ "isTracking": running }));
    } else if running {
        println!("tracking active");
    } else {
        println!("tracking stopped");
    }
    Ok(())
}

pub fn last(json: bool) -> Result<(), Box<dyn Error>> {
    let store = StateStore::open()?;
    match store.last_location()? {
        Some((latitude, longitude)) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "latitude": latitude, "longitude": longitude })
                );
            } else {
                println!("last location: {latitude}, {longitude}");
            }
            Ok(())
        }
        None => Err("no location recorded yet".into()),
    }
}
