//! User-visible status presentation.

use tracing::info;

use crate::fix::LocationFix;

/// Renders the tracking state as a status indicator.
///
/// A single presentation exists at a time: each call replaces whatever
/// was shown before, so re-rendering the same state with new
/// coordinates updates in place rather than stacking duplicates.
pub trait NotificationPresenter: Send + Sync {
    /// Actionable consent prompt, shown while awaiting confirmation.
    fn show_confirmation_prompt(&self);

    /// Ongoing-status display. `fix` carries the latest coordinates once
    /// tracking has produced one; `None` right after tracking starts.
    fn show_tracking(&self, fix: Option<&LocationFix>);

    /// Remove any presentation (stopped).
    fn clear(&self);
}

/// Presenter that writes status lines to the log. Stands in for a
/// platform notification surface in headless environments.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl NotificationPresenter for LogPresenter {
    fn show_confirmation_prompt(&self) {
        info!("location service: awaiting user confirmation");
    }

    fn show_tracking(&self, fix: Option<&LocationFix>) {
        match fix {
            Some(f) => info!(
                latitude = f.latitude,
                longitude = f.longitude,
                "location service: tracking"
            ),
            None => info!("location service: tracking started"),
        }
    }

    fn clear(&self) {
        info!("location service: stopped");
    }
}
