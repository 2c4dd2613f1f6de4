//! Best-effort default-browser launch.

use tracing::{debug, warn};

/// Open `url` in the system default browser.
///
/// The only intentionally non-fatal step of the flow: when the launch
/// fails the operator can still navigate to the printed URL by hand, so
/// failure is reported as a warning and swallowed.
pub fn launch(url: &str) {
    match open::that(url) {
        Ok(()) => debug!("opened browser"),
        Err(e) => warn!("could not open the browser: {e}"),
    }
}
