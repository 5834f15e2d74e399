use layers::LayerError;
use scene::geolocation::GeolocationErrorKind;
use tracing::warn;

/// A user-facing message raised by this layer. Display is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    LocationPermissionDenied,
    LocationFailed,
    LayerConfiguration { message: String },
}

impl Notification {
    pub fn for_location_error(kind: GeolocationErrorKind) -> Self {
        match kind {
            GeolocationErrorKind::PermissionDenied => Notification::LocationPermissionDenied,
            GeolocationErrorKind::PositionUnavailable | GeolocationErrorKind::Timeout => {
                Notification::LocationFailed
            }
        }
    }

    /// Only configuration errors are worth telling the user about.
    pub fn for_layer_error(err: &LayerError) -> Option<Self> {
        err.is_configuration().then(|| Notification::LayerConfiguration {
            message: err.to_string(),
        })
    }

    pub fn message(&self) -> String {
        match self {
            Notification::LocationPermissionDenied => {
                "Location access was denied. Allow it in the device settings to show your position."
                    .to_string()
            }
            Notification::LocationFailed => "Your position could not be determined.".to_string(),
            Notification::LayerConfiguration { message } => message.clone(),
        }
    }
}

/// Generic "show notification" callback.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

impl<F: Fn(Notification)> Notifier for F {
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Writes notifications to the log. Used when nothing is listening.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        warn!(?notification, "{}", notification.message());
    }
}
