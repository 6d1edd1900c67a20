//! Presentation state for the booking screen.
//!
//! `BookingViewModel` drives the coordinator and publishes the result as a
//! `ViewState` on a watch channel. Subscribers always see the latest state.

use booking_core::{BookingCoordinator, BookingRecord, Error};
use tokio::sync::watch;

/// Observable screen state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub is_loading: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    pub booking: Option<BookingRecord>,
}

pub struct BookingViewModel {
    coordinator: BookingCoordinator,
    state: watch::Sender<ViewState>,
}

impl BookingViewModel {
    pub fn new(coordinator: BookingCoordinator) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self { coordinator, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Load the booking, serving the cache when fresh.
    ///
    /// Returns `false` without doing anything if a load is already running.
    pub async fn load(&self) -> bool {
        if !self.begin(true) {
            tracing::debug!("load already in flight");
            return false;
        }
        let result = self.coordinator.get().await;
        self.finish("load", result);
        true
    }

    /// Fetch a fresh booking regardless of the cache.
    pub async fn refresh(&self) {
        self.begin(false);
        let result = self.coordinator.refresh().await;
        self.finish("refresh", result);
    }

    /// Mark the start of a request. With `exclusive`, refuses to start while
    /// another request is in flight.
    fn begin(&self, exclusive: bool) -> bool {
        self.state.send_if_modified(|state| {
            if exclusive && state.is_loading {
                return false;
            }
            state.is_loading = true;
            state.has_error = false;
            state.error_message = None;
            true
        })
    }

    fn finish(&self, action: &str, result: Result<BookingRecord, Error>) {
        self.state.send_modify(|state| {
            state.is_loading = false;
            match result {
                Ok(booking) => {
                    tracing::info!(action, ship_reference = %booking.ship_reference, "booking updated");
                    state.booking = Some(booking);
                }
                Err(e) => {
                    tracing::error!(action, error = %e, "booking request failed");
                    state.has_error = true;
                    state.error_message = Some(e.to_string());
                }
            }
        });
    }
}
