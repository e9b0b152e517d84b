use super::{Store, origin::OriginPolicy};
use crate::server::error::ApiError;
use passcode::Dispense;
use std::sync::Arc;

/// Body returned when the current batch is used up.
pub const OUT_OF_CODES: &str = "out of codes";

/// Outbound side of the relay: hands the next passcode to an allowed caller.
pub struct DispenseAdapter {
    store: Arc<Store>,
    origin_policy: OriginPolicy,
}

impl DispenseAdapter {
    pub fn new(store: Arc<Store>, origin_policy: OriginPolicy) -> Self {
        Self {
            store,
            origin_policy,
        }
    }

    /// Returns the next passcode, or [`OUT_OF_CODES`] once the batch is used
    /// up. Both are successful responses.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Forbidden`] if `origin` is not allowed. The store is not
    ///   touched.
    /// - [`ApiError::Store`] if the store is unavailable or corrupt.
    pub fn dispense(&self, origin: Option<&str>) -> Result<String, ApiError> {
        if !self.origin_policy.allows(origin) {
            tracing::warn!(
                origin = origin.unwrap_or("none"),
                "Refusing passcode request"
            );
            return Err(ApiError::Forbidden);
        }

        match self.store.next() {
            Ok(Dispense::Ready { code }) => {
                tracing::info!(origin = origin.unwrap_or("none"), "Dispensed passcode");
                Ok(code)
            }
            Ok(Dispense::OutOfCodes) => {
                tracing::warn!("Passcode requested but the store is out of codes");
                Ok(OUT_OF_CODES.to_string())
            }
            Err(e) => {
                tracing::error!("Failed to dispense passcode: {e}");
                Err(e.into())
            }
        }
    }
}
