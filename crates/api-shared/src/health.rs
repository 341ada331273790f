use crate::dto::HealthRes;

/// Simple health service shared by the REST API and the CLI.
///
/// This service provides a standardised way to check that the OPD service is up.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "OPD records service is alive".into(),
        }
    }
}
