use crate::dto::HealthRes;

/// Simple health service shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as alive, with the number of loaded conditions.
    pub fn check_health(conditions: usize) -> HealthRes {
        HealthRes {
            ok: true,
            message: "Symptom triage is alive".into(),
            conditions,
        }
    }
}
