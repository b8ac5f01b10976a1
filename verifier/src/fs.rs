use std::path::Path;

use anyhow::Context as _;
use rsk_blocks::config::ActivationSchedule;

/// The built-in activation schedule, with the networks listed in the JSON
/// file at `path` (if any) replacing the built-in ones.
pub fn load_activation_schedule(path: Option<&Path>) -> anyhow::Result<ActivationSchedule> {
    let mut schedule = ActivationSchedule::default();

    if let Some(path) = path {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let overrides = ActivationSchedule::from_json(&json)
            .with_context(|| format!("Invalid activation schedule {}", path.display()))?;

        tracing::info!("Loaded activation heights from {}", path.display());
        schedule.merge(overrides);
    }

    Ok(schedule)
}
