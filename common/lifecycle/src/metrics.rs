pub(crate) const METRIC_SHUTDOWN_INITIATED: &str = "lifecycle_shutdown_initiated_total";
pub(crate) const METRIC_SHUTDOWN_COMPLETED: &str = "lifecycle_shutdown_completed_total";
pub(crate) const METRIC_SHUTDOWN_DURATION: &str = "lifecycle_shutdown_duration_seconds";
pub(crate) const METRIC_COMPONENT_SHUTDOWN_RESULT: &str =
    "lifecycle_component_shutdown_result_total";

pub(crate) fn emit_shutdown_initiated(trigger: &str) {
    metrics::counter!(
        METRIC_SHUTDOWN_INITIATED,
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_shutdown_completed(clean: bool, duration_secs: f64) {
    metrics::counter!(
        METRIC_SHUTDOWN_COMPLETED,
        "clean" => clean.to_string()
    )
    .increment(1);
    metrics::histogram!(
        METRIC_SHUTDOWN_DURATION,
        "clean" => clean.to_string()
    )
    .record(duration_secs);
}

pub(crate) fn emit_component_shutdown_result(component: &str, result: &str) {
    metrics::counter!(
        METRIC_COMPONENT_SHUTDOWN_RESULT,
        "component" => component.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}
