use hostguard_domain::options::ReportOptions;

/// Names accepted by the `profile` key.
pub const PRESETS: [&str; 3] = ["default", "terse", "failures"];

/// Report shaping for a named preset, `None` for unknown names.
pub fn preset(profile: &str) -> Option<ReportOptions> {
    match profile {
        "default" => Some(ReportOptions::default()),
        "terse" => Some(ReportOptions {
            verbose: false,
            ..ReportOptions::default()
        }),
        // Only what needs attention, with enough detail to act on it.
        "failures" => Some(ReportOptions {
            show_success: false,
            ..ReportOptions::default()
        }),
        _ => None,
    }
}
