//! Stable identifiers for check-types and outcome codes.
//!
//! Check-type names are the top-level keys of a rule document. `code` is a short
//! snake_case discriminator stored in an outcome's `data.code`.

// Check-types (rule document sections)
pub const MODULE_PACKAGE: &str = "package";
pub const MODULE_LISTENING_PORT: &str = "listening-port";
pub const MODULE_POLICY_SETTING: &str = "policy-setting";
pub const MODULE_KERNEL_PARAM: &str = "kernel-param";
pub const MODULE_VULNERABILITY: &str = "vulnerability";

// Reserved top-level key for compensating controls.
pub const SECTION_CONTROL: &str = "control";

// Codes: package
pub const CODE_BLACKLISTED_INSTALLED: &str = "blacklisted_installed";
pub const CODE_REQUIRED_MISSING: &str = "required_missing";
pub const CODE_VERSION_MISMATCH: &str = "version_mismatch";
pub const CODE_INVALID_MODIFIER: &str = "invalid_modifier";

// Codes: listening-port
pub const CODE_UNLISTED_ADDRESS: &str = "unlisted_address";

// Codes: policy-setting
pub const CODE_SETTING_PRESENT: &str = "setting_present";
pub const CODE_SETTING_MISSING: &str = "setting_missing";

// Codes: kernel-param
pub const CODE_PARAM_MISSING: &str = "param_missing";
pub const CODE_PARAM_MISMATCH: &str = "param_mismatch";
pub const CODE_MISSING_MATCH_OUTPUT: &str = "missing_match_output";

// Codes: vulnerability
pub const CODE_VULNERABLE_PACKAGE: &str = "vulnerable_package";
pub const CODE_UNSUPPORTED_OS_FAMILY: &str = "unsupported_os_family";

// Codes: generic checks
pub const CODE_CHECK_FAILED: &str = "check_failed";
pub const CODE_VERSION_FACT_MISSING: &str = "version_fact_missing";
pub const CODE_VERSION_OUT_OF_RANGE: &str = "version_out_of_range";
pub const CODE_VERSION_UNPARSEABLE: &str = "version_unparseable";

// Tool-level
pub const CODE_PROBE_ERROR: &str = "probe_error";
