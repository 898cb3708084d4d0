//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is empty or whitespace.
pub(crate) fn validate_non_empty(errors: &mut Vec<String>, name: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{name} must not be empty"));
    }
}

/// Replace `field` with `default` when `invalid`, noting the change.
pub(crate) fn reset_if<T: Clone + std::fmt::Debug>(
    fixed: &mut Vec<String>,
    name: &str,
    invalid: bool,
    field: &mut T,
    default: &T,
) {
    if invalid {
        fixed.push(format!("{name} = {field:?} is invalid, using {default:?}"));
        *field = default.clone();
    }
}
