//! GPU block-list policy applied at load time (spec.md §4.1). A small,
//! deliberately narrow denylist rather than a fuzzy match: the backend's
//! device-description string is compared by prefix, matching the single
//! documented problem family.

const BLOCKLIST_PREFIXES: &[&str] = &["Adreno"];

/// Returns `true` if `device_description` matches a known-problematic GPU
/// family and GPU acceleration should be reported off even though the engine
/// itself reports it active.
pub fn is_gpu_blocklisted(device_description: &str) -> bool {
    BLOCKLIST_PREFIXES
        .iter()
        .any(|prefix| device_description.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_adreno_prefixed_devices() {
        assert!(is_gpu_blocklisted("Adreno (TM) 640"));
        assert!(is_gpu_blocklisted("Adreno"));
    }

    #[test]
    fn allows_other_device_families() {
        assert!(!is_gpu_blocklisted("NVIDIA GeForce RTX 3080"));
        assert!(!is_gpu_blocklisted("Mali-G78"));
        assert!(!is_gpu_blocklisted("AMD Radeon"));
    }
}
