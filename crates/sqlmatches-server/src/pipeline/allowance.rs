/// Bytes in one megabyte as used by the size thresholds.
pub const MEGABYTE: u64 = 1024 * 1024;

/// Upload size thresholds.
///
/// Demos up to `free` bytes are always accepted, up to `max` bytes only from
/// premium communities, and never beyond `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadAllowance {
    pub free: u64,
    pub max: u64,
}

impl UploadAllowance {
    /// Builds an allowance from megabyte thresholds.
    pub const fn from_megabytes(free_mb: u64, max_mb: u64) -> Self {
        Self {
            free: free_mb * MEGABYTE,
            max: max_mb * MEGABYTE,
        }
    }

    /// Largest demo a community may upload, further capped by the backend.
    pub fn limit(&self, premium: bool, backend_cap: Option<u64>) -> u64 {
        let tier = if premium { self.max } else { self.free.min(self.max) };
        backend_cap.map_or(tier, |cap| tier.min(cap))
    }
}

impl Default for UploadAllowance {
    fn default() -> Self {
        Self::from_megabytes(30, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_unlocks_the_band_between_free_and_max() {
        let allowance = UploadAllowance::default();
        assert_eq!(allowance.limit(false, None), 30 * MEGABYTE);
        assert_eq!(allowance.limit(true, None), 100 * MEGABYTE);
    }

    #[test]
    fn backend_cap_wins_when_lower() {
        let allowance = UploadAllowance::default();
        assert_eq!(allowance.limit(true, Some(64 * MEGABYTE)), 64 * MEGABYTE);
        assert_eq!(allowance.limit(false, Some(64 * MEGABYTE)), 30 * MEGABYTE);
    }
}
