//! Utility functions.

/// Aligns an offset or size up to the next multiple of `align`.
/// `align` must be a power of two. Values already aligned are returned unchanged.
pub fn align_up(value: u64, align: u64) -> u64 {
    assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Number of zero bytes needed after `value` to reach the next multiple of `align`.
pub fn padding_for(value: u64, align: u64) -> u64 {
    align_up(value, align) - value
}
