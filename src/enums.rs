/// What to do with a slice whose pixels all share one value, where min-max
/// scaling would divide by zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Replace the slice with zeros and keep going.
    #[default]
    Zeros,
    /// Fail with [`DegenerateImageError`](crate::scaler::DegenerateImageError).
    Reject,
}

/// Layout of the display title built from a slice's metadata.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TitleStyle {
    /// Every field on its own line.
    #[default]
    MultiLine,
    /// All fields on one line, separated by commas.
    SingleLine,
}
