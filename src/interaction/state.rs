/// Transient per-model interaction state.
///
/// Vibrating and rotating are independent flags: both may be set at the same
/// time and each drives its own part of the transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InteractionState {
    pub is_vibrating: bool,
    pub is_rotating: bool,
    /// Page scroll in logical pixels divided by the scroll sensitivity.
    pub scroll_offset: f32,
}
