//! Debug visualization modes selected with the digit keys

/// Which visualization the lit and composite shaders produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugView {
    /// Full lighting with shadows
    #[default]
    Lit,
    /// Material albedo only, no lighting
    Albedo,
    /// World-space normals mapped to RGB
    Normals,
    /// Shadow factor as grayscale (white = lit)
    ShadowFactor,
    /// The shadow map, as seen from the light
    LightDepth,
    /// Linearized camera depth prepass
    CameraDepth,
}

impl DebugView {
    pub const ALL: [DebugView; 6] = [
        Self::Lit,
        Self::Albedo,
        Self::Normals,
        Self::ShadowFactor,
        Self::LightDepth,
        Self::CameraDepth,
    ];

    /// Map digit keys `1`..`6` to a view
    pub fn from_digit(digit: u32) -> Option<Self> {
        digit
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Value written to the `debugView` uniform
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Lit => 0,
            Self::Albedo => 1,
            Self::Normals => 2,
            Self::ShadowFactor => 3,
            Self::LightDepth => 4,
            Self::CameraDepth => 5,
        }
    }

    /// Human-readable label for logs and the window title
    pub fn label(self) -> &'static str {
        match self {
            Self::Lit => "Lit",
            Self::Albedo => "Albedo",
            Self::Normals => "Normals",
            Self::ShadowFactor => "Shadow Factor",
            Self::LightDepth => "Light Depth",
            Self::CameraDepth => "Camera Depth",
        }
    }

    /// Views drawn entirely by the composite pass from a depth texture
    pub fn is_fullscreen(self) -> bool {
        matches!(self, Self::LightDepth | Self::CameraDepth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_select_views() {
        assert_eq!(DebugView::from_digit(1), Some(DebugView::Lit));
        assert_eq!(DebugView::from_digit(6), Some(DebugView::CameraDepth));
        assert_eq!(DebugView::from_digit(0), None);
        assert_eq!(DebugView::from_digit(7), None);
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut view = DebugView::default();
        for expected in DebugView::ALL.iter().skip(1) {
            view = view.next();
            assert_eq!(view, *expected);
        }
        assert_eq!(view.next(), DebugView::Lit);
    }

    #[test]
    fn test_gpu_values_are_distinct() {
        for (i, view) in DebugView::ALL.iter().enumerate() {
            assert_eq!(view.as_u32(), i as u32);
        }
    }
}
