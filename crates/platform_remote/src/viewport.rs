//! Canvas viewport measurement, injected so grid placement stays testable
//! without a rendering surface.

/// Width reserved by the course sidebar in the estimated-viewport fallback.
pub const SIDEBAR_WIDTH_PX: i32 = 250;
/// Height reserved by the top bar in the estimated-viewport fallback.
pub const HEADER_HEIGHT_PX: i32 = 100;

/// Rendered size of the canvas area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportBounds {
    /// Canvas width in pixels.
    pub width: i32,
    /// Canvas height in pixels.
    pub height: i32,
}

impl ViewportBounds {
    /// Estimate used when no provider can measure the canvas: a common
    /// desktop window minus the sidebar and header chrome.
    pub const ESTIMATED_FALLBACK: Self = Self {
        width: 1280 - SIDEBAR_WIDTH_PX,
        height: 800 - HEADER_HEIGHT_PX,
    };
}

/// Source of the canvas's current rendered bounds.
pub trait ViewportProvider {
    /// Returns the canvas bounds, or `None` when the canvas cannot be
    /// measured (not mounted yet, headless host).
    fn canvas_bounds(&self) -> Option<ViewportBounds>;
}

/// Provider with fixed bounds, for tests and static layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedViewport(pub ViewportBounds);

impl ViewportProvider for FixedViewport {
    fn canvas_bounds(&self) -> Option<ViewportBounds> {
        Some(self.0)
    }
}

/// Provider that derives canvas bounds from an outer window size by
/// subtracting the shell chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatedViewport {
    /// Outer window width in pixels.
    pub window_width: i32,
    /// Outer window height in pixels.
    pub window_height: i32,
}

impl ViewportProvider for EstimatedViewport {
    fn canvas_bounds(&self) -> Option<ViewportBounds> {
        Some(ViewportBounds {
            width: (self.window_width - SIDEBAR_WIDTH_PX).max(0),
            height: (self.window_height - HEADER_HEIGHT_PX).max(0),
        })
    }
}

/// Provider for hosts with no measurable canvas; callers fall back to
/// [`ViewportBounds::ESTIMATED_FALLBACK`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmeasuredViewport;

impl ViewportProvider for UnmeasuredViewport {
    fn canvas_bounds(&self) -> Option<ViewportBounds> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_viewport_subtracts_shell_chrome() {
        let provider = EstimatedViewport {
            window_width: 1280,
            window_height: 800,
        };
        assert_eq!(
            provider.canvas_bounds(),
            Some(ViewportBounds {
                width: 1030,
                height: 700,
            })
        );
    }

    #[test]
    fn estimated_viewport_never_reports_negative_bounds() {
        let provider = EstimatedViewport {
            window_width: 100,
            window_height: 50,
        };
        assert_eq!(
            provider.canvas_bounds(),
            Some(ViewportBounds {
                width: 0,
                height: 0,
            })
        );
    }
}
