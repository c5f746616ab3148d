//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without any I/O or pixels.

/// Fit a source inside a bounding width, height unbounded, no enlargement.
///
/// Returns the output dimensions for a size breakpoint: the width is capped
/// at `max_width`, the height follows the aspect ratio. A source narrower
/// than the breakpoint keeps its dimensions.
pub fn fit_inside(source: (u32, u32), max_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w <= max_width || src_w == 0 {
        return (src_w, src_h);
    }
    let ratio = max_width as f64 / src_w as f64;
    (max_width, (src_h as f64 * ratio).round().max(1.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_source_scales_down() {
        // 4000x3000 at md=1024 → 1024x768
        assert_eq!(fit_inside((4000, 3000), 1024), (1024, 768));
    }

    #[test]
    fn portrait_source_scales_by_width() {
        // 1500x2000 at 640 → 640x853
        assert_eq!(fit_inside((1500, 2000), 640), (640, 853));
    }

    #[test]
    fn no_enlargement_below_breakpoint() {
        assert_eq!(fit_inside((500, 400), 1920), (500, 400));
    }

    #[test]
    fn exact_width_is_identity() {
        assert_eq!(fit_inside((1024, 768), 1024), (1024, 768));
    }

    #[test]
    fn rounding_keeps_at_least_one_pixel() {
        assert_eq!(fit_inside((10_000, 1), 320), (320, 1));
    }

    #[test]
    fn zero_width_source_is_identity() {
        assert_eq!(fit_inside((0, 0), 320), (0, 0));
    }
}
