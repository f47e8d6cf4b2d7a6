// THEORY:
// The `ProgressIndicator` is a display-resolution shadow of the `AnnotationBuffer`:
// one colour cell per column of the progress bar. It is written in lockstep with the
// buffer but never read back into it, so it is allowed to lose information. When many
// frames share a cell, the cell simply shows whichever colour was painted last.
//
// Frame to column mapping is `floor(cells / frames * frame)`: monotonic in the frame
// and always inside `[0, cells)`.

use crate::core_modules::action_catalog::Colour;
use std::ops::Range;

/// Maps frame indices onto indicator columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexScaler {
    indicator_length: usize,
    total_frames: usize,
    scalar: f64,
}

impl IndexScaler {
    /// Both lengths are raised to at least one so the mapping is always defined.
    pub fn new(indicator_length: usize, total_frames: usize) -> Self {
        let indicator_length = indicator_length.max(1);
        let total_frames = total_frames.max(1);
        Self {
            indicator_length,
            total_frames,
            scalar: indicator_length as f64 / total_frames as f64,
        }
    }

    pub fn indicator_length(&self) -> usize {
        self.indicator_length
    }

    pub fn indicator_index(&self, frame: usize) -> usize {
        let frame = frame.min(self.total_frames - 1);
        ((self.scalar * frame as f64).floor() as usize).min(self.indicator_length - 1)
    }

    /// Columns owned by `frame`: from its own index up to the next frame's, never empty.
    pub fn span(&self, frame: usize) -> Range<usize> {
        let start = self.indicator_index(frame);
        let next = if frame + 1 >= self.total_frames {
            self.indicator_length
        } else {
            self.indicator_index(frame + 1)
        };
        start..next.max(start + 1)
    }
}

#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    cells: Vec<Colour>,
    scaler: IndexScaler,
}

impl ProgressIndicator {
    pub fn new(indicator_length: usize, total_frames: usize, background: Colour) -> Self {
        let scaler = IndexScaler::new(indicator_length, total_frames);
        Self {
            cells: vec![background; scaler.indicator_length()],
            scaler,
        }
    }

    pub fn scaler(&self) -> &IndexScaler {
        &self.scaler
    }

    pub fn cells(&self) -> &[Colour] {
        &self.cells
    }

    /// Paints every column owned by `frame`.
    pub fn paint(&mut self, frame: usize, colour: Colour) {
        let span = self.scaler.span(frame);
        for cell in &mut self.cells[span] {
            *cell = colour;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    const GRAY: Colour = Rgb([50, 50, 50]);
    const RED: Colour = Rgb([255, 0, 0]);
    const BLUE: Colour = Rgb([0, 0, 255]);

    #[test]
    fn downsampled_cells_keep_the_last_colour() {
        let mut indicator = ProgressIndicator::new(2, 10, GRAY);
        assert_eq!(indicator.scaler().indicator_index(4), 0);
        assert_eq!(indicator.scaler().indicator_index(5), 1);

        indicator.paint(3, RED);
        indicator.paint(4, BLUE);
        assert_eq!(indicator.cells(), &[BLUE, GRAY]);
    }

    #[test]
    fn upsampled_frames_paint_all_their_columns() {
        let mut indicator = ProgressIndicator::new(10, 4, GRAY);
        assert_eq!(indicator.scaler().span(0), 0..2);
        assert_eq!(indicator.scaler().span(3), 7..10);

        indicator.paint(3, RED);
        assert_eq!(&indicator.cells()[7..], &[RED, RED, RED]);
        assert_eq!(indicator.cells()[6], GRAY);
    }

    #[test]
    fn degenerate_lengths_still_map() {
        let scaler = IndexScaler::new(0, 0);
        assert_eq!(scaler.indicator_length(), 1);
        assert_eq!(scaler.indicator_index(0), 0);
        assert_eq!(scaler.indicator_index(100), 0);
    }

    proptest! {
        #[test]
        fn indicator_index_is_monotonic_and_bounded(
            indicator_length in 1usize..2_000,
            total_frames in 1usize..200_000,
        ) {
            let scaler = IndexScaler::new(indicator_length, total_frames);
            let step = (total_frames / 500).max(1);
            let mut previous = 0;
            for frame in (0..total_frames).step_by(step).chain(std::iter::once(total_frames - 1)) {
                let index = scaler.indicator_index(frame);
                prop_assert!(index < indicator_length);
                prop_assert!(index >= previous);
                previous = index;
            }
        }

        #[test]
        fn spans_are_never_empty(indicator_length in 1usize..500, total_frames in 1usize..5_000, frame in 0usize..5_000) {
            let scaler = IndexScaler::new(indicator_length, total_frames);
            let span = scaler.span(frame.min(total_frames - 1));
            prop_assert!(!span.is_empty());
            prop_assert!(span.end <= indicator_length);
        }
    }
}
