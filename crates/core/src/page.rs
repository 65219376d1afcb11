use thiserror::Error;

use crate::geometry::TextBox;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page has no text boxes")]
    Empty,
}

/// All text boxes recognized on a single image, in engine output order.
#[derive(Debug, Clone, Default)]
pub struct Page {
    boxes: Vec<TextBox>,
}

impl Page {
    pub fn new(boxes: Vec<TextBox>) -> Self {
        Self { boxes }
    }

    pub fn boxes(&self) -> &[TextBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Median height over every box on the page. Even counts average the two
    /// middle heights.
    pub fn median_height(&self) -> Result<f64, PageError> {
        if self.boxes.is_empty() {
            return Err(PageError::Empty);
        }
        let mut heights: Vec<f64> = self.boxes.iter().map(TextBox::height).collect();
        heights.sort_by(f64::total_cmp);

        let mid = heights.len() / 2;
        if heights.len() % 2 == 0 {
            Ok((heights[mid - 1] + heights[mid]) / 2.0)
        } else {
            Ok(heights[mid])
        }
    }
}

impl From<Vec<TextBox>> for Page {
    fn from(boxes: Vec<TextBox>) -> Self {
        Self::new(boxes)
    }
}
