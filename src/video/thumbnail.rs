/// Carousel poster size.
pub const THUMBNAIL_WIDTH: u32 = 160;
pub const THUMBNAIL_HEIGHT: u32 = 90;

/// Decoded poster frame, RGBA8, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Thumbnail {
    pub fn is_complete(&self) -> bool {
        self.rgba.len() == (self.width * self.height * 4) as usize
    }
}

pub fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        rgba.extend_from_slice(chunk);
        rgba.push(255);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba_adds_opaque_alpha() {
        let rgba = rgb_to_rgba(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_rgb_to_rgba_drops_trailing_partial_pixel() {
        assert_eq!(rgb_to_rgba(&[9, 9, 9, 1]), vec![9, 9, 9, 255]);
    }

    #[test]
    fn test_thumbnail_completeness() {
        let thumb = Thumbnail {
            rgba: rgb_to_rgba(&vec![0u8; (THUMBNAIL_WIDTH * THUMBNAIL_HEIGHT * 3) as usize]),
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
        };
        assert!(thumb.is_complete());

        let truncated = Thumbnail { rgba: vec![0; 8], ..thumb };
        assert!(!truncated.is_complete());
    }
}
