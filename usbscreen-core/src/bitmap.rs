//! RGB565 pixel codec.
//!
//! The panel has no alpha channel and accepts 16-bit pixels laid out as
//!
//! ```text
//! bit  76543210  76543210
//!      RRRRRGGG  GGGBBBBB
//!      high byte low byte
//! ```
//!
//! stored little-endian (low byte first), row-major, `stride = 2 * width`.
//! Conversion truncates each channel to its top 5/6 bits; no dithering.

use image::{Rgba, RgbaImage};

/// Bytes per encoded pixel.
pub const BYTES_PER_PIXEL: usize = 2;

/// Encode `image` into the device's native pixel stream.
///
/// Pixels with zero alpha are left as zero bytes (black on the panel).
pub fn encode(image: &RgbaImage) -> Vec<u8> {
    Rgb565::from_image(image).into_bytes()
}

/// Pack an 8-bit RGB triple into a 16-bit 5-6-5 word.
pub const fn pack(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Expand a 5-6-5 word to 16-bit channels by bit replication.
///
/// All-zero and all-one channel values map exactly to `0` and `0xFFFF`.
/// Alpha is always fully opaque.
pub const fn unpack16(word: u16) -> [u16; 4] {
    let r = word & 0xF800; // RRRRR00000000000
    let g = word & 0x07E0; // 00000GGGGGG00000
    let b = word & 0x001F; // 00000000000BBBBB
    [
        r | r >> 5 | r >> 10 | r >> 15,
        g << 5 | g >> 1 | g >> 7,
        b << 11 | b << 6 | b << 1 | b >> 4,
        0xFFFF,
    ]
}

// ── Rgb565 ───────────────────────────────────────────────────────

/// A width×height RGB565 frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgb565 {
    pixels: Vec<u8>,
    stride: usize,
    width: u32,
    height: u32,
}

impl Rgb565 {
    /// An all-black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = BYTES_PER_PIXEL * width as usize;
        Self {
            pixels: vec![0; stride * height as usize],
            stride,
            width,
            height,
        }
    }

    /// Convert every pixel of `image`.
    pub fn from_image(image: &RgbaImage) -> Self {
        let mut buf = Self::new(image.width(), image.height());
        for (x, y, px) in image.enumerate_pixels() {
            buf.set(x, y, *px);
        }
        buf
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.stride + BYTES_PER_PIXEL * x as usize)
    }

    /// Store one pixel. Out-of-bounds writes and fully transparent
    /// pixels are ignored.
    pub fn set(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        let [r, g, b, a] = color.0;
        if a == 0 {
            return;
        }
        let word = pack(r, g, b);
        self.pixels[i] = (word & 0xFF) as u8;
        self.pixels[i + 1] = (word >> 8) as u8;
    }

    /// The raw 16-bit word at `(x, y)`, or 0 outside the buffer.
    pub fn word(&self, x: u32, y: u32) -> u16 {
        match self.offset(x, y) {
            Some(i) => u16::from_le_bytes([self.pixels[i], self.pixels[i + 1]]),
            None => 0,
        }
    }

    /// 16-bit-per-channel color at `(x, y)`.
    pub fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
        unpack16(self.word(x, y))
    }

    /// 8-bit color at `(x, y)`; always opaque.
    pub fn at(&self, x: u32, y: u32) -> Rgba<u8> {
        let [r, g, b, a] = self.rgba16(x, y);
        Rgba([(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, (a >> 8) as u8])
    }

    /// Decode the whole buffer back into an RGBA image.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| self.at(x, y))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(color: [u8; 3]) -> Rgba<u8> {
        let mut buf = Rgb565::new(1, 1);
        buf.set(0, 0, Rgba([color[0], color[1], color[2], 0xFF]));
        buf.at(0, 0)
    }

    #[test]
    fn white_and_black_are_exact() {
        assert_eq!(roundtrip([255, 255, 255]), Rgba([255, 255, 255, 255]));
        assert_eq!(roundtrip([0, 0, 0]), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn roundtrip_error_is_bounded() {
        for v in 0..=255u8 {
            for color in [[v, 0, 0], [0, v, 0], [0, 0, v], [v, 255 - v, v / 2]] {
                let out = roundtrip(color);
                assert!(out[0].abs_diff(color[0]) <= 7, "red {color:?} -> {out:?}");
                assert!(out[1].abs_diff(color[1]) <= 3, "green {color:?} -> {out:?}");
                assert!(out[2].abs_diff(color[2]) <= 7, "blue {color:?} -> {out:?}");
                assert_eq!(out[3], 255);
            }
        }
    }

    #[test]
    fn layout_is_little_endian_row_major() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(1, 0, Rgba([0xFF, 0, 0, 0xFF])); // 0xF800
        img.put_pixel(0, 1, Rgba([0, 0, 0xFF, 0xFF])); // 0x001F
        let bytes = encode(&img);

        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..2], &[0x00, 0x00]);
        assert_eq!(&bytes[2..4], &[0x00, 0xF8]);
        assert_eq!(&bytes[4..6], &[0x1F, 0x00]);
        assert_eq!(&bytes[6..8], &[0x00, 0x00]);
    }

    #[test]
    fn green_uses_six_bits() {
        assert_eq!(pack(0, 0xFF, 0), 0x07E0);
        assert_eq!(pack(0, 0x04, 0), 0x0020);
        assert_eq!(pack(0, 0x03, 0), 0x0000);
    }

    #[test]
    fn transparent_pixels_stay_zero() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([200, 100, 50, 0]));
        assert!(encode(&img).iter().all(|&b| b == 0));

        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 1]));
        assert_eq!(encode(&img), vec![0xFF, 0xFF]);
    }

    #[test]
    fn out_of_bounds_is_a_no_op() {
        let mut buf = Rgb565::new(2, 2);
        buf.set(2, 0, Rgba([255, 255, 255, 255]));
        buf.set(0, 5, Rgba([255, 255, 255, 255]));
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(buf.word(9, 9), 0);
        assert_eq!(buf.at(9, 9), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn unpack_replicates_bits() {
        assert_eq!(unpack16(0xFFFF), [0xFFFF; 4]);
        assert_eq!(unpack16(0x0000), [0, 0, 0, 0xFFFF]);
        // Top red bit only: 10000 -> 1000010000100001
        assert_eq!(unpack16(0x8000)[0], 0x8421);
    }

    #[test]
    fn to_image_matches_dimensions() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([255, 255, 255, 255]));
        let decoded = Rgb565::from_image(&img).to_image();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded, img);
    }
}
