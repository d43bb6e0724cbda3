//! Square-tile reveal.
//!
//! The canvas is cut into square tiles, clipped at the right and bottom
//! edges. A randomized effect picks a new side (8..40 px) for every canvas
//! and delivers the tiles in a full random permutation; a fixed-size
//! effect delivers them row by row.

use std::sync::Arc;

use image::{GenericImageView, RgbaImage};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::runtime::Handle;

use crate::error::ScreenError;
use crate::mixer::{Effect, Write, WriteStream};

pub const NAME: &str = "block";

const MIN_SIDE: u32 = 8;
const MAX_SIDE: u32 = 40;

/// `(x, y, width, height)` of one tile.
pub type Tile = (u32, u32, u32, u32);

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockEffect {
    /// Fixed side; `None` randomizes side and order per canvas.
    size: Option<u32>,
}

impl BlockEffect {
    pub fn new() -> Self {
        Self { size: None }
    }

    pub fn with_size(size: u32) -> Self {
        Self {
            size: Some(size.max(1)),
        }
    }
}

/// Row-major tiling of a `width`×`height` canvas.
pub fn tiles(width: u32, height: u32, side: u32) -> Vec<Tile> {
    let side = side.max(1);
    let mut out = Vec::new();
    for y in (0..height).step_by(side as usize) {
        for x in (0..width).step_by(side as usize) {
            out.push((x, y, side.min(width - x), side.min(height - y)));
        }
    }
    out
}

impl Effect for BlockEffect {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, image: Arc<RgbaImage>) -> Result<WriteStream, ScreenError> {
        if image.width() > u32::from(u16::MAX) || image.height() > u32::from(u16::MAX) {
            return Err(ScreenError::ParamOverflow("canvas size"));
        }
        let handle = Handle::try_current().map_err(|e| ScreenError::Other(e.to_string()))?;

        let size = self.size;
        let (tx, stream) = WriteStream::channel();
        handle.spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            let (side, shuffle) = match size {
                Some(side) => (side, false),
                None => (rng.gen_range(MIN_SIDE..MAX_SIDE), true),
            };
            let mut order = tiles(image.width(), image.height(), side);
            if shuffle {
                order.shuffle(&mut rng);
            }

            for (x, y, w, h) in order {
                let write = Write {
                    position: (x as u16, y as u16),
                    image: image.view(x, y, w, h).to_image(),
                };
                if tx.blocking_send(write).is_err() {
                    break;
                }
            }
        });

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(width: u32, height: u32, tiles: &[Tile]) -> Vec<u32> {
        let mut hits = vec![0u32; (width * height) as usize];
        for &(x, y, w, h) in tiles {
            for ty in y..y + h {
                for tx in x..x + w {
                    hits[(ty * width + tx) as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn tiling_clips_edges() {
        assert_eq!(
            tiles(10, 7, 4),
            vec![
                (0, 0, 4, 4),
                (4, 0, 4, 4),
                (8, 0, 2, 4),
                (0, 4, 4, 3),
                (4, 4, 4, 3),
                (8, 4, 2, 3),
            ]
        );
        assert!(tiles(0, 10, 8).is_empty());
    }

    #[test]
    fn every_side_covers_exactly() {
        for side in MIN_SIDE..MAX_SIDE {
            let hits = coverage(320, 480, &tiles(320, 480, side));
            assert!(hits.iter().all(|&n| n == 1), "side {side}");
        }
    }

    #[tokio::test]
    async fn random_blocks_are_a_permutation() {
        let img = Arc::new(RgbaImage::new(320, 480));
        let mut stream = BlockEffect::new().process(img).unwrap();

        let mut got = Vec::new();
        while let Some(w) = stream.next().await {
            let (x, y) = w.position;
            got.push((x as u32, y as u32, w.image.width(), w.image.height()));
        }

        let side = got
            .iter()
            .find(|t| t.0 == 0 && t.1 == 0)
            .map(|t| t.2)
            .unwrap();
        assert!((MIN_SIDE..MAX_SIDE).contains(&side));

        assert!(coverage(320, 480, &got).iter().all(|&n| n == 1));

        let mut expected = tiles(320, 480, side);
        expected.sort_unstable();
        got.sort_unstable();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_the_producer() {
        let img = Arc::new(RgbaImage::new(320, 480));
        let mut stream = BlockEffect::with_size(8).process(img.clone()).unwrap();
        assert!(stream.next().await.is_some());
        drop(stream);

        let released = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while Arc::strong_count(&img) > 1 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(released.is_ok(), "producer still holds the canvas");
    }

    #[test]
    fn process_needs_a_runtime() {
        let img = Arc::new(RgbaImage::new(8, 8));
        assert!(BlockEffect::with_size(4).process(img).is_err());
    }
}
