//! Synthetic scenes shared by the integration tests.

#![allow(dead_code)]

use ctrlmap_edges::{EdgeMap, GrayImage, Image};
use image::Luma;

/// Install a test logger so fallback warnings show up with `--nocapture`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A uniform gray image.
pub fn uniform(width: u32, height: u32, value: u8) -> Image {
    Image::Gray(GrayImage::from_pixel(width, height, Luma([value])))
}

/// A `size`x`size` white image with a black square covering
/// `start..start + side` on both axes.
pub fn square(size: u32, start: u32, side: u32) -> Image {
    let inside = |v: u32| (start..start + side).contains(&v);
    Image::Gray(GrayImage::from_fn(size, size, |x, y| {
        Luma([if inside(x) && inside(y) { 0 } else { 255 }])
    }))
}

/// A 256x256 white image with a centered 150x150 black square
/// (pixels 53..=202 on both axes).
pub fn centered_square() -> Image {
    square(256, 53, 150)
}

/// A black/white checkerboard with `cell`-pixel cells.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> Image {
    Image::Gray(GrayImage::from_fn(width, height, |x, y| {
        Luma([if (x / cell + y / cell) % 2 == 0 { 32 } else { 220 }])
    }))
}

/// Coordinates of every pixel with a non-zero edge value.
pub fn edge_pixels(edges: &EdgeMap) -> Vec<(u32, u32)> {
    let (w, h) = (edges.width(), edges.height());
    (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| edges.value(x, y).is_some_and(|v| v > 0.0))
        .collect()
}

/// Number of 8-connected components among the edge pixels.
pub fn component_count(edges: &EdgeMap) -> usize {
    let (w, h) = (edges.width(), edges.height());
    let is_edge = |x: u32, y: u32| edges.value(x, y).is_some_and(|v| v > 0.0);
    let mut seen = vec![false; (w * h) as usize];
    let mut components = 0;

    for (sx, sy) in edge_pixels(edges) {
        if seen[(sy * w + sx) as usize] {
            continue;
        }
        components += 1;
        seen[(sy * w + sx) as usize] = true;
        let mut stack = vec![(sx, sy)];
        while let Some((x, y)) = stack.pop() {
            for dy in -1_i32..=1 {
                for dx in -1_i32..=1 {
                    let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx < w && ny < h && is_edge(nx, ny) && !seen[(ny * w + nx) as usize] {
                        seen[(ny * w + nx) as usize] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    components
}
