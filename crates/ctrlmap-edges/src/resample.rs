//! Resampling between detection scales.
//!
//! Images shrink by area averaging (every source pixel contributes to
//! the output pixel it falls into) and grow with the `image` crate's
//! bilinear `Triangle` filter. Edge maps travel back to the original
//! resolution by nearest neighbor, which keeps binary maps binary.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel};

use crate::types::{Dimensions, EdgeMap, GrayBuffer, Image};

/// Dimensions of an image scaled by `scale`: each axis is rounded to the
/// nearest integer and never drops below 1.
///
/// `scale` must be positive and finite.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn scaled_dimensions(dimensions: Dimensions, scale: f32) -> Dimensions {
    let axis = |len: u32| -> u32 {
        let scaled = (f64::from(len) * f64::from(scale)).round();
        scaled.clamp(1.0, f64::from(u32::MAX)) as u32
    };
    Dimensions::new(axis(dimensions.width), axis(dimensions.height))
}

/// Resize an image to `target`.
///
/// Uses area averaging when neither axis grows, bilinear interpolation
/// otherwise. Equal dimensions return a copy.
#[must_use = "returns the resized image"]
pub fn resize_image(image: &Image, target: Dimensions) -> Image {
    match image {
        Image::Gray(gray) => Image::Gray(resize_buffer(gray, target)),
        Image::Rgb(rgb) => Image::Rgb(resize_buffer(rgb, target)),
    }
}

fn resize_buffer<P>(image: &ImageBuffer<P, Vec<u8>>, target: Dimensions) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (w, h) = image.dimensions();
    if (w, h) == (target.width, target.height) {
        image.clone()
    } else if target.width <= w && target.height <= h {
        area_average(image, target)
    } else {
        imageops::resize(image, target.width, target.height, FilterType::Triangle)
    }
}

/// Box-filter downsample. Output pixel `o` on an axis of source length
/// `s` and target length `t` averages source pixels
/// `floor(o*s/t) .. ceil((o+1)*s/t)`.
fn area_average<P>(image: &ImageBuffer<P, Vec<u8>>, target: Dimensions) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (w, h) = image.dimensions();
    let channels = usize::from(P::CHANNEL_COUNT);
    let mut out = ImageBuffer::<P, Vec<u8>>::new(target.width, target.height);

    for oy in 0..target.height {
        let (y0, y1) = source_span(oy, h, target.height);
        for ox in 0..target.width {
            let (x0, x1) = source_span(ox, w, target.width);

            let mut sums = [0_u64; 4];
            for y in y0..y1 {
                for x in x0..x1 {
                    for (sum, &v) in sums.iter_mut().zip(image.get_pixel(x, y).channels()) {
                        *sum += u64::from(v);
                    }
                }
            }

            let count = u64::from(x1 - x0) * u64::from(y1 - y0);
            let px = out.get_pixel_mut(ox, oy).channels_mut();
            for (dst, &sum) in px.iter_mut().zip(&sums).take(channels) {
                *dst = u8::try_from((sum + count / 2) / count).unwrap_or(u8::MAX);
            }
        }
    }
    out
}

/// Half-open source range covered by output index `o`. Never empty.
fn source_span(o: u32, source: u32, target: u32) -> (u32, u32) {
    let (o, s, t) = (u64::from(o), u64::from(source), u64::from(target));
    let start = o * s / t;
    let end = ((o + 1) * s).div_ceil(t).max(start + 1).min(s);
    (
        u32::try_from(start).unwrap_or(source - 1),
        u32::try_from(end).unwrap_or(source),
    )
}

/// Resample an edge map to `target` by nearest neighbor.
///
/// Output pixel `o` samples source pixel `floor((2o + 1) * s / (2t))`,
/// the source pixel under the output pixel's center.
#[must_use = "returns the resampled edge map"]
pub fn resize_nearest(edges: &EdgeMap, target: Dimensions) -> EdgeMap {
    let source = edges.dimensions();
    if source == target {
        return edges.clone();
    }

    let buffer = edges.as_buffer();
    let xs: Vec<u32> = (0..target.width)
        .map(|o| nearest_index(o, source.width, target.width))
        .collect();
    let ys: Vec<u32> = (0..target.height)
        .map(|o| nearest_index(o, source.height, target.height))
        .collect();

    EdgeMap::from_buffer(GrayBuffer::from_fn(target.width, target.height, |x, y| {
        *buffer.get_pixel(xs[x as usize], ys[y as usize])
    }))
}

fn nearest_index(o: u32, source: u32, target: u32) -> u32 {
    let index = (2 * u64::from(o) + 1) * u64::from(source) / (2 * u64::from(target));
    u32::try_from(index).map_or(source - 1, |i| i.min(source - 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn scaled_dimensions_round_and_clamp() {
        let dims = Dimensions::new(256, 100);
        assert_eq!(scaled_dimensions(dims, 1.0), dims);
        assert_eq!(scaled_dimensions(dims, 0.5), Dimensions::new(128, 50));
        assert_eq!(scaled_dimensions(dims, 0.25), Dimensions::new(64, 25));
        assert_eq!(scaled_dimensions(dims, 0.001), Dimensions::new(1, 1));
        assert_eq!(scaled_dimensions(Dimensions::new(3, 3), 1.5), Dimensions::new(5, 5));
    }

    #[test]
    fn area_average_halves_checkerboard_to_gray() {
        let img = GrayImage::from_fn(4, 4, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 200 }]));
        let small = resize_image(&Image::Gray(img), Dimensions::new(2, 2));
        let Image::Gray(small) = small else {
            unreachable!("gray in, gray out");
        };
        assert!(small.pixels().all(|p| p.0[0] == 100));
    }

    #[test]
    fn area_average_keeps_uniform_rgb_uniform() {
        let img = RgbImage::from_pixel(9, 7, Rgb([10, 120, 250]));
        let small = resize_image(&Image::Rgb(img), Dimensions::new(4, 3));
        assert_eq!(small.dimensions(), Dimensions::new(4, 3));
        let Image::Rgb(small) = small else {
            unreachable!("rgb in, rgb out");
        };
        assert!(small.pixels().all(|p| p.0 == [10, 120, 250]));
    }

    #[test]
    fn upsample_uses_target_dimensions() {
        let img = GrayImage::from_pixel(3, 3, Luma([77]));
        let big = resize_image(&Image::Gray(img), Dimensions::new(5, 5));
        assert_eq!(big.dimensions(), Dimensions::new(5, 5));
    }

    #[test]
    fn source_spans_cover_every_pixel() {
        for (s, t) in [(10, 3), (7, 7), (5, 1), (256, 64), (3, 2)] {
            let mut covered = vec![false; s as usize];
            for o in 0..t {
                let (a, b) = source_span(o, s, t);
                assert!(a < b && b <= s, "span {a}..{b} for {s}->{t}");
                for c in &mut covered[a as usize..b as usize] {
                    *c = true;
                }
            }
            assert!(covered.iter().all(|&c| c), "{s}->{t}");
        }
    }

    #[test]
    fn nearest_upsample_keeps_binary_values() {
        let mut buffer = GrayBuffer::new(2, 2);
        buffer.put_pixel(1, 0, Luma([1.0]));
        let edges = resize_nearest(&EdgeMap::from_buffer(buffer), Dimensions::new(4, 4));
        assert!(edges.is_binary());
        assert_eq!(edges.edge_pixel_count(), 4);
        assert_eq!(edges.value(2, 0), Some(1.0));
        assert_eq!(edges.value(3, 1), Some(1.0));
        assert_eq!(edges.value(1, 0), Some(0.0));
    }

    #[test]
    fn nearest_index_stays_in_bounds() {
        for (s, t) in [(1, 9), (9, 1), (64, 256), (128, 255)] {
            for o in 0..t {
                assert!(nearest_index(o, s, t) < s);
            }
        }
    }
}
