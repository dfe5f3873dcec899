//! Convolution engine and the pointwise grayscale transform.
//!
//! Edges are not padded: a kernel with offset `o` only visits centers in
//! `[o, W-o) x [o, H-o)`, and the output image is `(W-2o) x (H-2o)`.

use image::{Rgba, RgbaImage};

use crate::config::{Config, Overflow};
use crate::kernel::{Kernel, GRAY_WEIGHTS};

/// Per-run engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolveOptions {
    /// Channel narrowing rule
    pub overflow: Overflow,
    /// Times each pass is recomputed; every pass re-reads the source window
    pub repeat: u32,
}

impl Default for ConvolveOptions {
    fn default() -> Self {
        Self {
            overflow: Overflow::Wrap,
            repeat: 1,
        }
    }
}

impl ConvolveOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            overflow: config.convolution.overflow,
            repeat: config.processing.repeat.max(1),
        }
    }
}

/// Narrow a channel sum to 8 bits.
#[inline]
pub fn narrow(value: f64, overflow: Overflow) -> u8 {
    let truncated = value.trunc();
    match overflow {
        Overflow::Wrap => (truncated as i64).rem_euclid(256) as u8,
        Overflow::Saturate => truncated.clamp(0.0, 255.0) as u8,
    }
}

/// Output size for a `width x height` source, or `None` when the image has
/// no valid center pixel for this kernel.
pub fn output_dimensions(width: u32, height: u32, kernel: &Kernel) -> Option<(u32, u32)> {
    let border = 2 * kernel.offset() as u32;
    if width <= border || height <= border {
        return None;
    }
    Some((width - border, height - border))
}

/// Compute one output pixel centered on `(x, y)` of `source`.
///
/// `(x, y)` must lie in the valid center range; all four channels are
/// convolved independently.
pub fn apply(
    x: u32,
    y: u32,
    source: &RgbaImage,
    kernel: &Kernel,
    opts: &ConvolveOptions,
) -> Rgba<u8> {
    let off = kernel.offset() as u32;
    debug_assert!(x >= off && x + off < source.width());
    debug_assert!(y >= off && y + off < source.height());

    let (left, top) = (x - off, y - off);
    let side = kernel.side();
    let mut sums = [0.0f64; 4];

    for _ in 0..opts.repeat.max(1) {
        sums = [0.0; 4];
        for i in 0..side {
            for j in 0..side {
                let w = kernel.weight(i, j);
                let px = source.get_pixel(left + i as u32, top + j as u32);
                for (sum, channel) in sums.iter_mut().zip(px.0) {
                    *sum += w * f64::from(channel);
                }
            }
        }
        std::hint::black_box(&sums);
    }

    Rgba(sums.map(|s| narrow(s, opts.overflow)))
}

/// Convolve a whole image.
///
/// `on_row` is called with the output row index after each row finishes.
/// Returns `None` when the source is too small for the kernel.
pub fn convolve_image<F>(
    source: &RgbaImage,
    kernel: &Kernel,
    opts: &ConvolveOptions,
    mut on_row: F,
) -> Option<RgbaImage>
where
    F: FnMut(u32),
{
    let (out_w, out_h) = output_dimensions(source.width(), source.height(), kernel)?;
    let off = kernel.offset() as u32;
    let mut out = RgbaImage::new(out_w, out_h);

    for oy in 0..out_h {
        for ox in 0..out_w {
            let px = apply(ox + off, oy + off, source, kernel, opts);
            out.put_pixel(ox, oy, px);
        }
        on_row(oy);
    }
    Some(out)
}

/// Grayscale one pixel; alpha is carried through.
#[inline]
pub fn grayscale_pixel(px: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = px.0;
    let mixed = f64::from(r) * GRAY_WEIGHTS[0]
        + f64::from(g) * GRAY_WEIGHTS[1]
        + f64::from(b) * GRAY_WEIGHTS[2];
    // Weights sum to 2.8, so the average never exceeds 238.
    let gray = (mixed / 3.0) as u8;
    Rgba([gray, gray, gray, a])
}

/// Grayscale a whole image. Output has the same dimensions as the source.
pub fn grayscale_image(source: &RgbaImage, opts: &ConvolveOptions) -> RgbaImage {
    let mut out = RgbaImage::new(source.width(), source.height());
    for _ in 0..opts.repeat.max(1) {
        for (x, y, px) in source.enumerate_pixels() {
            out.put_pixel(x, y, grayscale_pixel(*px));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{lookup, parse_custom, Operation};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_image(rng: &mut StdRng, width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |_, _| Rgba(rng.gen()))
    }

    fn kernel(name: &str) -> Kernel {
        match lookup(name).unwrap() {
            Operation::Convolve(k) => k,
            Operation::Grayscale => unreachable!(),
        }
    }

    fn convolve_default(img: &RgbaImage, name: &str) -> Option<RgbaImage> {
        convolve_image(img, &kernel(name), &ConvolveOptions::default(), |_| {})
    }

    #[test]
    fn test_output_dimensions_shrink_by_offset() {
        let mut rng = StdRng::seed_from_u64(7);
        for name in ["Identity", "Outline", "Gaussian"] {
            let k = kernel(name);
            for _ in 0..10 {
                let (w, h) = (rng.gen_range(5..40), rng.gen_range(5..40));
                let img = random_image(&mut rng, w, h);
                let out = convolve_image(&img, &k, &ConvolveOptions::default(), |_| {}).unwrap();
                let border = 2 * k.offset() as u32;
                assert_eq!(out.dimensions(), (w - border, h - border), "{name} {w}x{h}");
            }
        }
    }

    #[test]
    fn test_too_small_images_have_no_output() {
        let k = kernel("Gaussian");
        assert_eq!(output_dimensions(4, 10, &k), None);
        assert_eq!(output_dimensions(10, 4, &k), None);
        assert_eq!(output_dimensions(5, 5, &k), Some((1, 1)));

        let img = RgbaImage::new(2, 2);
        assert!(convolve_default(&img, "Blur").is_none());
    }

    #[test]
    fn test_smallest_image_reads_stay_in_bounds() {
        // A 3x3 source has exactly one valid center; get_pixel panics on any
        // out-of-bounds read.
        let mut rng = StdRng::seed_from_u64(3);
        let img = random_image(&mut rng, 3, 3);
        let out = convolve_default(&img, "Emboss").unwrap();
        assert_eq!(out.dimensions(), (1, 1));
    }

    #[test]
    fn test_identity_reproduces_interior() {
        let mut rng = StdRng::seed_from_u64(42);
        let img = random_image(&mut rng, 17, 11);
        let out = convolve_default(&img, "Identity").unwrap();
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(px, img.get_pixel(x + 1, y + 1));
        }
    }

    #[test]
    fn test_custom_identity_is_a_diagonal_sum() {
        // Ones on the diagonal add the three pixels along it.
        let img = RgbaImage::from_fn(3, 3, |x, y| {
            if x == y {
                Rgba([10, 20, 30, 40])
            } else {
                Rgba([99, 99, 99, 99])
            }
        });
        let k = parse_custom("1 0 0 0 1 0 0 0 1").unwrap();
        let px = apply(1, 1, &img, &k, &ConvolveOptions::default());
        assert_eq!(px, Rgba([30, 60, 90, 120]));
    }

    #[test]
    fn test_uniform_blur_is_stable() {
        let img = RgbaImage::from_pixel(9, 9, Rgba([200, 100, 50, 255]));
        for name in ["Blur", "Gaussian"] {
            let out = convolve_default(&img, name).unwrap();
            assert!(out.pixels().all(|p| *p == Rgba([200, 100, 50, 255])), "{name}");
        }
    }

    #[test]
    fn test_overflow_wraps_by_default() {
        // Bright center, black surround: outline sums to 8 * 255 = 2040.
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let k = kernel("Outline");

        let wrapped = apply(1, 1, &img, &k, &ConvolveOptions::default());
        assert_eq!(wrapped, Rgba([248, 248, 248, 248]));

        let opts = ConvolveOptions {
            overflow: Overflow::Saturate,
            repeat: 1,
        };
        assert_eq!(apply(1, 1, &img, &k, &opts), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_negative_sums_wrap_or_clamp() {
        // Black center, white surround: outline sums to -2040.
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let k = kernel("Outline");

        assert_eq!(apply(1, 1, &img, &k, &ConvolveOptions::default()), Rgba([8, 8, 8, 8]));

        let opts = ConvolveOptions {
            overflow: Overflow::Saturate,
            repeat: 1,
        };
        assert_eq!(apply(1, 1, &img, &k, &opts), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_narrow_truncates_toward_zero() {
        assert_eq!(narrow(12.9, Overflow::Wrap), 12);
        assert_eq!(narrow(-0.5, Overflow::Wrap), 0);
        assert_eq!(narrow(-1.5, Overflow::Wrap), 255);
        assert_eq!(narrow(256.0, Overflow::Wrap), 0);
        assert_eq!(narrow(300.7, Overflow::Saturate), 255);
        assert_eq!(narrow(-3.0, Overflow::Saturate), 0);
    }

    #[test]
    fn test_repeat_does_not_change_output() {
        let mut rng = StdRng::seed_from_u64(11);
        let img = random_image(&mut rng, 12, 12);
        let k = kernel("Sharp");
        let once = convolve_image(&img, &k, &ConvolveOptions::default(), |_| {}).unwrap();
        let opts = ConvolveOptions {
            overflow: Overflow::Wrap,
            repeat: 4,
        };
        let repeated = convolve_image(&img, &k, &opts, |_| {}).unwrap();
        assert_eq!(once, repeated);
    }

    #[test]
    fn test_row_callback_runs_once_per_output_row() {
        let img = RgbaImage::new(10, 8);
        let mut rows = Vec::new();
        let opts = ConvolveOptions::default();
        convolve_image(&img, &kernel("Blur"), &opts, |r| rows.push(r)).unwrap();
        assert_eq!(rows, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_grayscale_channel_mix() {
        let px = grayscale_pixel(Rgba([100, 150, 200, 255]));
        // (92.126 + 145.728 + 181.444) / 3 = 139.766
        assert_eq!(px, Rgba([139, 139, 139, 255]));
    }

    #[test]
    fn test_grayscale_preserves_alpha_and_size() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 77]));
        let out = grayscale_image(&img, &ConvolveOptions::default());
        assert_eq!(out.dimensions(), (4, 3));
        assert!(out.pixels().all(|p| p[3] == 77 && p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn test_grayscale_is_not_a_fixed_point() {
        // The weights sum to 2.8, so an already-gray value v maps to
        // trunc(v * 2.8 / 3): only black survives a second pass unchanged.
        let first = grayscale_pixel(Rgba([100, 150, 200, 255]));
        let second = grayscale_pixel(first);
        assert_eq!(second, Rgba([129, 129, 129, 255]));

        assert_eq!(grayscale_pixel(Rgba([144, 144, 144, 255]))[0], 134);
        assert_eq!(grayscale_pixel(Rgba([0, 0, 0, 9])), Rgba([0, 0, 0, 9]));
        for v in 1..=255u8 {
            assert!(grayscale_pixel(Rgba([v, v, v, 255]))[0] < v, "{v}");
        }
    }

    #[test]
    fn test_grayscale_repeat_matches_single_pass() {
        let mut rng = StdRng::seed_from_u64(5);
        let img = random_image(&mut rng, 6, 6);
        let opts = ConvolveOptions {
            overflow: Overflow::Wrap,
            repeat: 3,
        };
        assert_eq!(
            grayscale_image(&img, &opts),
            grayscale_image(&img, &ConvolveOptions::default())
        );
    }
}
