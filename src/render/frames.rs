// Frame drawing for the waveform and spectrum visualisations
//
// Pure functions over decoded mono samples in [-1, 1]; no ffmpeg involved.

use image::{Rgb, RgbImage};

pub const WIDTH: u32 = 1280;
pub const HEIGHT: u32 = 720;

/// Waveform window length, in segments
pub const WAVEFORM_WINDOW: usize = 20;
/// Spectrum analysis window length, in segments
pub const SPECTRUM_WINDOW: usize = 2;
pub const SPECTRUM_BINS: usize = 100;

const WAVEFORM_Y_LIMIT: f32 = 1.2;
const SPECTRUM_Y_LIMIT: f32 = 5.0;
/// Samples are analysed at 16-bit PCM amplitude
const INT16_SCALE: f32 = 32768.0;

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0x34, 0x98, 0xdb]);
pub const ORANGE: Rgb<u8> = Rgb([0xf3, 0x9c, 0x12]);
pub const RED: Rgb<u8> = Rgb([0xe7, 0x4c, 0x3c]);

/// Slice `[start, start + len)` clamped to the sample buffer
fn window(samples: &[f32], start: usize, len: usize) -> &[f32] {
    let start = start.min(samples.len());
    let end = start.saturating_add(len).min(samples.len());
    &samples[start..end]
}

/// Vertical pixel for an amplitude in [-limit, limit]
fn amplitude_to_y(value: f32) -> i64 {
    let clamped = value.clamp(-WAVEFORM_Y_LIMIT, WAVEFORM_Y_LIMIT);
    let norm = (WAVEFORM_Y_LIMIT - clamped) / (2.0 * WAVEFORM_Y_LIMIT);
    (norm * (HEIGHT - 1) as f32).round() as i64
}

/// Draw frame `index` of the waveform video.
///
/// Shows a polyline over `[index * segment, index * segment + 20 * segment)`.
pub fn draw_waveform_frame(samples: &[f32], index: usize, segment: usize) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let data = window(samples, index * segment, segment * WAVEFORM_WINDOW);

    match data.len() {
        0 => {}
        1 => {
            let y = amplitude_to_y(data[0]);
            draw_line(&mut img, (0, y), ((WIDTH - 1) as i64, y), BLUE);
        }
        n => {
            let x_of = |i: usize| (i as f64 * (WIDTH - 1) as f64 / (n - 1) as f64).round() as i64;
            for i in 1..n {
                let from = (x_of(i - 1), amplitude_to_y(data[i - 1]));
                let to = (x_of(i), amplitude_to_y(data[i]));
                draw_line(&mut img, from, to, BLUE);
            }
        }
    }
    img
}

/// `log10(|X_k| + 1)` for the first 100 real-DFT bins of the window, zero padded
pub fn spectrum_bins(samples: &[f32], index: usize, segment: usize) -> Vec<f32> {
    let data: Vec<f32> = window(samples, index * segment, segment * SPECTRUM_WINDOW)
        .iter()
        .map(|s| s * INT16_SCALE)
        .collect();
    let n = data.len();
    let available = if n == 0 { 0 } else { n / 2 + 1 };

    (0..SPECTRUM_BINS)
        .map(|k| {
            if k >= available {
                return 0.0;
            }
            let step = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
            let (re, im) = data
                .iter()
                .enumerate()
                .fold((0.0f64, 0.0f64), |(re, im), (t, &x)| {
                    let angle = step * t as f64;
                    (re + x as f64 * angle.cos(), im + x as f64 * angle.sin())
                });
            ((re * re + im * im).sqrt() + 1.0).log10() as f32
        })
        .collect()
}

/// Bar colour by height
pub fn bar_color(height: f32) -> Rgb<u8> {
    if height > 3.0 {
        RED
    } else if height > 2.0 {
        ORANGE
    } else {
        BLUE
    }
}

/// Draw frame `index` of the spectrum video: 100 bars on a 0..5 scale.
pub fn draw_spectrum_frame(samples: &[f32], index: usize, segment: usize) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let bins = spectrum_bins(samples, index, segment);

    for (i, &h) in bins.iter().enumerate() {
        let x0 = (i as u32 * WIDTH) / SPECTRUM_BINS as u32;
        let x1 = ((i as u32 + 1) * WIDTH) / SPECTRUM_BINS as u32;
        // 1 px gap between bars
        let x1 = x1.saturating_sub(1).max(x0 + 1);
        let bar = ((h / SPECTRUM_Y_LIMIT).clamp(0.0, 1.0) * HEIGHT as f32).round() as u32;
        if bar == 0 {
            continue;
        }
        let color = bar_color(h);
        for y in (HEIGHT - bar)..HEIGHT {
            for x in x0..x1.min(WIDTH) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

/// 2 px Bresenham line, clipped to the image
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot(img, x, y, color);
        plot(img, x, y + 1, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn plot(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, cycles_per_window: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * cycles_per_window * i as f32 / len as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_frame_dimensions() {
        let samples = sine(4000, 4.0);
        let wave = draw_waveform_frame(&samples, 0, 100);
        let spec = draw_spectrum_frame(&samples, 0, 100);
        assert_eq!(wave.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(spec.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_silence_draws_centre_line() {
        let samples = vec![0.0; 2000];
        let img = draw_waveform_frame(&samples, 0, 100);
        let mid = amplitude_to_y(0.0) as u32;
        assert_eq!(*img.get_pixel(WIDTH / 2, mid), BLUE);
        assert_eq!(*img.get_pixel(WIDTH / 2, 10), BACKGROUND);
    }

    #[test]
    fn test_waveform_past_end_is_blank() {
        let samples = vec![0.5; 100];
        let img = draw_waveform_frame(&samples, 10, 100);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_amplitude_mapping() {
        assert_eq!(amplitude_to_y(WAVEFORM_Y_LIMIT), 0);
        assert_eq!(amplitude_to_y(-WAVEFORM_Y_LIMIT), (HEIGHT - 1) as i64);
        assert_eq!(amplitude_to_y(5.0), 0);
    }

    #[test]
    fn test_spectrum_peak_at_tone_bin() {
        // 8 cycles across a 200-sample window: energy lands in bin 8
        let samples = sine(200, 8.0);
        let bins = spectrum_bins(&samples, 0, 100);
        assert_eq!(bins.len(), SPECTRUM_BINS);
        let peak = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
    }

    #[test]
    fn test_short_window_is_zero_padded() {
        let samples = sine(20, 2.0);
        let bins = spectrum_bins(&samples, 0, 10);
        assert!(bins[11..].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_bar_colors() {
        assert_eq!(bar_color(3.5), RED);
        assert_eq!(bar_color(2.5), ORANGE);
        assert_eq!(bar_color(2.0), BLUE);
        assert_eq!(bar_color(0.1), BLUE);
    }

    #[test]
    fn test_loud_tone_draws_coloured_bar() {
        let samples = sine(200, 8.0);
        let img = draw_spectrum_frame(&samples, 0, 100);
        let x = (8 * WIDTH) / SPECTRUM_BINS as u32;
        assert_eq!(*img.get_pixel(x, HEIGHT - 1), RED);
    }

    #[test]
    fn test_silence_draws_no_bars() {
        let samples = vec![0.0; 400];
        let img = draw_spectrum_frame(&samples, 0, 100);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }
}
