//! Procedural ground-truth shapes
//!
//! Every archetype is built as a float mask from an implicit function or
//! noise around a jittered center, then smoothed with a Gaussian blur and
//! re-thresholded. The RNG is passed in, so a seed fully determines the mask.

use std::collections::VecDeque;

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::{Cell, OccupancyGrid, cells_of};
use crate::consts::MASK_THRESHOLD;

/// Attempts to place each region of the multi-region archetype
const MULTI_PLACEMENT_ATTEMPTS: usize = 50;

/// Shape families, roughly in order of difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    #[default]
    Blob,
    Kidney,
    Liver,
    Heart,
    Multi,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Blob => "blob",
            Archetype::Kidney => "kidney",
            Archetype::Liver => "liver",
            Archetype::Heart => "heart",
            Archetype::Multi => "multi",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "blob" => Some(Archetype::Blob),
            "kidney" => Some(Archetype::Kidney),
            "liver" => Some(Archetype::Liver),
            "heart" => Some(Archetype::Heart),
            "multi" | "multi_region" => Some(Archetype::Multi),
            _ => None,
        }
    }

    /// Like `parse`, but unknown names fall back to `Blob`
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            log::warn!("Unknown archetype '{}', falling back to blob", name);
            Archetype::Blob
        })
    }
}

/// Generate a mask from a seed. `None` draws a fresh seed (logged for replay).
pub fn generate_shape_seeded(archetype: Archetype, grid_size: usize, seed: Option<u64>) -> OccupancyGrid {
    let seed = seed.unwrap_or_else(|| {
        let seed = rand::random::<u64>();
        log::info!("Generating {} with random seed {}", archetype.as_str(), seed);
        seed
    });
    let mut rng = Pcg32::seed_from_u64(seed);
    generate_shape(archetype, grid_size, &mut rng)
}

/// Generate by archetype name; unknown names produce a blob
pub fn generate_shape_named(name: &str, grid_size: usize, seed: Option<u64>) -> OccupancyGrid {
    generate_shape_seeded(Archetype::from_name(name), grid_size, seed)
}

/// Generate a `grid_size x grid_size` mask drawing all randomness from `rng`
pub fn generate_shape<R: Rng + ?Sized>(archetype: Archetype, grid_size: usize, rng: &mut R) -> OccupancyGrid {
    if grid_size == 0 {
        return Array2::from_elem((0, 0), false);
    }
    let g = grid_size as i64;

    let (raw, sigma, center) = match archetype {
        Archetype::Blob => blob(g, rng),
        Archetype::Kidney => kidney(g, rng),
        Archetype::Liver => liver(g, rng),
        Archetype::Heart => heart(g, rng),
        Archetype::Multi => multi_region(g, rng),
    };

    let mask = finish(&raw, sigma, center);
    log::debug!(
        "Generated {} on {}x{} grid: {} cells",
        archetype.as_str(),
        grid_size,
        grid_size,
        mask.iter().filter(|v| **v).count()
    );
    mask
}

/// Float mask, blur sigma, nominal center (x, y)
type RawShape = (Array2<f32>, f32, (i64, i64));

fn jitter<R: Rng + ?Sized>(rng: &mut R, span: i64) -> i64 {
    rng.random_range(-span..=span)
}

/// Uniform integer in [lo, hi), or `lo` when the range is empty
fn range_or_low<R: Rng + ?Sized>(rng: &mut R, lo: i64, hi: i64) -> i64 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

fn grid_from_fn(g: i64, f: impl Fn(f32, f32) -> bool) -> Array2<f32> {
    let n = g as usize;
    Array2::from_shape_fn((n, n), |(y, x)| if f(x as f32, y as f32) { 1.0 } else { 0.0 })
}

fn ellipse_contains(x: f32, y: f32, cx: i64, cy: i64, rx: i64, ry: i64) -> bool {
    let nx = (x - cx as f32) / rx.max(1) as f32;
    let ny = (y - cy as f32) / ry.max(1) as f32;
    nx * nx + ny * ny <= 1.0
}

/// Jittered ellipse mixed with smoothed noise
fn blob<R: Rng + ?Sized>(g: i64, rng: &mut R) -> RawShape {
    let offset = (g / 4).max(1);
    let cx = g / 2 + jitter(rng, offset);
    let cy = g / 2 + jitter(rng, offset);

    let spread = g / 12;
    let rx = g / 5 + rng.random_range(-spread..=spread.max(1));
    let ry = g / 5 + rng.random_range(-spread..=spread.max(1));

    let ellipse = grid_from_fn(g, |x, y| ellipse_contains(x, y, cx, cy, rx, ry));

    let n = g as usize;
    let noise = Array2::from_shape_fn((n, n), |_| rng.random::<f32>());
    let noise = gaussian_filter(&noise, g as f32 / 8.0);
    let lo = noise.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = noise.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let noise = noise.mapv(|v| (v - lo) / (hi - lo + 1e-6));

    let shape = &ellipse * 0.7 + &noise.mapv(|v| if v > 0.5 { 0.3 } else { 0.0 });
    (shape, 1.5, (cx, cy))
}

/// Bean: ellipse with an exponential indent on the left side
fn kidney<R: Rng + ?Sized>(g: i64, rng: &mut R) -> RawShape {
    let offset = (g / 5).max(1);
    let cx = g / 2 + jitter(rng, offset);
    let cy = g / 2 + jitter(rng, offset);
    let sx = g as f32 / 4.5;
    let sy = g as f32 / 6.0;

    let shape = grid_from_fn(g, |x, y| {
        let nx = (x - cx as f32) / sx;
        let ny = (y - cy as f32) / sy;
        let ellipse = nx * nx + ny * ny;
        let indent = 0.3 * (-((nx + 0.5).powi(2) + ny * ny) * 3.0).exp();
        ellipse + indent < 1.0
    });
    (shape, 1.2, (cx, cy))
}

/// Lobed polar outline, larger on the right
fn liver<R: Rng + ?Sized>(g: i64, rng: &mut R) -> RawShape {
    use std::f32::consts::FRAC_PI_2;

    let offset = (g / 6).max(1);
    let cx = g / 2 + jitter(rng, offset);
    let cy = g / 2 + jitter(rng, offset);
    let base_radius = g as f32 / 5.0;

    let shape = grid_from_fn(g, |x, y| {
        let dx = x - cx as f32;
        let dy = y - cy as f32;
        let angle = dy.atan2(dx);
        let dist = (dx * dx + dy * dy).sqrt();

        let mut radius = base_radius
            * (1.0 + 0.25 * (angle * 2.0).cos() + 0.12 * (angle * 3.0).sin() + 0.08 * (angle * 5.0).cos());
        if angle > -FRAC_PI_2 && angle < FRAC_PI_2 {
            radius *= 1.15;
        }
        dist < radius
    });
    (shape, 1.5, (cx, cy))
}

/// Heart curve (x² + y² - 1)³ - x²y³ < 0, y pointing up
fn heart<R: Rng + ?Sized>(g: i64, rng: &mut R) -> RawShape {
    let offset = (g / 6).max(1);
    let cx = g / 2 + jitter(rng, offset);
    let cy = g / 2 + g / 10 + jitter(rng, offset);
    let scale = g as f32 / 4.5;

    let shape = grid_from_fn(g, |x, y| {
        let nx = (x - cx as f32) / scale;
        let ny = (cy as f32 - y) / scale;
        (nx * nx + ny * ny - 1.0).powi(3) - nx * nx * ny.powi(3) < 0.0
    });
    (shape, 1.2, (cx, cy))
}

/// 2-4 separated ellipses
fn multi_region<R: Rng + ?Sized>(g: i64, rng: &mut R) -> RawShape {
    let num_regions = rng.random_range(2..=4);
    let min_separation = (g / 5) as f32;
    let mut placed: Vec<(i64, i64, i64, i64)> = Vec::with_capacity(num_regions);

    for _ in 0..num_regions {
        let mut position = None;
        for _ in 0..MULTI_PLACEMENT_ATTEMPTS {
            let cx = range_or_low(rng, g / 4, 3 * g / 4);
            let cy = range_or_low(rng, g / 4, 3 * g / 4);
            let clear = placed.iter().all(|&(px, py, _, _)| {
                let (dx, dy) = ((cx - px) as f32, (cy - py) as f32);
                (dx * dx + dy * dy).sqrt() >= min_separation
            });
            if clear {
                position = Some((cx, cy));
                break;
            }
        }

        let Some((cx, cy)) = position else {
            continue;
        };
        let rx = range_or_low(rng, (g / 16).max(2), (g / 8).max(3));
        let ry = range_or_low(rng, (g / 16).max(2), (g / 8).max(3));
        placed.push((cx, cy, rx, ry));
    }

    let shape = grid_from_fn(g, |x, y| {
        placed
            .iter()
            .any(|&(cx, cy, rx, ry)| ellipse_contains(x, y, cx, cy, rx, ry))
    });
    let center = placed.first().map(|&(cx, cy, _, _)| (cx, cy)).unwrap_or((g / 2, g / 2));
    (shape, 1.2, center)
}

/// Blur and re-threshold; never returns an empty mask for a non-empty grid
fn finish(raw: &Array2<f32>, sigma: f32, center: (i64, i64)) -> OccupancyGrid {
    let smoothed = gaussian_filter(raw, sigma).mapv(|v| v > MASK_THRESHOLD);
    if smoothed.iter().any(|v| *v) {
        return smoothed;
    }

    // Smoothing can erase very small shapes on tiny grids
    let unsmoothed = raw.mapv(|v| v > MASK_THRESHOLD);
    if unsmoothed.iter().any(|v| *v) {
        log::debug!("Smoothing emptied the shape, keeping the unsmoothed mask");
        return unsmoothed;
    }

    let (rows, cols) = raw.dim();
    let mut mask = Array2::from_elem((rows, cols), false);
    if rows > 0 && cols > 0 {
        let col = center.0.clamp(0, cols as i64 - 1) as usize;
        let row = center.1.clamp(0, rows as i64 - 1) as usize;
        log::debug!("Empty shape, seeding a single cell at ({}, {})", row, col);
        mask[(row, col)] = true;
    }
    mask
}

/// Mirror index into [0, n) the way half-sample symmetric padding does (d c b a | a b c d | d c b a)
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-0.5 * (i * i) as f32 / (sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable Gaussian blur with reflective borders, kernel truncated at 4 sigma
pub fn gaussian_filter(input: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || input.is_empty() {
        return input.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (rows, cols) = input.dim();

    let horizontal = Array2::from_shape_fn((rows, cols), |(r, c)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * input[(r, reflect_index(c as isize + k as isize - radius, cols))])
            .sum::<f32>()
    });
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * horizontal[(reflect_index(r as isize + k as isize - radius, rows), c)])
            .sum::<f32>()
    })
}

/// Binary erosion with a 4-connected cross; cells outside the grid count as False
pub fn erode4(mask: &OccupancyGrid) -> OccupancyGrid {
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        mask[(r, c)]
            && r > 0
            && mask[(r - 1, c)]
            && r + 1 < rows
            && mask[(r + 1, c)]
            && c > 0
            && mask[(r, c - 1)]
            && c + 1 < cols
            && mask[(r, c + 1)]
    })
}

/// Occupied cells with at least one unoccupied 4-neighbour: `mask AND NOT erode4(mask)`
pub fn find_boundary(mask: &OccupancyGrid) -> OccupancyGrid {
    let eroded = erode4(mask);
    Array2::from_shape_fn(mask.dim(), |idx| mask[idx] && !eroded[idx])
}

/// Row-major positions of boundary cells
pub fn boundary_positions(boundary: &OccupancyGrid) -> Vec<Cell> {
    cells_of(boundary)
}

/// Cells to emit from: the boundary, or every occupied cell if the boundary is empty
pub fn emission_sources(mask: &OccupancyGrid) -> Vec<Cell> {
    let boundary = boundary_positions(&find_boundary(mask));
    if boundary.is_empty() {
        let all = cells_of(mask);
        if !all.is_empty() {
            log::warn!("Empty boundary, emitting from all {} occupied cells", all.len());
        }
        all
    } else {
        boundary
    }
}

/// Fill enclosed holes: every cell not 4-connected to the border through
/// unmarked cells becomes marked
pub fn fill_holes(mask: &OccupancyGrid) -> OccupancyGrid {
    let (rows, cols) = mask.dim();
    let mut outside = Array2::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();

    for r in 0..rows {
        for c in 0..cols {
            let on_border = r == 0 || c == 0 || r + 1 == rows || c + 1 == cols;
            if on_border && !mask[(r, c)] {
                outside[(r, c)] = true;
                queue.push_back((r, c));
            }
        }
    }

    while let Some((r, c)) = queue.pop_front() {
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < rows && nc < cols && !mask[(nr, nc)] && !outside[(nr, nc)] {
                outside[(nr, nc)] = true;
                queue.push_back((nr, nc));
            }
        }
    }

    outside.mapv(|v| !v)
}
