use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::Vec3;
use image::{Rgb, RgbImage};
use soillib::node::{Array, ArrayData};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Installs a formatting subscriber. The level comes from `SOILLIB_LOG` (default `info`).
pub fn init_tracing() {
    let level = std::env::var("SOILLIB_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// A 2D scalar image. Rows follow the first index axis, columns the second.
#[derive(Clone, Debug)]
pub struct Plane {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f32>,
}

/// A 2D image of 3-vectors, laid out like [`Plane`].
#[derive(Clone, Debug)]
pub struct VectorPlane {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<Vec3>,
}

impl Plane {
    /// Scalar export of a 2D node. Unset integer cells become NaN.
    pub fn from_array(array: &Array) -> Result<Self> {
        let &[rows, cols] = array.shape() else {
            bail!("expected a 2D scalar array, got shape {:?}", array.shape());
        };
        let values = match array.data() {
            ArrayData::Int(v) => v
                .iter()
                .map(|&x| if x == i32::MIN { f32::NAN } else { x as f32 })
                .collect(),
            ArrayData::Float32(v) => v.clone(),
            ArrayData::Float64(v) => v.iter().map(|&x| x as f32).collect(),
        };
        Ok(Self { rows, cols, values })
    }

    /// Finite minimum and maximum, if any cell is finite.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl VectorPlane {
    pub fn from_array(array: &Array) -> Result<Self> {
        let (&[rows, cols, 3], ArrayData::Float32(data)) = (array.shape(), array.data()) else {
            bail!(
                "expected a 2D vec3 array, got shape {:?} of {}",
                array.shape(),
                array.dtype()
            );
        };
        let values = data
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { rows, cols, values })
    }
}

/// Color ramps used by the demos.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    Gray,
    Terrain,
    Heat,
}

const NAN_COLOR: [u8; 3] = [24, 24, 32];

impl Colormap {
    fn stops(self) -> &'static [[f32; 3]] {
        match self {
            Colormap::Gray => &[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
            Colormap::Terrain => &[
                [0.20, 0.20, 0.60],
                [0.00, 0.60, 1.00],
                [0.00, 0.80, 0.40],
                [1.00, 1.00, 0.60],
                [0.50, 0.36, 0.33],
                [1.00, 1.00, 1.00],
            ],
            Colormap::Heat => &[
                [0.00, 0.00, 0.02],
                [0.33, 0.07, 0.47],
                [0.80, 0.20, 0.35],
                [0.99, 0.60, 0.25],
                [0.99, 0.99, 0.75],
            ],
        }
    }

    /// Color of `t` in `[0, 1]`.
    pub fn sample(self, t: f32) -> [u8; 3] {
        if !t.is_finite() {
            return NAN_COLOR;
        }
        let stops = self.stops();
        let x = t.clamp(0.0, 1.0) * (stops.len() - 1) as f32;
        let i = (x.floor() as usize).min(stops.len() - 2);
        let f = x - i as f32;
        let (a, b) = (stops[i], stops[i + 1]);
        std::array::from_fn(|c| ((a[c] + (b[c] - a[c]) * f) * 255.0).round() as u8)
    }
}

fn save(image: RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {}.", path.display());
    Ok(())
}

/// Normalizes `plane` to its finite range and writes it through `colormap`.
pub fn save_scalar_png(plane: &Plane, colormap: Colormap, path: impl AsRef<Path>) -> Result<()> {
    let (lo, hi) = plane.range().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let image = RgbImage::from_fn(plane.cols as u32, plane.rows as u32, |px, py| {
        let v = plane.values[py as usize * plane.cols + px as usize];
        Rgb(colormap.sample((v - lo) / span))
    });
    save(image, path.as_ref())
}

/// Writes unit normals as `rgb = n * 0.5 + 0.5`.
pub fn save_normal_png(normals: &VectorPlane, path: impl AsRef<Path>) -> Result<()> {
    let image = RgbImage::from_fn(normals.cols as u32, normals.rows as u32, |px, py| {
        let n = normals.values[py as usize * normals.cols + px as usize];
        if !n.is_finite() {
            return Rgb(NAN_COLOR);
        }
        let c = (n * 0.5 + Vec3::splat(0.5)).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        Rgb([c.x as u8, c.y as u8, c.z as u8])
    });
    save(image, path.as_ref())
}

/// Diffuse relief shading with flat-toning of low, steep terrain.
///
/// Light comes from `(1, 1, 2)`. Diffuse is `0.05 + 0.9 * dot(n, light)`; it is blended
/// toward a flat tone of 0.9 by `(1 - n.z) * (1 - h^2)`, with `h` the normalized height.
pub fn relief_shade(height: &Plane, normals: &VectorPlane) -> Result<Plane> {
    if height.rows != normals.rows || height.cols != normals.cols {
        bail!(
            "height is {}x{} but normals are {}x{}",
            height.rows,
            height.cols,
            normals.rows,
            normals.cols
        );
    }
    let (lo, hi) = height.range().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let light = Vec3::new(1.0, 1.0, 2.0).normalize();
    let values = height
        .values
        .iter()
        .zip(&normals.values)
        .map(|(&h, &n)| {
            let h = (h - lo) / span;
            let diffuse = 0.05 + 0.9 * n.dot(light);
            let weight = (1.0 - n.z) * (1.0 - h * h);
            (1.0 - weight) * diffuse + weight * 0.9
        })
        .collect();
    Ok(Plane {
        rows: height.rows,
        cols: height.cols,
        values,
    })
}
