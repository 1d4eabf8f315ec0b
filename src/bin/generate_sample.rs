use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use npy_peek::data::model::{DType, Field, LoadedArray};
use npy_peek::data::writer::write_npy;

/// Write a set of demonstration .npy files
#[derive(Parser, Debug)]
#[command(name = "generate-sample", about, long_about = None)]
struct Args {
    /// Directory to write the sample files into
    #[arg(default_value = "samples")]
    out_dir: PathBuf,

    /// Seed for the pseudo-random values
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// SplitMix64: one `u64` of state, deterministic for a given seed.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    /// Normal deviate via Box-Muller; `1 - unit()` keeps the log argument positive.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let radius = (-2.0 * (1.0 - self.unit()).ln()).sqrt();
        let angle = std::f64::consts::TAU * self.unit();
        mean + std_dev * radius * angle.cos()
    }
}

/// 1-D intensity profile: three peaks plus noise.
fn profile(rng: &mut SplitMix64) -> Result<LoadedArray> {
    let peaks = [(120.0, 15.0, 0.8), (300.0, 30.0, 0.5), (420.0, 8.0, 1.2)];
    let values: Vec<f64> = (0..500)
        .map(|i| {
            let x = i as f64;
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| amp * (-0.5 * ((x - mu) / sigma).powi(2)).exp())
                .sum();
            signal + rng.normal(0.0, 0.01)
        })
        .collect();
    LoadedArray::from_elements(vec![values.len()], &values)
}

/// 2-D integer grid, 50 × 20.
fn grid() -> Result<LoadedArray> {
    let values: Vec<i32> = (0..50 * 20).map(|i| (i / 20) * 100 + i % 20).collect();
    LoadedArray::from_elements(vec![50, 20], &values)
}

/// 3-D float cube, 2 × 3 × 4.
fn cube(rng: &mut SplitMix64) -> Result<LoadedArray> {
    let values: Vec<f32> = (0..24).map(|_| rng.uniform(-1.0, 1.0) as f32).collect();
    LoadedArray::from_elements(vec![2, 3, 4], &values)
}

/// Small label vector with few distinct values.
fn labels(rng: &mut SplitMix64) -> Result<LoadedArray> {
    let values: Vec<u8> = (0..200).map(|_| (rng.next_u64() % 6) as u8).collect();
    LoadedArray::from_elements(vec![values.len()], &values)
}

fn mask(rng: &mut SplitMix64) -> Result<LoadedArray> {
    let values: Vec<bool> = (0..64).map(|_| rng.unit() < 0.3).collect();
    LoadedArray::from_elements(vec![8, 8], &values)
}

/// Record table of synthetic stars: position, magnitude, id and unit vector.
fn stars(rng: &mut SplitMix64) -> Result<LoadedArray> {
    let dtype = DType::Record(vec![
        Field::new("ra", DType::Float { width: 8 }),
        Field::new("dec", DType::Float { width: 8 }),
        Field::new("mag", DType::Float { width: 4 }),
        Field::new("id", DType::Int { width: 4, signed: true }),
        Field::new("xyz", DType::Float { width: 4 }).with_shape(vec![3]),
    ]);
    let count = 40;
    let mut data = Vec::with_capacity(count * dtype.itemsize());
    for id in 0..count as i32 {
        let ra = rng.uniform(0.0, 360.0);
        let dec = rng.uniform(-90.0, 90.0);
        let mag = rng.normal(6.0, 1.5) as f32;
        data.extend_from_slice(&ra.to_le_bytes());
        data.extend_from_slice(&dec.to_le_bytes());
        data.extend_from_slice(&mag.to_le_bytes());
        data.extend_from_slice(&id.to_le_bytes());

        let (ra, dec) = (ra.to_radians(), dec.to_radians());
        for v in [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()] {
            data.extend_from_slice(&(v as f32).to_le_bytes());
        }
    }
    LoadedArray::new(dtype, vec![count], data)
}

fn empty() -> Result<LoadedArray> {
    LoadedArray::from_elements::<f64>(vec![0, 5], &[])
}

fn save(dir: &Path, name: &str, array: &LoadedArray) -> Result<()> {
    let path = dir.join(name);
    write_npy(&path, array).with_context(|| format!("writing {name}"))?;
    println!(
        "Wrote {} ({} {} elements)",
        path.display(),
        array.len(),
        array.dtype()
    );
    Ok(())
}

/// Build every sample array from one seed and write it under `dir`.
fn write_samples(dir: &Path, seed: u64) -> Result<()> {
    let mut rng = SplitMix64(seed);
    save(dir, "profile_1d.npy", &profile(&mut rng)?)?;
    save(dir, "grid_2d.npy", &grid()?)?;
    save(dir, "cube_3d.npy", &cube(&mut rng)?)?;
    save(dir, "labels.npy", &labels(&mut rng)?)?;
    save(dir, "mask.npy", &mask(&mut rng)?)?;
    save(dir, "stars.npy", &stars(&mut rng)?)?;
    save(dir, "empty.npy", &empty()?)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    write_samples(&args.out_dir, args.seed)
}
