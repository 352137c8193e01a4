use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;

/// Write a synthetic ASV sonde export for demos and manual testing.
#[derive(Parser, Debug)]
#[command(name = "generate-sample")]
struct Args {
    /// Output CSV path
    #[arg(short, long, default_value = "data/raw.csv")]
    output: PathBuf,

    /// Number of observations
    #[arg(short, long, default_value_t = 2000)]
    rows: usize,

    /// Number of sensor spikes to inject
    #[arg(long, default_value_t = 12)]
    spikes: usize,

    /// Number of rows with a dropped salinity reading
    #[arg(long, default_value_t = 5)]
    gaps: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let start = NaiveDate::from_ymd_opt(2022, 10, 7)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .context("invalid start time")?;

    let spike_rows: Vec<usize> = (0..args.spikes).map(|_| rng.below(args.rows)).collect();
    let gap_rows: Vec<usize> = (0..args.gaps).map(|_| rng.below(args.rows)).collect();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    // Same header layout as the sonde export, padding included.
    writer.write_record([
        "Latitude",
        "Longitude",
        "Date m/d/y   ",
        "Time hh:mm:ss",
        "Temperature (c)",
        "Salinity (ppt)",
        "ODO mg/L",
    ])?;

    // Slow drift along a survey track in Biscayne Bay
    let (mut lat, mut lon) = (25.9132, -80.1380);
    for row in 0..args.rows {
        lat += rng.gauss(0.0, 0.00002);
        lon += rng.gauss(0.0, 0.00002);
        let ts = start + Duration::seconds(row as i64);

        let mut temperature = rng.gauss(28.4, 0.35);
        let salinity = rng.gauss(36.1, 0.25);
        let mut odo = rng.gauss(6.4, 0.3);
        if spike_rows.contains(&row) {
            if rng.next_f64() < 0.5 {
                temperature += 15.0;
            } else {
                odo = 0.0;
            }
        }
        let salinity = if gap_rows.contains(&row) {
            String::new()
        } else {
            format!("{salinity:.2}")
        };

        writer.write_record([
            format!("{lat:.6}"),
            format!("{lon:.6}"),
            ts.format("%m/%d/%y").to_string(),
            ts.format("%H:%M:%S").to_string(),
            format!("{temperature:.2}"),
            salinity,
            format!("{odo:.2}"),
        ])?;
    }
    writer.flush()?;

    println!(
        "Wrote {} observations ({} spikes, {} gaps) to {}",
        args.rows,
        args.spikes,
        args.gaps,
        args.output.display()
    );
    Ok(())
}
