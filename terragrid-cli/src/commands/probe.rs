//! `probe` command: compute one column and summarize what it holds.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::info;

use terragrid::column::{keys, ColumnData, ColumnDataCache};
use terragrid::config::ConfigFile;
use terragrid::coord::ColumnPos;
use terragrid::dataop::WorkerPool;
use terragrid::earth::{earth_generator, EarthContext};
use terragrid::raster::Raster;
use terragrid::source::{ReqwestClient, TileCache};

use crate::error::CliError;

#[derive(Debug, clap::Args)]
pub struct ProbeArgs {
    /// Column X (blocks / 16)
    #[arg(long, allow_hyphen_values = true)]
    pub x: i32,

    /// Column Z (blocks / 16)
    #[arg(long, allow_hyphen_values = true)]
    pub z: i32,

    /// Remote index URL, overriding [remote] index_url
    #[arg(long)]
    pub index_url: Option<String>,
}

pub async fn run(args: ProbeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let world = config
        .world_scale()
        .map_err(|e| CliError::Config(e.to_string()))?;
    let client = ReqwestClient::with_options(&config.remote.user_agent, config.remote.timeout_secs)
        .map_err(CliError::Client)?;
    let tiles = TileCache::new(&config.cache.directory, Arc::new(client));
    let pool = WorkerPool::new(config.pool.cpu_threads, "cpu");

    let index_url = args.index_url.as_deref().or(config.remote.index_url.as_deref());
    let ctx = EarthContext::load(world, tiles.clone(), pool, index_url).await;

    let columns = ColumnDataCache::new(
        earth_generator(&ctx, config.memo_config()),
        config.column_cache_config(),
        Handle::current(),
    );

    let pos = ColumnPos::new(args.x, args.z);
    let started = Instant::now();
    let data = columns.get(pos).await.map_err(CliError::Column)?;
    info!(column = %pos, elapsed_ms = started.elapsed().as_millis() as u64, "Probe complete");

    print_column(&data);

    let stats = tiles.stats();
    println!();
    println!(
        "Tiles: {} fetched, {} from disk, {} coalesced, {} known absent",
        stats.fetches, stats.disk_hits, stats.coalesced_waits, stats.absent_hits
    );
    Ok(())
}

fn print_column(data: &ColumnData) {
    let view = data.view();
    println!(
        "{} (blocks x {}..{}, z {}..{})",
        data.pos(),
        view.x(),
        view.max_x(),
        view.y(),
        view.max_y()
    );
    println!();

    for (name, present) in data.summary() {
        println!("  {:<18} {}", name, if present { "present" } else { "absent" });
    }
    println!();

    if let Some(elevation) = data.get::<keys::Elevation>() {
        println!("  elevation        {}", range(elevation, |v| v as f64, "m"));
    }
    if let Some(cover) = data.get::<keys::Cover>() {
        println!("  cover            {}", histogram(cover.data().iter().map(|c| c.to_string())));
    }
    if let Some(landform) = data.get::<keys::Landform>() {
        println!("  landform         {}", histogram(landform.data().iter().map(|l| l.to_string())));
    }
    if let Some(min) = data.get::<keys::MinTemperature>() {
        println!("  min temperature  {}", range(min, |v| v as f64, "°C"));
    }
    if let Some(mean) = data.get::<keys::MeanTemperature>() {
        println!("  mean temperature {}", range(mean, |v| v as f64, "°C"));
    }
    if let Some(rain) = data.get::<keys::AnnualRainfall>() {
        println!("  annual rainfall  {}", range(rain, |v| v as f64, "mm"));
    }
    if let Some(water) = data.get::<keys::Water>() {
        let wet = water.data().iter().filter(|&&w| w).count();
        println!("  water            {}/{} cells", wet, water.data().len());
    }
}

fn range<T: Copy>(raster: &Raster<T>, value: impl Fn(T) -> f64, unit: &str) -> String {
    let values: Vec<f64> = raster.data().iter().map(|&v| value(v)).collect();
    if values.is_empty() {
        return "-".to_string();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    format!("min {:.1} / mean {:.1} / max {:.1} {}", min, mean, max, unit)
}

fn histogram(values: impl Iterator<Item = String>) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
        .iter()
        .map(|(name, count)| format!("{} x{}", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_formats_stats() {
        let raster = Raster::from_vec(2, 1, vec![10i16, 20]).unwrap();
        assert_eq!(range(&raster, |v| v as f64, "m"), "min 10.0 / mean 15.0 / max 20.0 m");
    }

    #[test]
    fn test_histogram_orders_by_count() {
        let values = ["sea", "land", "land"].iter().map(|s| s.to_string());
        assert_eq!(histogram(values), "land x2, sea x1");
    }
}
