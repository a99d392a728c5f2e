use std::time::Instant;

use anyhow::Result;
use sizew_cache::{get_cache_path_custom, Store};

fn main() -> Result<()> {
    env_logger::init();

    let program_start = Instant::now();
    let args = sizew_core::parse_args();

    let cache_path = get_cache_path_custom(args.cache_dir.as_deref())?;

    let cache_load_start = Instant::now();
    let mut store = Store::load(&cache_path);
    let cache_load_elapsed = cache_load_start.elapsed();

    let measure_start = Instant::now();
    let total = sizew_engine::measure_directory_with_store(
        &args.path,
        args.recursive,
        args.bypass_cache,
        args.recalculate,
        &mut store,
    );
    let measure_elapsed = measure_start.elapsed();

    let save_start = Instant::now();
    store.save(&cache_path)?;
    let save_elapsed = save_start.elapsed();

    println!("{total}");

    if args.stats {
        let total_elapsed = program_start.elapsed();
        print_stats_summary(
            &args.path,
            total,
            cache_load_elapsed,
            measure_elapsed,
            save_elapsed,
            &cache_path,
            total_elapsed,
        );
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    format!("{:.3} ms", duration.as_secs_f64() * 1000.0)
}

fn print_stats_summary(
    scan_root: &std::path::Path,
    total_bytes: u64,
    cache_load_time: std::time::Duration,
    measure_time: std::time::Duration,
    save_time: std::time::Duration,
    cache_path: &std::path::Path,
    total_time: std::time::Duration,
) {
    eprintln!("\n{}", "=".repeat(60));
    eprintln!("{:^60}", "SIZEW STATS");
    eprintln!("{}", "=".repeat(60));

    eprintln!("\n{:<24} {}", "Scan Root:", scan_root.display());
    eprintln!("{:<24} {}", "Total Bytes:", total_bytes);

    eprintln!("\n{:<24} {}", "Cache Load Time:", format_duration(cache_load_time));
    eprintln!("{:<24} {}", "Measure Time:", format_duration(measure_time));
    eprintln!("{:<24} {}", "Cache Save Time:", format_duration(save_time));
    eprintln!("{:<24} {}", "Total Time:", format_duration(total_time));

    eprintln!("\n{:<24} {}", "Cache Location:", cache_path.display());
    eprintln!("{}", "=".repeat(60));
}
