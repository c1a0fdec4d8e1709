use chrono::Local;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `$XDG_DATA_HOME/psieve`, falling back to `$HOME/.local/share/psieve`
pub fn get_data_dir() -> Option<PathBuf> {
    let xdg_data_home = env::var("XDG_DATA_HOME")
        .ok()
        .and_then(|path| {
            if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            }
        })
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share"))
        })?;

    Some(xdg_data_home.join("psieve"))
}

/// Write `primes` to `<data_dir>/primes.txt`, one per line, replacing any previous run.
/// Returns the path written.
pub fn save_all_primes(data_dir: &Path, primes: &[usize]) -> std::io::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;

    let primes_path = data_dir.join("primes.txt");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&primes_path)?;

    let mut writer = BufWriter::with_capacity(256 * 1024, file); // 256KB
    let mut itoa_buf = itoa::Buffer::new();
    for &prime in primes {
        writer.write_all(itoa_buf.format(prime).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(primes_path)
}

/// Append one line per run to `<data_dir>/execution_log.txt`
pub fn log_execution(
    data_dir: &Path,
    subcommand: &str,
    limit: i64,
    strategy: &str,
    workers: usize,
    duration_us: u128,
) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)?;

    let log_path = data_dir.join("execution_log.txt");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    writeln!(
        file,
        "{} | {} | {} | {} | {} workers | {}us",
        timestamp, subcommand, limit, strategy, workers, duration_us
    )?;

    Ok(())
}
