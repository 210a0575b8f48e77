//! httpvfs command-line reader
//!
//! Opens a remote file, prints its SQLite header when it has one, reads a
//! byte range and reports how much of the file crossed the network.

use clap::Parser;
use tracing::{info, warn};

use httpvfs::common::{ReaderConfig, DEFAULT_FETCH_WORKERS, DEFAULT_PAGE_SIZE};
use httpvfs::sqlite::DatabaseHeader;
use httpvfs::vfs::VirtualFileReader;

#[derive(Parser, Debug)]
#[command(name = "httpvfs")]
#[command(about = "Read ranges of a remote SQLite file over HTTP")]
struct Args {
    /// URL of the remote file
    url: String,

    /// Chunk size in bytes; match the database page size for best results
    #[arg(short = 'c', long, default_value_t = DEFAULT_PAGE_SIZE)]
    chunk_size: usize,

    /// File size override for hosts that do not report Content-Length
    #[arg(short = 's', long)]
    file_size: Option<u64>,

    /// Maximum cached pages (unbounded when omitted)
    #[arg(long)]
    cache_pages: Option<usize>,

    /// Number of parallel fetch workers
    #[arg(short = 'w', long, default_value_t = DEFAULT_FETCH_WORKERS)]
    workers: usize,

    /// Offset of the range to read
    #[arg(short = 'o', long, default_value_t = 0)]
    offset: u64,

    /// Length of the range to read
    #[arg(short = 'l', long, default_value_t = 0)]
    length: u64,
}

fn hex_dump(offset: u64, bytes: &[u8]) {
    for (i, line) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:08x}  {:<47}  {}", offset + (i * 16) as u64, hex.join(" "), ascii);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ReaderConfig::new()
        .with_page_size(args.chunk_size)
        .with_fetch_workers(args.workers);
    if let Some(size) = args.file_size {
        config = config.with_file_size(size);
    }
    if let Some(pages) = args.cache_pages {
        config = config.with_cache_capacity(pages);
    }

    let reader = VirtualFileReader::open(&args.url, config)?;

    match reader.size() {
        Some(size) => println!("File size: {} bytes", size),
        None => {
            warn!("Server did not report the file size; pass --file-size");
            return Ok(());
        }
    }

    match DatabaseHeader::read_from(&reader) {
        Ok(header) => {
            println!("SQLite {} database", header.sqlite_version_string());
            println!("  - Page size: {} bytes", header.page_size);
            println!("  - Pages: {}", header.database_pages);
            println!("  - Encoding: {}", header.text_encoding);
            println!("  - Journal mode: {}", if header.is_wal() { "WAL" } else { "rollback" });
            if header.page_size as usize != args.chunk_size {
                info!(
                    "Chunk size {} differs from the database page size {}",
                    args.chunk_size, header.page_size
                );
            }
        }
        Err(e) => info!("Not reading a SQLite header: {}", e),
    }

    if args.length > 0 {
        let bytes = reader.read(args.offset, args.length)?;
        println!();
        hex_dump(args.offset, &bytes);
    }

    let stats = reader.stats();
    let total = reader.size().unwrap_or(0);
    println!(
        "\nRead {} of {} bytes ({:.2}%) in {} requests; cache hit rate {:.0}%",
        stats.total_bytes,
        total,
        if total > 0 { stats.total_bytes as f64 * 100.0 / total as f64 } else { 0.0 },
        stats.total_requests,
        stats.hit_rate() * 100.0
    );
    if stats.probe_requests > 0 {
        println!("Size discovery took {} extra requests", stats.probe_requests);
    }

    Ok(())
}
