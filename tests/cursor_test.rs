//! Integration tests for the Read + Seek adapter and SQLite header parsing

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use httpvfs::common::ReaderConfig;
use httpvfs::sqlite::DatabaseHeader;
use httpvfs::testing::{build_header, MemoryTransport};
use httpvfs::vfs::{ReaderCursor, VirtualFileReader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

const URL: &str = "http://example.com/test.db";

fn database_image(page_size: u32, pages: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut image: Vec<u8> = (0..page_size as usize * pages as usize)
        .map(|_| rng.gen())
        .collect();
    image[..100].copy_from_slice(&build_header(page_size, pages));
    image
}

#[test]
fn test_cursor_matches_local_file() {
    let image = database_image(1024, 12);

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&image).unwrap();
    let mut local = File::open(temp_file.path()).unwrap();

    let transport = Arc::new(MemoryTransport::new(image.clone()));
    let reader = VirtualFileReader::with_transport(
        transport,
        URL,
        ReaderConfig::new().with_page_size(1024),
    )
    .unwrap();
    let mut remote = ReaderCursor::new(&reader);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let pos = match rng.gen_range(0..3) {
            0 => SeekFrom::Start(rng.gen_range(0..image.len() as u64 + 100)),
            1 => SeekFrom::End(-rng.gen_range(0..image.len() as i64)),
            _ => SeekFrom::Current(rng.gen_range(-50..50)),
        };
        let local_pos = local.seek(pos);
        let remote_pos = remote.seek(pos);
        assert_eq!(local_pos.is_ok(), remote_pos.is_ok());
        if let (Ok(a), Ok(b)) = (&local_pos, &remote_pos) {
            assert_eq!(a, b);
        } else {
            // Keep both cursors aligned after a rejected seek
            let here = remote.position();
            local.seek(SeekFrom::Start(here)).unwrap();
        }

        let len = rng.gen_range(0..3000);
        let mut local_buf = vec![0u8; len];
        let mut remote_buf = vec![0u8; len];
        let local_n = local.read(&mut local_buf).unwrap();
        let remote_n = remote.read(&mut remote_buf).unwrap();
        assert_eq!(local_n, remote_n);
        assert_eq!(&local_buf[..local_n], &remote_buf[..remote_n]);
    }
}

#[test]
fn test_header_read_from_remote_database() {
    let image = database_image(4096, 10);
    let transport = Arc::new(MemoryTransport::new(image));
    let reader = VirtualFileReader::with_transport(
        transport.clone(),
        URL,
        ReaderConfig::new().with_page_size(4096),
    )
    .unwrap();

    let header = DatabaseHeader::read_from(&reader).unwrap();

    assert_eq!(header.page_size, 4096);
    assert_eq!(header.database_pages, 10);
    assert_eq!(Some(header.database_size()), reader.size());
    // Only the first page crossed the network
    assert_eq!(transport.range_requests(), 1);
    assert_eq!(reader.stats().total_bytes, 4096);
}
