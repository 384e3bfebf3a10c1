//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

use paper_kiosk::app::{
    derive_archive_password, ArchiveClient, Catalog, ClientConfig, CoordinatorConfig, FixedClock,
    SecureExtractor, SharedCatalog, StorageLayout, SyncCoordinator,
};

pub const SECRET: &str = "s3cret";

/// Calendar date shorthand
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bytes of an AES-256 archive for `key` with `page_count` pages
///
/// The archive is encrypted with the password derived from `password_base`
/// so tests can produce archives with a wrong key.
pub fn page_archive(password_base: &str, page_count: u32) -> Vec<u8> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fixture.zip");
    let password = derive_archive_password(SECRET, password_base);

    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .with_aes_encryption(AesMode::Aes256, &password);

    writer.start_file("info.json", options).unwrap();
    write!(
        writer,
        r#"{{"page_count": {}, "dpi_low": 72.0, "dpi_high": 288.0, "edition": "Stadt"}}"#,
        page_count
    )
    .unwrap();
    for page in 1..=page_count {
        for suffix in ["lo", "hi"] {
            writer
                .start_file(format!("{:02}_{}.png", page, suffix), options)
                .unwrap();
            writer.write_all(b"\x89PNG").unwrap();
        }
    }
    writer.finish().unwrap();

    fs::read(&path).unwrap()
}

/// Storage, catalog and coordinator rooted in a temporary directory
pub struct Kiosk {
    pub temp_dir: TempDir,
    pub layout: StorageLayout,
    pub catalog: SharedCatalog,
    pub coordinator: SyncCoordinator,
}

impl Kiosk {
    /// Kiosk syncing from `host` on the given day
    pub fn new(host: &str, today: NaiveDate, config: CoordinatorConfig) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp_dir.path());
        let catalog = Catalog::open(layout.catalog_file()).unwrap().into_shared();
        let client =
            ArchiveClient::new(host, &ClientConfig::default(), layout.downloads_dir()).unwrap();
        let extractor = SecureExtractor::new(SECRET, layout.renderings_dir());
        let coordinator = SyncCoordinator::new(
            config,
            client,
            extractor,
            catalog.clone(),
            Arc::new(FixedClock(today)),
        );

        Self {
            temp_dir,
            layout,
            catalog,
            coordinator,
        }
    }

    /// Root of the kiosk's storage
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}
