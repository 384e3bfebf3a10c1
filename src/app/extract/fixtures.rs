//! Encrypted archive fixtures for tests

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

/// Metadata document for an archive with `page_count` pages
pub(crate) fn metadata_json(page_count: u32) -> String {
    format!(
        r#"{{"page_count": {}, "dpi_low": 50.0, "dpi_high": 200.0, "title": "Hannoversche"}}"#,
        page_count
    )
}

/// Write an AES-256 encrypted zip with the given members
pub(crate) fn write_archive(path: &Path, password: &str, members: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .with_aes_encryption(AesMode::Aes256, password);

    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Write a complete archive: metadata plus both renderings of every page
pub(crate) fn write_page_archive(path: &Path, password: &str, page_count: u32) {
    let info = metadata_json(page_count);
    let mut names = Vec::new();
    for page in 1..=page_count {
        names.push(format!("{:02}_lo.png", page));
        names.push(format!("{:02}_hi.png", page));
    }

    let mut members: Vec<(&str, &[u8])> = vec![("info.json", info.as_bytes())];
    members.extend(names.iter().map(|name| (name.as_str(), b"png".as_slice())));
    write_archive(path, password, &members);
}
