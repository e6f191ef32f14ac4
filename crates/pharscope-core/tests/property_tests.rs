//! Property-based tests for entry path validation, the side-channel record,
//! and archive parsing.
//!
//! These tests use proptest to generate arbitrary inputs and verify the
//! properties hold across a wide range of cases.

#![allow(clippy::unwrap_used)]

use pharscope_core::ArchiveMetadata;
use pharscope_core::CompressionAlgorithm;
use pharscope_core::FileEntry;
use pharscope_core::SideChannel;
use pharscope_core::SignatureAlgorithm;
use pharscope_core::extraction::EntryPath;
use pharscope_core::metadata::SignatureInfo;
use pharscope_core::phar::PharArchive;
use pharscope_core::test_utils::PharBuilder;
use proptest::prelude::*;
use std::path::Component;
use std::path::Path;

fn compression() -> impl Strategy<Value = CompressionAlgorithm> {
    prop::sample::select(CompressionAlgorithm::ALL.to_vec())
}

fn file_entry() -> impl Strategy<Value = FileEntry> {
    (
        "[a-z]{1,8}(/[a-z0-9_.]{1,8}){0,3}",
        compression(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(path, compression, compressed, size, crc32)| FileEntry {
            path,
            compression,
            compressed_size: u64::from(compressed),
            size: u64::from(size),
            crc32,
        })
}

fn metadata() -> impl Strategy<Value = ArchiveMetadata> {
    let signature = prop::option::of(
        ("[0-9A-F]{8,128}", prop::sample::select(SignatureAlgorithm::ALL.to_vec())).prop_map(
            |(hash, algo)| SignatureInfo {
                hash,
                hash_type: algo.label().to_string(),
            },
        ),
    );
    (
        signature,
        prop::option::of(any::<String>()),
        prop::option::of("[0-9]\\.[0-9]\\.[0-9]"),
        prop::option::of(any::<String>()),
        prop::option::of(any::<String>()),
    )
        .prop_map(
            |(signature, stub, version, normalized_metadata, pub_key_content)| ArchiveMetadata {
                signature,
                stub,
                version,
                normalized_metadata,
                pub_key_content,
            },
        )
}

proptest! {
    /// Any path with .. should be rejected.
    #[test]
    fn prop_parent_traversal_rejected(
        prefix in "([a-z]+/){0,5}",
        suffix in "([a-z]+/?){0,5}"
    ) {
        let name = format!("{prefix}../{suffix}");
        prop_assert!(EntryPath::validate(&name, 32).is_err());
    }

    /// Absolute paths are rejected.
    #[test]
    fn prop_absolute_rejected(rest in "[a-z]{1,10}(/[a-z]{1,10}){0,4}") {
        let path = format!("/{rest}");
        prop_assert!(EntryPath::validate(&path, 32).is_err());
    }

    /// Valid relative paths are accepted and stay relative.
    #[test]
    fn prop_valid_relative_paths_accepted(
        components in prop::collection::vec("[a-zA-Z0-9_-]{1,20}", 1..5)
    ) {
        let path = EntryPath::validate(&components.join("/"), 32).unwrap();
        prop_assert!(path.as_path().is_relative());
        prop_assert!(path
            .as_path()
            .components()
            .all(|c| matches!(c, Component::Normal(_))));
        prop_assert_eq!(path.as_path().components().count(), components.len());
    }

    /// Resolved paths always stay under the root.
    #[test]
    fn prop_resolve_stays_under_root(name in "(\\./)?([a-z.]{1,6}/){0,4}[a-z]{1,6}") {
        if let Ok(path) = EntryPath::validate(&name, 32) {
            let root = Path::new("/srv/extract");
            prop_assert!(path.resolve(root).starts_with(root));
        }
    }

    /// Paths deeper than the limit are rejected.
    #[test]
    fn prop_excessive_depth_rejected(max in 1usize..8, extra in 1usize..4) {
        let name = vec!["d"; max + extra].join("/");
        prop_assert!(EntryPath::validate(&name, max).is_err());
        let name = vec!["d"; max].join("/");
        prop_assert!(EntryPath::validate(&name, max).is_ok());
    }

    /// NUL bytes anywhere in a name are rejected.
    #[test]
    fn prop_nul_rejected(before in "[a-z]{0,8}", after in "[a-z]{0,8}") {
        let path = format!("{before}\0{after}");
        prop_assert!(EntryPath::validate(&path, 32).is_err());
    }

    /// The side-channel record survives a JSON round trip in every field.
    #[test]
    fn prop_side_channel_round_trip(
        metadata in metadata(),
        files in prop::collection::vec(file_entry(), 0..8)
    ) {
        let record = SideChannel { metadata, files };
        let json = record.to_json().unwrap();
        prop_assert_eq!(SideChannel::from_json(&json).unwrap(), record);
    }

    /// Built archives parse back with the same file table.
    #[test]
    fn prop_built_archive_parses(
        contents in prop::collection::vec(
            (compression(), prop::collection::vec(any::<u8>(), 0..256)),
            1..6
        ),
        signed in any::<bool>()
    ) {
        let mut builder = PharBuilder::new();
        for (i, (algo, data)) in contents.iter().enumerate() {
            builder = builder.file(&format!("f{i}.bin"), data, *algo);
        }
        if signed {
            builder = builder.signed_with(SignatureAlgorithm::Sha256);
        }
        let archive = PharArchive::parse(Path::new("prop.phar"), builder.build()).unwrap();

        prop_assert_eq!(archive.entries().len(), contents.len());
        prop_assert_eq!(archive.signature().is_some(), signed);
        for (entry, (algo, data)) in archive.entries().iter().zip(&contents) {
            prop_assert_eq!(&archive.contents(entry).unwrap(), data);
            prop_assert_eq!(entry.compression, *algo);
        }
    }
}

#[test]
fn test_all_null_side_channel_round_trip() {
    let record = SideChannel::default();
    let json = record.to_json().unwrap();
    assert_eq!(SideChannel::from_json(&json).unwrap(), record);
}
