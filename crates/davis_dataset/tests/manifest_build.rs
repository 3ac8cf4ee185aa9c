//! Integration tests for building manifests from synthetic DAVIS trees.

use davis_dataset::{
    build_manifest, summarize_layout, DavisConfig, DavisDatasetError, PairingMode, Split,
    TransformPipeline,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Write `ImageSets/<year>/<split>.txt` listing `sequences`.
fn write_index(root: &Path, year: u32, split: &str, sequences: &[&str]) -> anyhow::Result<()> {
    let dir = root.join("ImageSets").join(year.to_string());
    fs::create_dir_all(&dir)?;
    let mut body = sequences.join("\n");
    body.push('\n');
    fs::write(dir.join(format!("{split}.txt")), body)?;
    Ok(())
}

/// Create a sequence with the given image and annotation file names.
fn write_sequence(
    root: &Path,
    resolution: &str,
    sequence: &str,
    images: &[&str],
    labels: &[&str],
) -> anyhow::Result<()> {
    let img_dir = root.join("JPEGImages").join(resolution).join(sequence);
    let lbl_dir = root.join("Annotations").join(resolution).join(sequence);
    fs::create_dir_all(&img_dir)?;
    fs::create_dir_all(&lbl_dir)?;
    for name in images {
        fs::write(img_dir.join(name), format!("jpeg:{name}"))?;
    }
    for name in labels {
        fs::write(lbl_dir.join(name), format!("png:{name}"))?;
    }
    Ok(())
}

fn config(root: &Path, split: &str) -> DavisConfig {
    DavisConfig::new(root, split).with_transforms(TransformPipeline::identity())
}

fn file_names(paths: impl Iterator<Item = PathBuf>) -> Vec<String> {
    paths
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn bear_scenario_pairs_in_listing_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", "1.jpg"], &["0.png", "1.png"])?;

    let manifest = build_manifest(&config(root, "train").with_year(2017).with_resolution("480p"))?;
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.split, Split::Train);
    assert_eq!(
        manifest.entries[0].image_path,
        root.join("JPEGImages/480p/bear/0.jpg")
    );
    assert_eq!(
        manifest.entries[0].label_path,
        root.join("Annotations/480p/bear/0.png")
    );
    assert_eq!(
        manifest.entries[1].image_path,
        root.join("JPEGImages/480p/bear/1.jpg")
    );
    assert_eq!(
        manifest.entries[1].label_path,
        root.join("Annotations/480p/bear/1.png")
    );
    Ok(())
}

#[test]
fn sequences_follow_index_file_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "val", &["zebra", "ant"])?;
    write_sequence(root, "480p", "zebra", &["00000.jpg"], &["00000.png"])?;
    write_sequence(root, "480p", "ant", &["00000.jpg", "00001.jpg"], &["00000.png", "00001.png"])?;

    let manifest = build_manifest(&config(root, "val"))?;
    let sequences: Vec<_> = manifest
        .iter()
        .map(|e| {
            e.image_path
                .parent()
                .and_then(|p| p.file_name())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(sequences, vec!["zebra", "ant", "ant"]);
    Ok(())
}

#[test]
fn split_name_is_case_insensitive() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "val", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg"], &["0.png"])?;

    let manifest = build_manifest(&config(root, "VAL"))?;
    assert_eq!(manifest.split, Split::Val);
    assert_eq!(manifest.len(), 1);
    Ok(())
}

#[test]
fn blank_index_lines_are_ignored() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    let dir = root.join("ImageSets/2017");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("train.txt"), "\n  bear  \n\n")?;
    write_sequence(root, "480p", "bear", &["0.jpg"], &["0.png"])?;

    let manifest = build_manifest(&config(root, "train"))?;
    assert_eq!(manifest.len(), 1);
    Ok(())
}

#[test]
fn invalid_split_fails_before_touching_disk() {
    let err = build_manifest(&config(Path::new("/definitely/not/here"), "test")).unwrap_err();
    assert!(err.is_configuration(), "unexpected error: {err}");
    assert!(err.to_string().contains("test"));
}

#[test]
fn missing_transforms_is_configuration_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg"], &["0.png"])?;

    let err = build_manifest(&DavisConfig::new(root, "train")).unwrap_err();
    assert!(matches!(err, DavisDatasetError::Configuration(_)));
    Ok(())
}

#[test]
fn missing_index_file_is_manifest_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", "1.jpg"], &["0.png", "1.png"])?;

    let err = build_manifest(&config(root, "val")).unwrap_err();
    assert!(err.is_manifest_build());
    match err {
        DavisDatasetError::Io { path, .. } => assert!(path.ends_with("ImageSets/2017/val.txt")),
        other => panic!("expected io error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_sequence_dir_aborts_build() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear", "ghost"])?;
    write_sequence(root, "480p", "bear", &["0.jpg"], &["0.png"])?;

    let err = build_manifest(&config(root, "train")).unwrap_err();
    match err {
        DavisDatasetError::MissingSequenceDir { sequence, .. } => assert_eq!(sequence, "ghost"),
        other => panic!("expected missing sequence, got {other:?}"),
    }

    // Annotations present but images missing fails the same way.
    let lbl_dir = root.join("Annotations/480p/ghost");
    fs::create_dir_all(&lbl_dir)?;
    fs::write(lbl_dir.join("0.png"), b"png")?;
    let err = build_manifest(&config(root, "train")).unwrap_err();
    assert!(matches!(err, DavisDatasetError::MissingSequenceDir { .. }));
    Ok(())
}

#[test]
fn stem_pairing_rejects_unmatched_files() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", "1.jpg"], &["0.png"])?;

    let err = build_manifest(&config(root, "train")).unwrap_err();
    match err {
        DavisDatasetError::UnpairedFile { sequence, path } => {
            assert_eq!(sequence, "bear");
            assert!(path.ends_with("1.jpg"));
        }
        other => panic!("expected unpaired file, got {other:?}"),
    }

    let lbl_dir = root.join("Annotations/480p/bear");
    fs::write(lbl_dir.join("1.png"), b"png")?;
    fs::write(lbl_dir.join("2.png"), b"png")?;
    let err = build_manifest(&config(root, "train")).unwrap_err();
    match err {
        DavisDatasetError::UnpairedFile { path, .. } => assert!(path.ends_with("2.png")),
        other => panic!("expected orphan label, got {other:?}"),
    }
    Ok(())
}

#[test]
fn stem_pairing_rejects_duplicate_stems() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", "0.jpeg"], &["0.png"])?;

    let err = build_manifest(&config(root, "train")).unwrap_err();
    assert!(matches!(err, DavisDatasetError::DuplicateStem { ref stem, .. } if stem == "0"));
    Ok(())
}

#[test]
fn stem_pairs_follow_sorted_image_listing() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    // `-` sorts before `.`, so file-name order differs from stem order here.
    write_sequence(root, "480p", "bear", &["a.jpg", "a-b.jpg"], &["a.png", "a-b.png"])?;

    let manifest = build_manifest(&config(root, "train"))?;
    assert_eq!(
        file_names(manifest.iter().map(|e| e.image_path.clone())),
        vec!["a-b.jpg", "a.jpg"]
    );
    assert_eq!(
        file_names(manifest.iter().map(|e| e.label_path.clone())),
        vec!["a-b.png", "a.png"]
    );
    Ok(())
}

#[test]
fn positional_pairing_truncates_to_shorter_listing() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear", "boat"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", "1.jpg", "2.jpg"], &["a.png", "b.png"])?;
    write_sequence(root, "480p", "boat", &["0.jpg"], &["0.png", "1.png"])?;

    let cfg = config(root, "train").with_pairing(PairingMode::Positional);
    let manifest = build_manifest(&cfg)?;
    let summary = summarize_layout(&cfg)?;
    assert_eq!(manifest.len(), 3);
    assert_eq!(summary.total_paired, manifest.len());
    assert_eq!(summary.total_images, 4);
    assert_eq!(summary.total_labels, 4);
    assert_eq!(summary.mismatched().count(), 2);

    assert_eq!(
        file_names(manifest.iter().take(2).map(|e| e.label_path.clone())),
        vec!["a.png", "b.png"]
    );
    assert_eq!(
        file_names(manifest.iter().take(2).map(|e| e.image_path.clone())),
        vec!["0.jpg", "1.jpg"]
    );
    Ok(())
}

#[test]
fn hidden_files_and_subdirectories_are_skipped() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear"])?;
    write_sequence(root, "480p", "bear", &["0.jpg", ".DS_Store"], &["0.png"])?;
    fs::create_dir_all(root.join("JPEGImages/480p/bear/thumbs"))?;

    let manifest = build_manifest(&config(root, "train"))?;
    assert_eq!(manifest.len(), 1);
    Ok(())
}

#[test]
fn repeated_builds_are_identical() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2017, "train", &["bear", "boat"])?;
    let names: Vec<String> = (0..20).rev().map(|i| format!("{i:05}")).collect();
    let images: Vec<String> = names.iter().map(|n| format!("{n}.jpg")).collect();
    let labels: Vec<String> = names.iter().map(|n| format!("{n}.png")).collect();
    let images: Vec<&str> = images.iter().map(String::as_str).collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    write_sequence(root, "480p", "bear", &images, &labels)?;
    write_sequence(root, "480p", "boat", &images[..5], &labels[..5])?;

    let first = build_manifest(&config(root, "train"))?;
    let second = build_manifest(&config(root, "train"))?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 25);
    for entry in &first {
        assert_eq!(entry.image_path.file_stem(), entry.label_path.file_stem());
    }
    Ok(())
}

#[test]
fn manifest_json_round_trip_preserves_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_index(root, 2019, "val", &["bear"])?;
    write_sequence(root, "Full-Resolution", "bear", &["0.jpg", "1.jpg"], &["0.png", "1.png"])?;

    let cfg = config(root, "val")
        .with_year(2019)
        .with_resolution("Full-Resolution");
    let manifest = build_manifest(&cfg)?;
    let out = root.join("out/manifest.json");
    manifest.save_json(&out)?;
    let loaded = davis_dataset::Manifest::load_json(&out)?;
    assert_eq!(loaded, manifest);
    assert_eq!(loaded.year, 2019);

    fs::write(&out, b"{not json")?;
    let err = davis_dataset::Manifest::load_json(&out).unwrap_err();
    assert!(matches!(err, DavisDatasetError::Json { .. }));
    Ok(())
}
