//! Configuration files on disk.

use std::io::Write;

use quantum_echo::prelude::*;

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("echo.json");

    let config = EchoConfig::default()
        .with_resolution(128)
        .with_extent(16.0, 9.0)
        .with_smoothing(0.2, 0.1)
        .with_colors([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
    config.save(&path).unwrap();

    let loaded = EchoConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "motion": {{ "z_smoothing": 0.0 }} }}"#).unwrap();

    match EchoConfig::load(file.path()) {
        Err(ConfigError::Invalid(msg)) => assert!(msg.contains("z_smoothing")),
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_load_reports_json_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(matches!(EchoConfig::load(file.path()), Err(ConfigError::Json(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = EchoConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().contains("config file"));
}

#[test]
fn test_image_file_becomes_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    let image = image::RgbImage::from_fn(6, 4, |x, _| {
        if x < 3 {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    image.save(&path).unwrap();

    let frame = VideoFrame::open(&path).unwrap();
    assert_eq!((frame.width(), frame.height()), (6, 4));
    assert_eq!(&frame.pixels()[..4], &[255, 255, 255, 255]);

    assert!(matches!(
        VideoFrame::open(dir.path().join("missing.png")),
        Err(FrameError::Io(_))
    ));
}
