use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use keepsake_engine::composite_image;
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgba8(img.clone())
        .save(&path)
        .expect("save png");
    path
}

fn write_jpeg(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgba8(img.clone())
        .to_rgb8()
        .save(&path)
        .expect("save jpeg");
    path
}

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

#[test]
fn opaque_overlay_fully_replaces_the_base() {
    let dir = TempDir::new().expect("tempdir");
    let base = write_png(dir.path(), "base.png", &solid(2, 2, [0, 0, 255, 255]));
    let overlay = write_png(dir.path(), "overlay.png", &solid(2, 2, [255, 0, 0, 255]));
    let output = dir.path().join("out.png");

    composite_image(&base, &overlay, &output).expect("composite");

    let result = image::open(&output).expect("decode output").to_rgba8();
    for pixel in result.pixels() {
        assert_eq!(pixel.0, [255, 0, 0, 255]);
    }
}

#[test]
fn mismatched_overlay_is_resampled_to_the_base_size() {
    let dir = TempDir::new().expect("tempdir");
    let base = write_png(dir.path(), "base.png", &solid(4, 4, [0, 255, 0, 255]));
    let overlay = write_png(dir.path(), "overlay.png", &solid(2, 2, [255, 0, 0, 255]));
    let output = dir.path().join("out.png");

    composite_image(&base, &overlay, &output).expect("composite");

    let result = image::open(&output).expect("decode output");
    assert_eq!(result.dimensions(), (4, 4));
    // The solid overlay still wins everywhere after resampling.
    for pixel in result.to_rgba8().pixels() {
        assert_eq!(pixel.0, [255, 0, 0, 255]);
    }
}

#[test]
fn transparent_overlay_regions_keep_the_base() {
    let dir = TempDir::new().expect("tempdir");
    let base = write_png(dir.path(), "base.png", &solid(2, 2, [0, 0, 255, 255]));
    let overlay = write_png(dir.path(), "overlay.png", &solid(2, 2, [255, 0, 0, 0]));
    let output = dir.path().join("out.png");

    composite_image(&base, &overlay, &output).expect("composite");

    let result = image::open(&output).expect("decode output").to_rgba8();
    for pixel in result.pixels() {
        assert_eq!(pixel.0, [0, 0, 255, 255]);
    }
}

#[test]
fn non_png_output_is_flattened_jpeg() {
    let dir = TempDir::new().expect("tempdir");
    let base = write_jpeg(dir.path(), "base.jpg", &solid(8, 8, [0, 0, 255, 255]));
    let overlay = write_png(dir.path(), "overlay.png", &solid(8, 8, [255, 0, 0, 255]));
    let output = dir.path().join("out.jpg");

    composite_image(&base, &overlay, &output).expect("composite");

    let bytes = fs::read(&output).expect("read output");
    assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

    let result = image::open(&output).expect("decode output").to_rgb8();
    for pixel in result.pixels() {
        // Allow for JPEG quantization noise.
        assert!(pixel[0] >= 245, "red channel too low: {:?}", pixel.0);
        assert!(pixel[1] <= 10 && pixel[2] <= 10, "not red: {:?}", pixel.0);
    }
}

#[test]
fn corrupt_overlay_fails_without_leaving_output() {
    let dir = TempDir::new().expect("tempdir");
    let base = write_png(dir.path(), "base.png", &solid(2, 2, [0, 0, 255, 255]));
    let overlay = dir.path().join("overlay.png");
    fs::write(&overlay, b"this is not an image").expect("write garbage");
    let output = dir.path().join("out.png");

    let result = composite_image(&base, &overlay, &output);

    assert!(result.is_err());
    assert!(!output.exists());
}
