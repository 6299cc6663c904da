//! End-to-end scenarios driving `build_pyramid` the way a
//! GUI/CLI caller would: synthesize a slice stack, run it, inspect the
//! on-disk pyramid.

use ct_pyramid::cancel::CancelToken;
use ct_pyramid::codec::{self, GrayImage};
use ct_pyramid::options::{BuildOptions, Mode, WorkerCount};
use ct_pyramid::{build_pyramid, NullProgressSink, Outcome};
use image::{ImageBuffer, Luma};
use std::path::Path;

fn write_u8(dir: &Path, name: &str, w: u32, h: u32, value: u8) {
    let buf = ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(w, h, Luma([value]));
    buf.save(dir.join(name)).unwrap();
}

fn write_u16(dir: &Path, name: &str, w: u32, h: u32, value: u16) {
    let buf = ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(w, h, Luma([value]));
    buf.save(dir.join(name)).unwrap();
}

fn assert_uniform_u8(path: &Path, w: u32, h: u32, value: u8) {
    match codec::load_gray(path).unwrap() {
        GrayImage::U8(buf) => {
            assert_eq!(buf.width(), w);
            assert_eq!(buf.height(), h);
            assert!(buf.as_raw().iter().all(|&p| p == value));
        }
        _ => panic!("expected 8-bit output at {}", path.display()),
    }
}

fn assert_uniform_u16(path: &Path, w: u32, h: u32, value: u16) {
    match codec::load_gray(path).unwrap() {
        GrayImage::U16(buf) => {
            assert_eq!(buf.width(), w);
            assert_eq!(buf.height(), h);
            assert!(buf.as_raw().iter().all(|&p| p == value));
        }
        _ => panic!("expected 16-bit output at {}", path.display()),
    }
}

#[test]
fn small_8bit_stack_averages_to_150() {
    let dir = tempfile::tempdir().unwrap();
    write_u8(dir.path(), "slice_000.tif", 256, 256, 100);
    write_u8(dir.path(), "slice_001.tif", 256, 256, 200);
    write_u8(dir.path(), "slice_002.tif", 256, 256, 100);
    write_u8(dir.path(), "slice_003.tif", 256, 256, 200);

    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    let outcome = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();
    assert!(matches!(outcome, Outcome::Ok));

    let level1 = dir.path().join(".thumbnail").join("1");
    assert_uniform_u8(&level1.join("000000.tif"), 128, 128, 150);
    assert_uniform_u8(&level1.join("000001.tif"), 128, 128, 150);
    assert!(!dir.path().join(".thumbnail").join("2").exists());
}

#[test]
fn sixteen_bit_average_does_not_overflow() {
    let dir = tempfile::tempdir().unwrap();
    write_u16(dir.path(), "slice_000.tif", 512, 512, 60000);
    write_u16(dir.path(), "slice_001.tif", 512, 512, 50000);

    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();

    let out = dir.path().join(".thumbnail").join("1").join("000000.tif");
    assert_uniform_u16(&out, 256, 256, 55000);
}

#[test]
fn odd_count_drops_trailing_and_terminates_at_three_levels() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        write_u8(dir.path(), &format!("slice_{i:03}.tif"), 1024, 1024, 10);
    }

    let mut options = BuildOptions::default();
    options.max_thumbnail_size = 200;
    let cancel = CancelToken::new();
    let outcome = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();
    assert!(matches!(outcome, Outcome::Ok));

    let base = dir.path().join(".thumbnail");
    let level1: Vec<_> = std::fs::read_dir(base.join("1")).unwrap().collect();
    assert_eq!(level1.len(), 2);
    let level2: Vec<_> = std::fs::read_dir(base.join("2")).unwrap().collect();
    assert_eq!(level2.len(), 1);
    assert!(!base.join("3").exists());

    assert_uniform_u8(&base.join("1").join("000000.tif"), 512, 512, 10);
    assert_uniform_u8(&base.join("2").join("000000.tif"), 256, 256, 10);
}

#[test]
fn path_escape_via_symlink_is_fatal_and_writes_nothing() {
    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        write_u8(dir.path(), "slice_000.tif", 64, 64, 1);
        write_u8(dir.path(), "slice_001.tif", 64, 64, 2);

        // Plant `.thumbnail` itself as a symlink pointing outside input_dir,
        // so the scheduler's directory-creation step is the one that trips
        // containment.
        symlink(outside.path(), dir.path().join(".thumbnail")).unwrap();

        let options = BuildOptions::default();
        let cancel = CancelToken::new();
        let result = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel);
        assert!(result.is_err());
        assert!(!outside.path().join("1").exists());
    }
}

#[test]
fn idempotent_rerun_performs_zero_writes() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..8 {
        write_u8(dir.path(), &format!("slice_{i:03}.tif"), 64, 64, i as u8);
    }
    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();

    let level1_dir = dir.path().join(".thumbnail").join("1");
    let mut before_mtimes = Vec::new();
    for entry in std::fs::read_dir(&level1_dir).unwrap() {
        let entry = entry.unwrap();
        before_mtimes.push((entry.path(), entry.metadata().unwrap().modified().unwrap()));
    }

    std::thread::sleep(std::time::Duration::from_millis(10));
    let outcome = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();
    assert!(matches!(outcome, Outcome::Ok));

    for (path, mtime) in before_mtimes {
        let after = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(mtime, after, "{} was rewritten on an idempotent rerun", path.display());
    }
}

#[test]
fn cancellation_before_start_yields_cancelled_with_no_partial_files() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..20 {
        write_u8(dir.path(), &format!("slice_{i:03}.tif"), 64, 64, 5);
    }
    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel).unwrap();
    assert!(matches!(
        outcome,
        Outcome::Cancelled {
            completed_through_level: 0
        }
    ));

    let level1_dir = dir.path().join(".thumbnail").join("1");
    if level1_dir.exists() {
        for entry in std::fs::read_dir(&level1_dir).unwrap() {
            let entry = entry.unwrap();
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }
}

#[test]
fn parallel_and_sequential_modes_produce_byte_identical_output() {
    let make_input = |dir: &Path| {
        for i in 0..9 {
            write_u8(dir, &format!("slice_{i:03}.tif"), 96, 96, (i * 20) as u8);
        }
    };

    let parallel_dir = tempfile::tempdir().unwrap();
    make_input(parallel_dir.path());
    let mut parallel_opts = BuildOptions::default();
    parallel_opts.mode = Mode::Parallel;
    parallel_opts.worker_count = WorkerCount::Fixed(4);
    build_pyramid(
        parallel_dir.path(),
        &parallel_opts,
        &mut NullProgressSink,
        &CancelToken::new(),
    )
    .unwrap();

    let sequential_dir = tempfile::tempdir().unwrap();
    make_input(sequential_dir.path());
    let mut sequential_opts = BuildOptions::default();
    sequential_opts.mode = Mode::Sequential;
    build_pyramid(
        sequential_dir.path(),
        &sequential_opts,
        &mut NullProgressSink,
        &CancelToken::new(),
    )
    .unwrap();

    let p_level1 = parallel_dir.path().join(".thumbnail").join("1");
    let s_level1 = sequential_dir.path().join(".thumbnail").join("1");
    for i in 0..4 {
        let name = format!("{i:06}.tif");
        let p_bytes = std::fs::read(p_level1.join(&name)).unwrap();
        let s_bytes = std::fs::read(s_level1.join(&name)).unwrap();
        assert_eq!(p_bytes, s_bytes, "output {name} diverged between modes");
    }
}

#[test]
fn zero_inputs_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    let result = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel);
    assert!(result.is_err());
}

#[test]
fn non_grayscale_file_is_rejected_on_probe() {
    let dir = tempfile::tempdir().unwrap();
    let rgb = image::RgbImage::from_pixel(64, 64, image::Rgb([10, 20, 30]));
    rgb.save(dir.path().join("slice_000.tif")).unwrap();
    write_u8(dir.path(), "slice_001.tif", 64, 64, 10);

    let options = BuildOptions::default();
    let cancel = CancelToken::new();
    let result = build_pyramid(dir.path(), &options, &mut NullProgressSink, &cancel);
    assert!(result.is_err());
}
