//! Alpha compositing and frame-boundary clipping


use face_overlay::compositor::{blend, clip_region, BlendRegion};
use face_overlay::transform::{transform, TransformedSprite};
use image::Rgb;
use proptest::prelude::*;
use test_helpers::{solid_frame, solid_sprite, GRAY, RED};

fn opaque(width: u32, height: u32) -> TransformedSprite {
    transform(&solid_sprite(width, height, RED, 255), 1.0, 0.0).unwrap()
}

#[test]
fn test_sprite_clipped_at_top_left_corner() {
    let mut frame = solid_frame(640, 640, [0, 0, 0]);
    let sprite = opaque(200, 200);

    assert!(blend(&mut frame, &sprite, -50.0, -50.0));
    assert_eq!(frame.dimensions(), (640, 640));
    assert_eq!(*frame.get_pixel(0, 0), Rgb(RED));
    assert_eq!(*frame.get_pixel(49, 49), Rgb(RED));
    assert_eq!(*frame.get_pixel(50, 0), Rgb([0, 0, 0]));
    assert_eq!(*frame.get_pixel(0, 50), Rgb([0, 0, 0]));

    let painted = frame.pixels().filter(|p| **p == Rgb(RED)).count();
    assert_eq!(painted, 50 * 50);
}

#[test]
fn test_clip_region_offsets_into_sprite() {
    let region = clip_region(640, 640, 200, 200, -50.0, -50.0).unwrap();
    assert_eq!(
        region,
        BlendRegion {
            frame_x: 0,
            frame_y: 0,
            sprite_x: 150,
            sprite_y: 150,
            width: 50,
            height: 50,
        }
    );

    let region = clip_region(640, 480, 100, 60, 630.0, 470.0).unwrap();
    assert_eq!((region.frame_x, region.frame_y), (580, 440));
    assert_eq!((region.width, region.height), (60, 40));
    assert_eq!((region.sprite_x, region.sprite_y), (0, 0));
}

#[test]
fn test_sprite_outside_frame_leaves_it_untouched() {
    let mut frame = solid_frame(64, 48, GRAY);
    let original = frame.clone();
    let sprite = opaque(20, 20);

    for (x, y) in [(-11.0, 10.0), (10.0, -11.0), (75.0, 10.0), (10.0, 59.0), (-1e9, 1e9)] {
        assert!(!blend(&mut frame, &sprite, x, y), "center ({x}, {y})");
    }
    assert_eq!(frame, original);
}

#[test]
fn test_transparent_pixels_are_skipped() {
    let mut frame = solid_frame(32, 32, GRAY);
    let original = frame.clone();
    let sprite = transform(&solid_sprite(16, 16, RED, 0), 1.0, 0.0).unwrap();

    assert!(blend(&mut frame, &sprite, 16.0, 16.0));
    assert_eq!(frame, original);
}

#[test]
fn test_half_transparent_blend() {
    let mut frame = solid_frame(8, 8, [0, 0, 0]);
    let sprite = transform(&solid_sprite(8, 8, [255, 255, 255], 128), 1.0, 0.0).unwrap();

    blend(&mut frame, &sprite, 4.0, 4.0);
    assert!(frame.pixels().all(|p| *p == Rgb([128, 128, 128])));
}

#[test]
fn test_odd_sizes_anchor_on_floor() {
    let mut frame = solid_frame(20, 20, [0, 0, 0]);
    let sprite = opaque(5, 5);

    // left = floor(10 - 2.5) = 7
    blend(&mut frame, &sprite, 10.0, 10.0);
    assert_eq!(*frame.get_pixel(6, 10), Rgb([0, 0, 0]));
    assert_eq!(*frame.get_pixel(7, 10), Rgb(RED));
    assert_eq!(*frame.get_pixel(11, 10), Rgb(RED));
    assert_eq!(*frame.get_pixel(12, 10), Rgb([0, 0, 0]));
}

proptest! {
    #[test]
    fn blend_never_leaves_the_frame(
        frame_w in 1u32..64, frame_h in 1u32..64,
        sprite_w in 1u32..48, sprite_h in 1u32..48,
        cx in -200.0f64..200.0, cy in -200.0f64..200.0,
    ) {
        let mut frame = solid_frame(frame_w, frame_h, GRAY);
        let sprite = opaque(sprite_w, sprite_h);

        let drew = blend(&mut frame, &sprite, cx, cy);
        prop_assert_eq!(frame.dimensions(), (frame_w, frame_h));

        let region = clip_region(frame_w, frame_h, sprite_w, sprite_h, cx, cy);
        prop_assert_eq!(drew, region.is_some());
        let painted = frame.pixels().filter(|p| **p == Rgb(RED)).count();
        let expected = region.map_or(0, |r| (r.width * r.height) as usize);
        prop_assert_eq!(painted, expected);
    }
}
