use super::*;

#[test]
fn new_surface_is_transparent() {
    let s = Surface::new(PixelSize::new(3, 2)).unwrap();
    assert_eq!(s.data.len(), 3 * 2 * 4);
    assert!(s.data.iter().all(|&b| b == 0));
    assert_eq!(s.pixel(2, 1), Some([0, 0, 0, 0]));
    assert_eq!(s.pixel(3, 0), None);
}

#[test]
fn zero_and_huge_sizes_are_rejected() {
    assert!(Surface::new(PixelSize::new(0, 10)).is_err());
    assert!(Surface::new(PixelSize::new(MAX_SURFACE_DIM + 1, 1)).is_err());
}

#[test]
fn straight_roundtrip_keeps_opaque_pixels() {
    let px = vec![10u8, 20, 30, 255, 0, 0, 0, 0];
    let s = Surface::from_straight_rgba8(PixelSize::new(2, 1), px.clone()).unwrap();
    assert_eq!(s.to_straight_rgba8(), px);
}

#[test]
fn save_png_and_reload() {
    let dir = std::path::PathBuf::from("target").join("unit_surface_save");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("px.png");
    let s = Surface::from_straight_rgba8(PixelSize::new(1, 1), vec![255, 0, 0, 255]).unwrap();
    s.save(&path, FrameFormat::Png).unwrap();
    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[test]
fn frame_format_parse_and_extension() {
    assert_eq!("PNG".parse::<FrameFormat>().unwrap(), FrameFormat::Png);
    assert_eq!("bmp".parse::<FrameFormat>().unwrap().extension(), "bmp");
    assert!("gif".parse::<FrameFormat>().is_err());
}
