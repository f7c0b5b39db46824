use super::*;

#[test]
fn draw_copies_rows_at_offset() {
    let mut frame = FrameRGB::new(4, 3);
    let rgb: Vec<u8> = (0..2 * 2 * 3).map(|v| v as u8 + 1).collect();
    frame.draw_rgb(1, 1, 2, 2, &rgb, 6).unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
    assert_eq!(frame.pixel(1, 1), Some([1, 2, 3]));
    assert_eq!(frame.pixel(2, 2), Some([10, 11, 12]));
    assert_eq!(frame.pixel(4, 0), None);
}

#[test]
fn draw_clips_to_frame() {
    let mut frame = FrameRGB::new(2, 2);
    let rgb = vec![9u8; 3 * 3 * 3];
    frame.draw_rgb(-1, -1, 3, 3, &rgb, 9).unwrap();
    assert!(frame.data.iter().all(|&v| v == 9));
    frame.draw_rgb(5, 0, 3, 3, &rgb, 9).unwrap();
}

#[test]
fn short_buffers_are_rejected() {
    let mut frame = FrameRGB::new(2, 2);
    assert!(frame.draw_rgb(0, 0, 2, 2, &[0; 11], 6).is_err());
    assert!(frame.draw_rgb(0, 0, 2, 2, &[0; 12], 5).is_err());
}

#[test]
fn converts_to_image() {
    let mut frame = FrameRGB::new(1, 1);
    frame.data.copy_from_slice(&[1, 2, 3]);
    assert_eq!(frame.to_rgb_image().unwrap().get_pixel(0, 0).0, [1, 2, 3]);
}
