use super::*;

#[test]
fn unallocated_tiles_read_as_zero() {
    let store = TileStore::new(100, 70, PixelFormat::Rgba);
    assert_eq!(store.cols(), 2);
    assert_eq!(store.rows(), 2);
    assert_eq!(store.pixel(99, 69), Some(vec![0, 0, 0, 0]));
    assert_eq!(store.pixel(100, 0), None);
    assert_eq!(store.pixel(-1, 0), None);
    assert_eq!(store.allocated_tiles(), 0);
}

#[test]
fn edge_tiles_are_cropped() {
    let store = TileStore::new(100, 70, PixelFormat::Gray);
    let t = store.acquire(1, 1).unwrap();
    assert_eq!((t.width(), t.height()), (36, 6));
    assert_eq!(t.data().len(), 36 * 6);
    assert!(store.acquire(2, 0).is_none());
}

#[test]
fn guards_balance_reference_counts() {
    let mut store = TileStore::new(64, 64, PixelFormat::Rgb);
    {
        let a = store.acquire(0, 0).unwrap();
        let b = store.acquire(0, 0).unwrap();
        assert_eq!(store.ref_count(0, 0), 2);
        drop(a);
        assert_eq!(store.ref_count(0, 0), 1);
        drop(b);
    }
    assert_eq!(store.outstanding_refs(), 0);

    let g = store.acquire_mut(0, 0).unwrap();
    g.release(false);
    assert_eq!(store.outstanding_refs(), 0);
    assert!(!store.is_dirty(0, 0));
}

#[test]
fn writes_mark_tiles_dirty_until_taken() {
    let mut store = TileStore::new(130, 10, PixelFormat::GrayA);
    store.write_pixel(129, 3, &[9, 200]).unwrap();
    assert!(store.is_dirty(2, 0));
    assert!(!store.is_dirty(0, 0));
    assert_eq!(store.take_dirty(), vec![(2, 0)]);
    assert!(!store.is_dirty(2, 0));
    assert_eq!(store.pixel(129, 3), Some(vec![9, 200]));
}

#[test]
fn write_pixel_rejects_wrong_width() {
    let mut store = TileStore::new(4, 4, PixelFormat::Rgba);
    assert!(store.write_pixel(0, 0, &[1, 2, 3]).is_err());
}

#[test]
fn fill_and_read_rect_across_tile_seams() {
    let mut store = TileStore::new(150, 150, PixelFormat::Rgb);
    store
        .fill_rect(Rect::new(60, 60, 10, 10), &[1, 2, 3])
        .unwrap();
    let got = store.read_rect(Rect::new(58, 58, 14, 14));
    let at = |x: usize, y: usize| &got[(y * 14 + x) * 3..(y * 14 + x) * 3 + 3];
    assert_eq!(at(0, 0), &[0, 0, 0]);
    assert_eq!(at(2, 2), &[1, 2, 3]);
    assert_eq!(at(11, 11), &[1, 2, 3]);
    assert_eq!(at(12, 12), &[0, 0, 0]);
    assert_eq!(store.allocated_tiles(), 4);
}

#[test]
fn read_rect_outside_store_is_zero_filled() {
    let mut store = TileStore::new(2, 2, PixelFormat::Gray);
    store.fill(&[7]).unwrap();
    let got = store.read_rect(Rect::new(-1, -1, 4, 4));
    #[rustfmt::skip]
    let expected = vec![
        0, 0, 0, 0,
        0, 7, 7, 0,
        0, 7, 7, 0,
        0, 0, 0, 0,
    ];
    assert_eq!(got, expected);
}

#[test]
fn from_raw_checks_length_and_round_trips_through_image() {
    assert!(TileStore::from_raw(2, 2, PixelFormat::Rgba, &[0; 15]).is_err());

    let img = image::RgbaImage::from_fn(70, 3, |x, y| image::Rgba([x as u8, y as u8, 5, 255]));
    let store = TileStore::from_rgba_image(&img);
    assert!(store.has_no_dirty_tiles());
    assert_eq!(store.to_rgba_image().unwrap(), img);
}

#[test]
fn gray_alpha_expands_to_rgba() {
    let store = TileStore::from_raw(1, 1, PixelFormat::GrayA, &[40, 90]).unwrap();
    let img = store.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [40, 40, 40, 90]);

    let indexed = TileStore::new(1, 1, PixelFormat::Indexed);
    assert!(indexed.to_rgba_image().is_err());
}

#[test]
fn clone_keeps_pixels_and_drops_references() {
    let mut store = TileStore::new(8, 8, PixelFormat::Gray);
    store.write_pixel(1, 1, &[42]).unwrap();
    let guard = store.acquire(0, 0).unwrap();
    let copy = store.clone();
    assert_eq!(copy.outstanding_refs(), 0);
    drop(guard);
    assert_eq!(copy.pixel(1, 1), Some(vec![42]));
}

#[test]
fn tile_spans_cover_rect_exactly() {
    let rect = Rect::new(10, 60, 120, 10);
    let area: i32 = tile_spans(rect).map(|(_, _, r)| r.width * r.height).sum();
    assert_eq!(area, 120 * 10);
    assert_eq!(tile_spans(rect).count(), 3 * 2);
}

impl TileStore {
    fn has_no_dirty_tiles(&self) -> bool {
        (0..self.rows()).all(|r| (0..self.cols()).all(|c| !self.is_dirty(c, r)))
    }
}
