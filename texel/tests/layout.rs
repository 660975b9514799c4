use pixbuf_texel::layout::{LayoutError, Rect, StrideSpec, StridedBits};

#[test]
fn foreign_stride() {
    // A 1bpp bitmap of 10 pixels per row handed over with a pitch of 4 bytes and some header.
    let layout = StridedBits::new(StrideSpec {
        width: 10,
        height: 3,
        bits_per_pixel: 1,
        bytes_per_row: 4,
        offset: 16,
        x_origin: 0,
    })
    .expect("Valid layout");

    assert_eq!(layout.byte_len(), 16 + 2 * 4 + 2);
    assert_eq!(layout.pixel_bit(9, 2), (16 + 8) * 8 + 9);
    assert_eq!(layout.row_bytes(1), 20..22);
    assert_eq!(layout.bytes_per_pixel(), None);

    assert_eq!(
        layout.fits(25),
        Err(LayoutError::BufferTooSmall {
            len: 25,
            required: 26
        })
    );
    assert_eq!(layout.fits(26), Ok(()));
}

#[test]
fn empty_layouts() {
    let layout = StridedBits::packed(0, 5, 32).expect("Valid layout");
    assert_eq!(layout.byte_len(), 0);

    let layout = StridedBits::packed(7, 0, 32).expect("Valid layout");
    assert_eq!(layout.byte_len(), 0);
    assert!(layout.region(Rect::new(0, 0, 7, 0)).is_ok());
}

#[test]
fn overflowing_layouts() {
    let huge = StrideSpec {
        width: u32::MAX,
        height: u32::MAX,
        bits_per_pixel: 64,
        bytes_per_row: usize::MAX,
        offset: 0,
        x_origin: 0,
    };

    assert_eq!(StridedBits::new(huge), Err(LayoutError::OutOfMemory));
}

#[test]
fn wide_pixel_regions() {
    let layout = StridedBits::with_row_alignment(5, 4, 48, 8).expect("Valid layout");
    assert_eq!(layout.bytes_per_row(), 32);
    assert_eq!(layout.bytes_per_pixel(), Some(6));

    let region = layout.region(Rect::new(2, 1, 3, 3)).expect("Region in bounds");
    assert_eq!(region.pixel_byte(0, 0), 32 + 12);
    assert_eq!(region.row_bytes(2), 96 + 12..96 + 30);
    assert_eq!(region.byte_len(), layout.byte_len());
}
