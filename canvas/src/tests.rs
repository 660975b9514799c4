use crate::layout::Rect;
use crate::{
    BlitConverter, BufferLayout, CanvasError, Color, FillOps, Native, Palette, PixelBuffer,
    PixelFormat,
};

#[test]
fn monochrome_clear() -> Result<(), CanvasError> {
    let palette = Palette::monochrome();
    let layout = BufferLayout::packed(PixelFormat::Indexed1, 3, 3)?;
    // The low five bits of each row are padding.
    let mut memory = vec![0x1fu8; layout.byte_len()];
    let mut buffer = PixelBuffer::with_palette(&mut memory[..], layout, &palette)?;

    buffer.set_color(1, 1, Color::WHITE)?;
    assert_eq!(buffer.get_native(1, 1)?, Native(1));
    assert!(!buffer.is_flat_color());

    buffer.clear(Color::BLACK)?;
    for y in 0..3 {
        for x in 0..3 {
            assert_eq!(buffer.get_color(x, y)?, Color::BLACK, "at {}, {}", x, y);
        }
    }

    assert!(buffer.is_flat_color());
    drop(buffer);
    assert_eq!(memory, [0x1f; 3]);
    Ok(())
}

#[test]
fn indexed_round_trip() -> Result<(), CanvasError> {
    let palette = Palette::new(vec![
        Color::BLACK,
        Color::rgba(0x20, 0x40, 0x60, 0x80),
        Color::RED,
        Color::rgb(0x11, 0x22, 0x33),
        Color::WHITE,
    ])?;

    let layout = BufferLayout::with_row_alignment(PixelFormat::Indexed8, 5, 3, 4)?;
    let mut original = vec![0u8; layout.byte_len()];
    let mut indexed = PixelBuffer::with_palette(&mut original[..], layout, &palette)?;
    for y in 0..3 {
        for x in 0..5 {
            indexed.set_native(x, y, Native(u64::from((x + y) % 5)))?;
        }
    }

    let direct_layout = BufferLayout::packed(PixelFormat::Argb32, 5, 3)?;
    let mut direct_memory = vec![0u8; direct_layout.byte_len()];
    let mut direct = PixelBuffer::new(&mut direct_memory[..], direct_layout)?;
    BlitConverter::global().convert(&indexed.as_view(), &mut direct)?;
    assert_eq!(direct.get_color(3, 1)?, Color::WHITE);
    assert_eq!(direct.get_color(1, 0)?, Color::rgba(0x20, 0x40, 0x60, 0x80));

    let mut back = vec![0xeeu8; layout.byte_len()];
    let mut indexed_again = PixelBuffer::with_palette(&mut back[..], layout, &palette)?;
    BlitConverter::global().convert(&direct.as_view(), &mut indexed_again)?;

    drop(indexed);
    drop(indexed_again);
    for y in 0..3 {
        let row = y * 8..y * 8 + 5;
        assert_eq!(original[row.clone()], back[row], "row {}", y);
    }

    Ok(())
}

#[test]
fn palette_failure_leaves_memory() -> Result<(), CanvasError> {
    let palette = Palette::grayscale(16)?;
    let layout = BufferLayout::packed(PixelFormat::Indexed4, 7, 5)?;
    let mut memory: Vec<u8> = (0..layout.byte_len() as u8).collect();
    let snapshot = memory.clone();
    let mut buffer = PixelBuffer::with_palette(&mut memory[..], layout, &palette)?;

    let missing = CanvasError::PaletteLookupFailure(Color::RED);
    assert_eq!(buffer.set_color(1, 1, Color::RED), Err(missing));
    assert_eq!(buffer.clear(Color::RED), Err(missing));
    assert_eq!(buffer.draw_line(0, 0, 6, 4, Color::RED), Err(missing));
    assert_eq!(buffer.fill_circle(3, 2, 2, Color::RED), Err(missing));
    assert_eq!(buffer.draw_cross_checked(3, 2, 1, Color::RED), Err(missing));

    // One pixel of the source is not in the palette, so none may be written.
    let source_layout = BufferLayout::packed(PixelFormat::Argb32, 3, 3)?;
    let mut source_memory = vec![0u8; source_layout.byte_len()];
    let mut source = PixelBuffer::new(&mut source_memory[..], source_layout)?;
    source.clear(Color::WHITE)?;
    source.set_color(2, 2, Color::RED)?;

    assert_eq!(buffer.copy_from(&source, 1, 1), Err(missing));
    assert_eq!(buffer.blend_with(&source, 1, 1), Err(missing));

    drop(buffer);
    assert_eq!(memory, snapshot);
    Ok(())
}

#[test]
fn blend_extremes() -> Result<(), CanvasError> {
    let source_layout = BufferLayout::packed(PixelFormat::Argb32, 4, 3)?;
    let mut source_memory = vec![0u8; source_layout.byte_len()];
    let mut source = PixelBuffer::new(&mut source_memory[..], source_layout)?;

    for format in [PixelFormat::Argb32, PixelFormat::Rgb565, PixelFormat::PArgb64] {
        let layout = BufferLayout::with_row_alignment(format, 9, 7, 4)?;
        let mut pattern = vec![0u8; layout.byte_len()];
        let mut background = PixelBuffer::new(&mut pattern[..], layout)?;
        background.clear(Color::rgb(0x30, 0x60, 0x90))?;
        background.draw_line(0, 0, 8, 6, Color::rgba(0xff, 0, 0, 0x80))?;
        drop(background);

        for y in 0..3 {
            for x in 0..4 {
                source.set_color(x, y, Color::rgba(x as u8 * 60, y as u8 * 100, 7, 0))?;
            }
        }

        let mut blended = pattern.clone();
        let mut target = PixelBuffer::new(&mut blended[..], layout)?;
        target.blend_with(&source, 2, 3)?;
        drop(target);
        assert_eq!(blended, pattern, "transparent over {:?}", format);

        for y in 0..3 {
            for x in 0..4 {
                source.set_color(x, y, Color::rgba(x as u8 * 60, y as u8 * 100, 7, 0xff))?;
            }
        }

        let mut blended = pattern.clone();
        let mut target = PixelBuffer::new(&mut blended[..], layout)?;
        target.blend_with(&source, 6, -1)?;
        drop(target);

        let mut copied = pattern.clone();
        let mut target = PixelBuffer::new(&mut copied[..], layout)?;
        target.copy_from(&source, 6, -1)?;
        drop(target);

        assert_eq!(blended, copied, "opaque over {:?}", format);
        assert_ne!(copied, pattern);
    }

    Ok(())
}

#[test]
fn opaque_wide_blend_matches_copy() -> Result<(), CanvasError> {
    let wide = 0xffff_9abc_5678_1234;
    let cases = [
        (PixelFormat::Argb64, PixelFormat::PArgb64, wide, wide),
        (PixelFormat::PArgb64, PixelFormat::Argb64, wide, wide),
        (PixelFormat::Argb64, PixelFormat::Argb32, wide, 0xff9a_5612),
        (PixelFormat::Rgb48, PixelFormat::Rgb24, 0x9abc_5678_1234, 0x9a_5612),
    ];

    for (from, into, native, expected) in cases {
        let source_layout = BufferLayout::packed(from, 3, 2)?;
        let mut source_memory = vec![0u8; source_layout.byte_len()];
        let mut source = PixelBuffer::new(&mut source_memory[..], source_layout)?;
        source.fill(Native(native));

        let layout = BufferLayout::with_row_alignment(into, 5, 4, 4)?;
        let mut blended = vec![0x11u8; layout.byte_len()];
        let mut copied = blended.clone();
        PixelBuffer::new(&mut blended[..], layout)?.blend_with(&source, 1, 2)?;
        PixelBuffer::new(&mut copied[..], layout)?.copy_from(&source, 1, 2)?;

        assert_eq!(blended, copied, "{:?} over {:?}", from, into);
        let target = PixelBuffer::new(&blended[..], layout)?;
        assert_eq!(target.get_native(3, 3)?, Native(expected), "{:?} over {:?}", from, into);
    }

    Ok(())
}

#[test]
fn regions_are_buffers() -> Result<(), CanvasError> {
    let layout = BufferLayout::with_row_alignment(PixelFormat::Rgb24, 10, 10, 4)?;
    let mut memory = vec![0u8; layout.byte_len()];
    let mut buffer = PixelBuffer::new(&mut memory[..], layout)?;

    let mut region = buffer.slice_mut(Rect::new(3, 4, 5, 5))?;
    region.draw_rectangle(0, 0, 5, 5, Color::GREEN)?;
    // Clipped at the region, not at the buffer.
    region.draw_horizontal_line(-2, 2, 20, Color::BLUE)?;
    assert_eq!(
        region.draw_vertical_line_checked(2, 3, 3, Color::BLUE),
        Err(CanvasError::out_of_bounds(2, 5, 5, 5))
    );

    assert_eq!(buffer.get_color(3, 4)?, Color::GREEN);
    assert_eq!(buffer.get_color(7, 8)?, Color::GREEN);
    assert_eq!(buffer.get_color(3, 6)?, Color::BLUE);
    assert_eq!(buffer.get_color(7, 6)?, Color::BLUE);
    assert_eq!(buffer.get_color(2, 6)?, Color::BLACK);
    assert_eq!(buffer.get_color(8, 6)?, Color::BLACK);
    assert_eq!(buffer.get_color(5, 9)?, Color::BLACK);
    Ok(())
}

#[test]
fn fill_ops_agree() -> Result<(), CanvasError> {
    let layout = BufferLayout::with_row_alignment(PixelFormat::Rgb24, 37, 9, 4)?;
    let mut detected = vec![0x5au8; layout.byte_len()];
    let mut scalar = detected.clone();

    for (memory, ops) in [
        (&mut detected, FillOps::detect()),
        (&mut scalar, FillOps::scalar()),
    ] {
        let mut buffer = PixelBuffer::new(&mut memory[..], layout)?;
        buffer.set_fill_ops(ops);
        buffer.clear(Color::rgb(1, 2, 3))?;
        buffer.fill_ellipse(18, 4, 17, 3, Color::rgb(0xfe, 0xdc, 0xba))?;
    }

    assert_eq!(detected, scalar);
    Ok(())
}
