use pixbuf_canvas::fill::fill_reference;
use pixbuf_canvas::{BufferLayout, Color, FillOps, Palette, PixelBuffer, PixelFormat};
use proptest::prelude::*;

const SIZES: [u32; 14] = [0, 1, 7, 8, 9, 15, 16, 17, 31, 32, 33, 63, 64, 65];

/// Which bits of the memory belong to some pixel of the layout.
fn pixel_bits(layout: &BufferLayout) -> Vec<bool> {
    let mut covered = vec![false; layout.byte_len() * 8];
    for y in 0..layout.height() {
        for bit in layout.strided().row_bits(y) {
            covered[bit] = true;
        }
    }
    covered
}

fn bit(memory: &[u8], idx: usize) -> bool {
    memory[idx / 8] & (0x80 >> (idx % 8)) != 0
}

#[test]
fn fills_across_register_widths() {
    let monochrome = Palette::monochrome();
    let grays = Palette::grayscale(16).expect("Valid palette");
    let formats = [
        (PixelFormat::Indexed1, Color::WHITE),
        (PixelFormat::Indexed4, Color::rgb(0x88, 0x88, 0x88)),
        (PixelFormat::Indexed8, Color::rgb(0x11, 0x11, 0x11)),
        (PixelFormat::Rgb565, Color::rgb(0xff, 0x41, 0x84)),
        (PixelFormat::Rgb24, Color::rgb(0x12, 0x34, 0x56)),
        (PixelFormat::Argb32, Color::rgba(0x12, 0x34, 0x56, 0x78)),
        (PixelFormat::Rgb48, Color::rgb(0xab, 0xcd, 0xef)),
        (PixelFormat::Argb64, Color::rgba(0xab, 0xcd, 0xef, 0x01)),
    ];

    for (format, color) in formats {
        let palette = match format {
            PixelFormat::Indexed1 => &monochrome,
            _ => &grays,
        };

        for width in SIZES {
            for height in SIZES {
                let layout = BufferLayout::with_row_alignment(format, width, height, 4)
                    .expect("Valid layout");
                let mut memory = vec![0xa5u8; layout.byte_len()];
                let before = memory.clone();

                let mut buffer = PixelBuffer::with_palette(&mut memory[..], layout, palette)
                    .expect("Valid buffer");
                buffer.clear(color).expect("Color in palette");

                for y in 0..height {
                    for x in 0..width {
                        assert_eq!(
                            buffer.get_color(x, y),
                            Ok(color),
                            "{:?} {}x{} at {}, {}",
                            format,
                            width,
                            height,
                            x,
                            y
                        );
                    }
                }

                drop(buffer);
                for (idx, covered) in pixel_bits(&layout).into_iter().enumerate() {
                    if !covered {
                        assert_eq!(
                            bit(&memory, idx),
                            bit(&before, idx),
                            "{:?} {}x{} padding bit {}",
                            format,
                            width,
                            height,
                            idx
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn tiers_write_the_same_bytes() {
    let layout = BufferLayout::packed(PixelFormat::Rgb24, 65, 3).expect("Valid layout");

    let fill_with = |ops: FillOps| {
        let mut memory = vec![0u8; layout.byte_len()];
        let mut buffer = PixelBuffer::new(&mut memory[..], layout).expect("Valid buffer");
        buffer.set_fill_ops(ops);
        buffer.clear(Color::rgb(1, 2, 3)).expect("Direct format");
        buffer
            .fill_rectangle(3, 1, 61, 1, Color::rgb(4, 5, 6))
            .expect("Direct format");
        drop(buffer);
        memory
    };

    assert_eq!(fill_with(FillOps::scalar()), fill_with(FillOps::detect()));
}

proptest! {
    #[test]
    fn engine_matches_reference(
        count in 0usize..=10_000,
        width in prop::sample::select(vec![1usize, 2, 3, 4, 6, 8]),
        pattern in any::<[u8; 8]>(),
        start in 0usize..64,
    ) {
        let pattern = &pattern[..width];
        let end = start + count * width;
        let mut memory = vec![0x5au8; end + 64];
        let mut expected = memory.clone();

        FillOps::detect().fill(&mut memory[start..end], pattern);
        fill_reference(&mut expected[start..end], pattern);

        prop_assert_eq!(memory, expected);
    }
}
