use pixbuf_canvas::{source_over, Codec, Color, Native, Palette, PixelFormat};
use proptest::prelude::*;

fn any_color() -> impl Strategy<Value = Color> {
    any::<[u8; 4]>().prop_map(|[r, g, b, a]| Color::rgba(r, g, b, a))
}

proptest! {
    #[test]
    fn full_precision_formats_are_exact(color in any_color()) {
        for format in [PixelFormat::Argb32, PixelFormat::Argb64] {
            let codec = Codec::new(format, None).expect("Direct format");
            let native = codec.pack(color).expect("Direct format");
            prop_assert_eq!(codec.unpack(native), color);
        }
    }

    #[test]
    fn opaque_formats_ignore_alpha(color in any_color()) {
        for format in [PixelFormat::Rgb24, PixelFormat::Rgb32, PixelFormat::Rgb48] {
            let codec = Codec::new(format, None).expect("Direct format");
            let native = codec.pack(color).expect("Direct format");
            prop_assert_eq!(native, codec.pack(Color { a: 0, ..color }).expect("Direct format"));
            prop_assert_eq!(codec.unpack(native), Color { a: 0xff, ..color });
        }
    }

    /// Decoding a stored pixel and encoding it again stores the same bits.
    #[test]
    fn stored_pixels_are_stable(color in any_color()) {
        // 16-bit premultiplied channels do not survive the trip through 8 bits.
        let stable = PixelFormat::ALL
            .into_iter()
            .filter(|f| !f.is_indexed() && *f != PixelFormat::PArgb64);

        for format in stable {
            let codec = Codec::new(format, None).expect("Direct format");
            let stored = codec.pack(color).expect("Direct format");
            let again = codec.pack(codec.unpack(stored)).expect("Direct format");
            prop_assert_eq!(stored, again, "{:?}", format);
        }
    }

    #[test]
    fn premultiplied_stays_close(color in any_color()) {
        let codec = Codec::new(PixelFormat::PArgb32, None).expect("Direct format");
        let back = codec.unpack(codec.pack(color).expect("Direct format"));

        prop_assert_eq!(back.a, color.a);
        if color.a == 0 {
            prop_assert_eq!(back, Color::TRANSPARENT);
        } else {
            // Rounding to multiples of alpha loses at most half a step of 255 / alpha.
            let tolerance = i32::from(255 / color.a) / 2 + 1;
            for (b, c) in [(back.r, color.r), (back.g, color.g), (back.b, color.b)] {
                prop_assert!((i32::from(b) - i32::from(c)).abs() <= tolerance);
            }
        }
    }

    #[test]
    fn blending_bounds(src in any_color(), dst in any_color()) {
        let out = source_over(src, dst);
        prop_assert!(out.a >= src.a.max(dst.a));
        prop_assert_eq!(source_over(Color { a: 0, ..src }, dst), dst);
        prop_assert_eq!(source_over(Color { a: 0xff, ..src }, dst), Color { a: 0xff, ..src });
    }
}

#[test]
fn indexed_codecs() {
    let palette = Palette::new(vec![Color::BLACK, Color::RED, Color::WHITE]).expect("Valid palette");
    let codec = Codec::new(PixelFormat::Indexed4, Some(&palette)).expect("Palette fits");

    assert_eq!(codec.pack(Color::WHITE), Ok(Native(2)));
    assert_eq!(codec.unpack(Native(1)), Color::RED);
    assert_eq!(codec.unpack(Native(9)), Color::TRANSPARENT);
    assert!(codec.pack(Color::GREEN).is_err());

    let too_large = Palette::grayscale(3).expect("Valid palette");
    assert!(Codec::new(PixelFormat::Indexed1, Some(&too_large)).is_err());
    assert!(Codec::new(PixelFormat::Indexed8, None).is_err());
}
