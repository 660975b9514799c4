//! Benchmarks conversions between formats, with and without the direct routines.
use brunch::Bench;

use pixbuf_canvas::{
    convert_generic, BlitConverter, BufferLayout, CanvasError, Color, Palette, PixelBuffer,
    PixelFormat,
};

struct Convert {
    format_in: PixelFormat,
    format_out: PixelFormat,
    direct: bool,
    sz: u32,
}

impl Convert {
    fn name(&self) -> String {
        let path = if self.direct { "direct" } else { "generic" };
        format!(
            "blit({:?}, {:?}, {}, {})",
            self.format_in, self.format_out, path, self.sz
        )
    }

    fn prepare(self) -> Result<impl FnMut(), CanvasError> {
        let palette = Palette::grayscale(16)?;
        let gray = Color::rgb(0x88, 0x88, 0x88);

        let from_layout = BufferLayout::packed(self.format_in, self.sz, self.sz)?;
        let mut from_memory = vec![0u8; from_layout.byte_len()];
        PixelBuffer::with_palette(&mut from_memory[..], from_layout, &palette)?.clear(gray)?;

        let into_layout = BufferLayout::packed(self.format_out, self.sz, self.sz)?;
        let mut into_memory = vec![0u8; into_layout.byte_len()];

        let direct = self.direct;
        let mut run = move || -> Result<(), CanvasError> {
            let from = PixelBuffer::with_palette(&from_memory[..], from_layout, &palette)?;
            let mut into = PixelBuffer::with_palette(&mut into_memory[..], into_layout, &palette)?;
            if direct {
                BlitConverter::global().convert_direct(&from, &mut into)
            } else {
                convert_generic(&from, &mut into)
            }
        };

        run()?;
        Ok(move || {
            let _ = run();
        })
    }
}

fn main() {
    use PixelFormat::*;

    let pairs = [
        (Argb32, Argb32),
        (Indexed4, Argb32),
        (Argb32, Rgb24),
        (Rgb24, Argb32),
        (Argb32, Rgb565),
        (Rgb565, Argb32),
        (Argb32, PArgb32),
        (PArgb32, Argb32),
        (Argb64, Argb32),
    ];

    let tests = pairs.into_iter().flat_map(|(format_in, format_out)| {
        [true, false].map(|direct| Convert {
            format_in,
            format_out,
            direct,
            sz: 512,
        })
    });

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|convert| {
        Bench::new(format!("pixbuf::blit::main::{}", convert.name()))
            .run(convert.prepare().expect("Failed to setup benchmark"))
    }));
    benches.finish();
}
