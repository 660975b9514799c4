//! Benchmarks filling whole buffers, per register tier.
use brunch::Bench;

use pixbuf_canvas::{BufferLayout, CanvasError, Color, FillOps, PixelBuffer, PixelFormat};

struct Fill {
    format: PixelFormat,
    ops: FillOps,
    align: usize,
    sz: u32,
}

impl Fill {
    fn name(&self) -> String {
        format!(
            "fill({:?}, {:?}, align {}, {})",
            self.format,
            self.ops.tier(),
            self.align,
            self.sz
        )
    }

    fn prepare(self) -> Result<impl FnMut(), CanvasError> {
        let layout = BufferLayout::with_row_alignment(self.format, self.sz, self.sz, self.align)?;
        let mut memory = vec![0u8; layout.byte_len()];
        let ops = self.ops;

        // Check once that the setup is sound, the loop then can not fail.
        let native = PixelBuffer::new(&mut memory[..], layout)?.pack(Color::rgb(0x12, 0x34, 0x56))?;

        Ok(move || {
            if let Ok(mut buffer) = PixelBuffer::new(&mut memory[..], layout) {
                buffer.set_fill_ops(ops);
                buffer.fill(native);
            }
        })
    }
}

fn main() {
    let mut tests = vec![];
    for format in [PixelFormat::Rgb565, PixelFormat::Rgb24, PixelFormat::Argb32, PixelFormat::Rgb48] {
        for ops in [FillOps::scalar(), FillOps::detect()] {
            // Packed rows are filled in one run, padded rows one at a time.
            for align in [1, 64] {
                tests.push(Fill {
                    format,
                    ops,
                    align,
                    sz: 1000,
                });
            }
        }
    }

    let mut benches = brunch::Benches::default();
    benches.extend(tests.into_iter().map(|fill| {
        Bench::new(format!("pixbuf::fill::main::{}", fill.name()))
            .run(fill.prepare().expect("Failed to setup benchmark"))
    }));
    benches.finish();
}
