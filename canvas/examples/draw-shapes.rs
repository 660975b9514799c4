use pixbuf_canvas::{
    BlitConverter, BufferLayout, CanvasError, Color, Palette, PixelBuffer, PixelFormat,
};

const SZ_W: u32 = 320;
const SZ_H: u32 = 200;

/// Draws every primitive into a device independent bitmap, then saves it as a PNG.
///
/// Set `PIXBUF_SKIP_IO` to only draw, e.g. when running under `perf`.
fn main() -> Result<(), CanvasError> {
    // Rows of the bitmap are padded to four bytes, as for any DIB.
    let layout = BufferLayout::with_row_alignment(PixelFormat::Rgb24, SZ_W, SZ_H, 4)?;
    let mut bitmap = vec![0u8; layout.byte_len()];
    let mut canvas = PixelBuffer::new(&mut bitmap[..], layout)?;

    canvas.clear(Color::rgb(0xf0, 0xf0, 0xe8))?;
    canvas.fill_rectangle(10, 10, 100, 60, Color::rgb(0x20, 0x60, 0xa0))?;
    canvas.draw_rectangle(5, 5, 110, 70, Color::BLACK)?;
    canvas.fill_circle(180, 50, 40, Color::rgb(0xe0, 0x40, 0x20))?;
    canvas.draw_circle(180, 50, 45, Color::BLACK)?;
    canvas.fill_ellipse(270, 50, 40, 20, Color::rgb(0x40, 0xa0, 0x40))?;
    canvas.draw_ellipse(270, 50, 45, 25, Color::BLACK)?;
    canvas.draw_cross(160, 150, 30, Color::BLUE)?;

    // Partly outside, these are clipped.
    canvas.draw_line(-50, 190, 400, 100, Color::RED)?;
    canvas.fill_circle(SZ_W as i32, SZ_H as i32, 50, Color::rgb(0x80, 0x20, 0x80))?;

    // A sprite with alpha, composited over the scene.
    let sprite_layout = BufferLayout::packed(PixelFormat::Argb32, 64, 64)?;
    let mut sprite_memory = vec![0u8; sprite_layout.byte_len()];
    let mut sprite = PixelBuffer::new(&mut sprite_memory[..], sprite_layout)?;
    sprite.clear(Color::TRANSPARENT)?;
    sprite.fill_circle(32, 32, 30, Color::rgba(0xff, 0xd0, 0x00, 0xa0))?;
    canvas.blend_with(&sprite, 60, 110)?;

    // A two-color icon, copied as it is.
    let palette = Palette::monochrome();
    let icon_layout = BufferLayout::packed(PixelFormat::Indexed1, 24, 24)?;
    let mut icon_memory = vec![0u8; icon_layout.byte_len()];
    let mut icon = PixelBuffer::with_palette(&mut icon_memory[..], icon_layout, &palette)?;
    icon.clear(Color::WHITE)?;
    icon.draw_line(0, 0, 23, 23, Color::BLACK)?;
    icon.draw_line(23, 0, 0, 23, Color::BLACK)?;
    canvas.copy_from(&icon, 280, 160)?;

    if std::env::var_os("PIXBUF_SKIP_IO").is_some() {
        return Ok(());
    }

    // `image` wants tightly packed red, green, blue, alpha bytes.
    let layout = BufferLayout::packed(PixelFormat::Argb32, SZ_W, SZ_H)?;
    let mut output = vec![0u8; layout.byte_len()];
    let mut rgba = PixelBuffer::new(&mut output[..], layout)?;
    BlitConverter::global().convert(&canvas.as_view(), &mut rgba)?;
    drop(rgba);

    for pixel in output.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    let image = image::RgbaImage::from_raw(SZ_W, SZ_H, output).expect("Buffer of the right size");
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../shapes.png");
    image.save(path).expect("Failed to save image");
    Ok(())
}
