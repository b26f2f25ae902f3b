use crate::assets::Image;

pub const ALPHA_OPAQUE: u8 = 255;

/// RGBA8 frame buffer view handed to scenes for drawing.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    /// `frame` must hold `width * height` RGBA pixels; excess bytes are ignored
    /// and short frames clip drawing.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset_of(x, y)?;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(pixel)
    }

    /// Draws `image` with its top-left corner at (`x`, `y`), scaling every
    /// source alpha by `alpha / 255` and blending over the frame.
    pub fn blit(&mut self, image: &Image, x: i32, y: i32, alpha: u8) {
        if alpha == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        let draw_left = x.max(0);
        let draw_top = y.max(0);
        let draw_right = x
            .saturating_add(image.width() as i32)
            .min(self.width as i32);
        let draw_bottom = y
            .saturating_add(image.height() as i32)
            .min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let src = image.rgba();
        let src_width = image.width() as usize;
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - y) as usize * src_width;
            for out_x in draw_left..draw_right {
                let Some(dst_offset) = self.offset_of(out_x, out_y) else {
                    continue;
                };
                let src_offset = (src_row + (out_x - x) as usize) * 4;
                let src_alpha = modulate_alpha(src[src_offset + 3], alpha);
                if src_alpha == 0 {
                    continue;
                }
                let dst = &mut self.frame[dst_offset..dst_offset + 4];
                for channel in 0..3 {
                    dst[channel] = blend_channel(src[src_offset + channel], dst[channel], src_alpha);
                }
                dst[3] = ALPHA_OPAQUE;
            }
        }
    }

    fn offset_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?
            .checked_mul(4)?;
        (offset + 4 <= self.frame.len()).then_some(offset)
    }
}

fn modulate_alpha(src_alpha: u8, alpha: u8) -> u8 {
    ((src_alpha as u16 * alpha as u16 + 127) / 255) as u8
}

fn blend_channel(src: u8, dst: u8, alpha: u8) -> u8 {
    if alpha == ALPHA_OPAQUE {
        return src;
    }
    let alpha = alpha as u16;
    ((src as u16 * alpha + dst as u16 * (255 - alpha) + 127) / 255) as u8
}
