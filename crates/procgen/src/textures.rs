//! CPU image buffers shared by the generators, the asset loader and the software renderer.

use glam::{Vec3, Vec4};

/// RGBA pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::from_rgba(r, g, b, 1.0)
    }

    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: (r.clamp(0.0, 1.0) * 255.0) as u8,
            g: (g.clamp(0.0, 1.0) * 255.0) as u8,
            b: (b.clamp(0.0, 1.0) * 255.0) as u8,
            a: (a.clamp(0.0, 1.0) * 255.0) as u8,
        }
    }

    pub fn from_vec3(c: Vec3) -> Self {
        Self::from_rgb(c.x, c.y, c.z)
    }

    /// Grey pixel for single-channel maps (masks, heights).
    pub fn grey(value: f32) -> Self {
        Self::from_rgb(value, value, value)
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r as f32, self.g as f32, self.b as f32, self.a as f32) / 255.0
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Row-major RGBA image.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl TextureData {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Pixel::new(0, 0, 0, 255))
    }

    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; (width * height) as usize],
        }
    }

    /// Wrap tightly packed RGBA8 bytes. Returns `None` if the length does not match.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = pixel;
        }
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Pixel::new(0, 0, 0, 255)
        }
    }

    /// Nearest-neighbour sample with wraparound addressing.
    pub fn sample(&self, u: f32, v: f32) -> Pixel {
        if self.width == 0 || self.height == 0 {
            return Pixel::TRANSPARENT;
        }
        let x = ((u.fract() + 1.0).fract() * self.width as f32) as u32 % self.width;
        let y = ((v.fract() + 1.0).fract() * self.height as f32) as u32 % self.height;
        self.get_pixel(x, y)
    }

    /// Wrapped sample as normalised RGBA.
    pub fn sample_rgba(&self, u: f32, v: f32) -> Vec4 {
        self.sample(u, v).to_vec4()
    }

    /// Sample clamped to the edge (no wraparound).
    pub fn sample_clamped(&self, u: f32, v: f32) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ZERO;
        }
        let x = (u.clamp(0.0, 1.0) * self.width as f32).min(self.width as f32 - 1.0) as u32;
        let y = (v.clamp(0.0, 1.0) * self.height as f32).min(self.height as f32 - 1.0) as u32;
        self.get_pixel(x, y).to_vec4()
    }

    /// Copy a source rectangle into a destination rectangle, scaling nearest-neighbour.
    pub fn blit_scaled(&mut self, src: &TextureData, from: [u32; 4], to: [u32; 4]) {
        let [sx, sy, sw, sh] = from;
        let [dx, dy, dw, dh] = to;
        if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
            return;
        }
        for y in 0..dh {
            let src_y = sy + y * sh / dh;
            for x in 0..dw {
                let src_x = sx + x * sw / dw;
                if src_x < src.width && src_y < src.height {
                    self.set_pixel(dx + x, dy + y, src.get_pixel(src_x, src_y));
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_wraps_negative_coordinates() {
        let mut tex = TextureData::new(4, 4);
        tex.set_pixel(3, 3, Pixel::new(255, 0, 0, 255));
        assert_eq!(tex.sample(-0.1, -0.1), Pixel::new(255, 0, 0, 255));
        assert_eq!(tex.sample(0.9, 1.9), Pixel::new(255, 0, 0, 255));
    }

    #[test]
    fn rgba8_length_is_checked() {
        assert!(TextureData::from_rgba8(2, 2, &[0; 16]).is_some());
        assert!(TextureData::from_rgba8(2, 2, &[0; 15]).is_none());
    }

    #[test]
    fn blit_scales_source_rect() {
        let src = TextureData::filled(2, 2, Pixel::new(9, 9, 9, 255));
        let mut dst = TextureData::filled(8, 8, Pixel::TRANSPARENT);
        dst.blit_scaled(&src, [0, 0, 2, 2], [4, 4, 4, 4]);
        assert_eq!(dst.get_pixel(7, 7), Pixel::new(9, 9, 9, 255));
        assert_eq!(dst.get_pixel(3, 3), Pixel::TRANSPARENT);
    }
}
