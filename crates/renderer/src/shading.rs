//! CPU shading functions for the field pass. `shaders/field.wgsl` implements the same math.

use crate::config::EffectParams;
use crate::projection::{project_perspective, project_topdown, GroundHit, ScreenSample};
use engine_core::{wrapped_delta, TransformState};
use glam::{Vec2, Vec3, Vec4};
use procgen::TextureData;
use world::LandmarkInstance;

/// Sources sampled by the field pass.
#[derive(Debug, Clone, Copy)]
pub struct FieldTextures<'a> {
    pub world: &'a TextureData,
    pub water: &'a TextureData,
    pub height: &'a TextureData,
    pub atlas: &'a TextureData,
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn hash(p: Vec2) -> f32 {
    let mut p = Vec2::new(fract(p.x * 123.34), fract(p.y * 456.78));
    p += p.dot(p + 45.32);
    fract(p.x * p.y)
}

pub fn smooth_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let f = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let a = hash(i);
    let b = hash(i + Vec2::X);
    let c = hash(i + Vec2::Y);
    let d = hash(i + Vec2::ONE);
    let top = a + (b - a) * f.x;
    let bottom = c + (d - c) * f.x;
    top + (bottom - top) * f.y
}

pub fn fbm(mut p: Vec2, octaves: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..octaves.min(5) {
        value += amplitude * smooth_noise(p * frequency);
        amplitude *= 0.5;
        frequency *= 2.0;
        p = p * 2.0 + Vec2::splat(100.0);
    }
    value
}

fn cloud_shape(uv: Vec2, time: f32) -> f32 {
    let cloud = fbm(uv * 3.0 + Vec2::new(time * 0.05, 0.0), 4);
    let detail = fbm(uv * 8.0 + Vec2::new(time * 0.02, 100.0), 3);
    smoothstep(0.35, 0.65, cloud * 0.8 + detail * 0.2).powf(1.2)
}

fn cumulus_cloud(uv: Vec2, time: f32, scale: f32) -> f32 {
    let uv = uv * scale;
    let base = smoothstep(0.3, 0.7, smooth_noise(uv * 0.5 + Vec2::new(time * 0.01, 0.0)));
    let medium = smoothstep(0.4, 0.6, fbm(uv * 1.5 + Vec2::new(time * 0.02, 50.0), 3));
    let detail = fbm(uv * 4.0 + Vec2::new(time * 0.03, 100.0), 2);
    let cloud = smoothstep(0.2, 0.8, base * 0.6 + medium * 0.3 + detail * 0.1);
    let highlight = fbm(uv * 2.0 + Vec2::new(time * 0.01, 200.0), 2);
    cloud * (0.8 + highlight * 0.2)
}

/// `(top, mid, horizon)` sky stops for the perspective view, by field weather index.
pub fn perspective_sky_stops(weather: u32) -> (Vec3, Vec3, Vec3) {
    match weather {
        0 => (Vec3::new(0.35, 0.55, 0.95), Vec3::new(0.5, 0.7, 0.98), Vec3::new(0.75, 0.85, 1.0)),
        1 => (Vec3::new(0.28, 0.31, 0.36), Vec3::new(0.36, 0.39, 0.44), Vec3::new(0.46, 0.49, 0.53)),
        2 => (Vec3::new(0.62, 0.65, 0.7), Vec3::new(0.7, 0.72, 0.76), Vec3::new(0.8, 0.82, 0.86)),
        3 => (Vec3::new(0.14, 0.15, 0.19), Vec3::new(0.2, 0.21, 0.25), Vec3::new(0.28, 0.29, 0.33)),
        4 => (Vec3::new(0.6, 0.5, 0.3), Vec3::new(0.65, 0.55, 0.35), Vec3::new(0.7, 0.6, 0.4)),
        _ => (Vec3::new(0.7, 0.72, 0.75), Vec3::new(0.75, 0.77, 0.8), Vec3::new(0.8, 0.82, 0.85)),
    }
}

/// Dark side of the cloud colour ramp.
fn cloud_shadow_color(weather: u32) -> Vec3 {
    match weather {
        0 => Vec3::new(0.85, 0.88, 0.92),
        1..=3 => Vec3::new(0.25, 0.26, 0.3),
        4 => Vec3::new(0.6, 0.5, 0.3),
        _ => Vec3::new(0.75, 0.77, 0.8),
    }
}

pub fn distance_fog_color(weather: u32) -> Vec3 {
    match weather {
        0 => Vec3::new(0.75, 0.85, 0.98),
        1 => Vec3::new(0.46, 0.49, 0.53),
        2 => Vec3::new(0.8, 0.82, 0.86),
        3 => Vec3::new(0.28, 0.29, 0.33),
        4 => Vec3::new(0.7, 0.6, 0.4),
        _ => Vec3::new(0.8, 0.82, 0.85),
    }
}

pub fn perspective_sky(uv: Vec2, sky_y: f32, camera: &TransformState, weather: u32, time: f32) -> Vec3 {
    let (top, mid, horizon) = perspective_sky_stops(weather);
    let sky = if sky_y < 0.5 {
        mix3(horizon, mid, sky_y * 2.0)
    } else {
        mix3(mid, top, (sky_y - 0.5) * 2.0)
    };

    let cloud_uv = Vec2::new(uv.x * 2.0 + camera.heading * 0.15, sky_y * 1.5 - camera.pitch * 0.5);
    let clouds = match weather {
        0 => {
            let far = cloud_shape(cloud_uv * Vec2::new(1.5, 1.0) + Vec2::new(0.0, 0.5), time * 0.0001);
            let mid = cumulus_cloud(cloud_uv + Vec2::new(0.5, 0.2), time * 0.00015, 0.8);
            let near = cumulus_cloud(cloud_uv * 0.6 + Vec2::new(0.3, 0.0), time * 0.0002, 0.5);
            far * 0.3 * (0.5 + sky_y * 0.5) + mid * 0.5 + near * 0.7
        }
        1..=3 => {
            let heavy = smoothstep(0.1, 0.6, fbm(cloud_uv * 2.0 + Vec2::new(time * 0.00005, 0.0), 4));
            (heavy * 1.5).clamp(0.0, 1.0)
        }
        _ => 0.7 + smooth_noise(cloud_uv * 3.0) * 0.3,
    };

    let cloud_color = mix3(cloud_shadow_color(weather), Vec3::ONE, clouds);
    let mut color = mix3(sky, cloud_color, (clouds * 0.85).min(0.95));
    color *= 1.0 + (1.0 - sky_y).powi(3) * 0.3;
    if weather == 3 && fract(time * 0.00003) >= 0.99 {
        color += Vec3::splat(0.5);
    }
    color
}

/// Two-stop sky with light clouds for the top-down view.
pub fn topdown_sky(uv: Vec2, sky_y: f32, camera: &TransformState, weather: u32, time: f32) -> Vec3 {
    let (zenith, horizon, power) = match weather {
        0 => (Vec3::new(0.2, 0.4, 0.9), Vec3::new(0.85, 0.9, 1.0), 0.7),
        1 => (Vec3::new(0.15, 0.2, 0.25), Vec3::new(0.35, 0.4, 0.45), 0.8),
        2 => (Vec3::new(0.65, 0.7, 0.75), Vec3::new(0.9, 0.9, 0.95), 0.9),
        3 => (Vec3::new(0.05, 0.05, 0.1), Vec3::new(0.2, 0.2, 0.25), 0.6),
        4 => (Vec3::new(0.6, 0.5, 0.3), Vec3::new(0.8, 0.7, 0.5), 0.8),
        5 => (Vec3::new(0.7, 0.72, 0.75), Vec3::new(0.85, 0.87, 0.9), 0.9),
        6 => (Vec3::new(0.4, 0.42, 0.45), Vec3::new(0.6, 0.62, 0.65), 0.8),
        _ => (Vec3::new(0.2, 0.4, 0.9), Vec3::new(0.85, 0.9, 1.0), 0.7),
    };
    let sky = mix3(horizon, zenith, sky_y.powf(power));

    let cloud_uv = Vec2::new(uv.x * 2.0 + camera.heading * 0.15, sky_y * 1.5);
    let (scale, drift, lo, hi, amount, color) = match weather {
        0 => (2.0, 0.00002, 0.4, 0.7, 0.3, Vec3::ONE),
        1..=3 => (1.5, 0.00001, 0.3, 0.6, 0.5, Vec3::new(0.3, 0.3, 0.35)),
        4 => (3.0, 0.00003, 0.3, 0.7, 0.4, Vec3::new(0.7, 0.6, 0.4)),
        5 => (1.0, 0.000005, 0.2, 0.6, 0.7, Vec3::new(0.9, 0.9, 0.92)),
        6 => (1.2, 0.000015, 0.2, 0.5, 0.6, Vec3::new(0.5, 0.52, 0.55)),
        _ => (2.0, 0.0, 1.0, 2.0, 0.0, Vec3::ONE),
    };
    let clouds = smoothstep(lo, hi, smooth_noise(cloud_uv * scale + Vec2::new(time * drift, 0.0))) * amount;
    mix3(sky, color, clouds * 0.6)
}

pub fn wave_intensity(uv: Vec2, time: f32, effects: &EffectParams) -> f32 {
    const WORLD_SCALE: f32 = 100.0;
    const TIME_SCALE: f32 = 0.3;
    let f = WORLD_SCALE * effects.wave_frequency;
    let t = time * TIME_SCALE * effects.wave_speed;
    let w1 = (uv.x * f + t).sin();
    let w2 = (uv.y * f * 0.7 + t * 0.8).sin();
    let w3 = ((uv.x + uv.y) * f * 0.5 + t * 1.2).sin();
    let w4 = ((uv.x - uv.y) * f * 0.3 + t * 0.6).sin();
    (w1 * 0.4 + w2 * 0.3 + w3 * 0.2 + w4 * 0.1) * 0.5 + 0.5
}

pub fn apply_wave(color: Vec3, water: f32, wave: f32, effects: &EffectParams) -> Vec3 {
    if water < 0.5 || !effects.enable_wave_effect {
        return color;
    }
    let brightness = 1.0 + (wave - 0.5) * effects.wave_amplitude * 0.02;
    let highlight = smoothstep(0.7, 0.95, wave) * effects.wave_amplitude * 0.02;
    mix3(color, color * brightness + Vec3::splat(highlight), water)
}

const SHADOW_TAPS: [(f32, f32); 8] = [
    (0.001, 0.20),
    (0.0025, 0.17),
    (0.004, 0.15),
    (0.006, 0.13),
    (0.008, 0.11),
    (0.010, 0.10),
    (0.013, 0.08),
    (0.016, 0.06),
];

/// Shadow multiplier from terrain that rises toward the light (which sits behind the camera).
pub fn height_shadow(height_map: &TextureData, uv: Vec2, height: f32, heading: f32, effects: &EffectParams) -> f32 {
    if !effects.enable_height_shadow {
        return 1.0;
    }
    let light_angle = heading + std::f32::consts::PI;
    let light = Vec2::new(light_angle.sin(), -light_angle.cos());
    let shadow: f32 = SHADOW_TAPS
        .iter()
        .map(|&(dist, weight)| {
            let p = uv + light * dist;
            let h = height_map.sample_rgba(p.x, p.y).x;
            smoothstep(0.0, 0.06, h - height) * weight
        })
        .sum();
    1.0 - shadow * effects.height_shadow_strength
}

/// Low ground hazes brighter and bluer; looking up strengthens it.
pub fn atmospheric_haze(color: Vec3, height: f32, pitch: f32, effects: &EffectParams) -> Vec3 {
    if !effects.enable_height_map {
        return color;
    }
    let pitch_factor = (1.0 + pitch * 2.0).clamp(0.3, 1.5);
    let haze = ((1.0 - height) * 0.4 * pitch_factor).clamp(0.0, 0.6);
    let mut out = color + Vec3::splat(haze * 0.4);
    out.z += haze * 0.12;
    out.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Landmark billboards covering this world position, composited in upload order.
pub fn landmark_color(world_pos: Vec2, world_size: Vec2, landmarks: &[LandmarkInstance], atlas: &TextureData) -> Vec4 {
    let mut out = Vec4::ZERO;
    for lm in landmarks {
        if lm.size <= 0.0 {
            continue;
        }
        let diff = wrapped_delta(lm.world_pos, world_pos, world_size);
        if diff.length() >= lm.size {
            continue;
        }
        let local = (diff / lm.size + Vec2::ONE) * 0.5;
        if local.cmplt(Vec2::ZERO).any() || local.cmpgt(Vec2::ONE).any() {
            continue;
        }
        let [u0, v0, u1, v1] = lm.uv;
        let uv = Vec2::new(u0, v0) + Vec2::new(u1 - u0, v1 - v0) * local;
        let tex = atlas.sample_clamped(uv.x, uv.y);
        if tex.w > 0.1 {
            out = out.lerp(tex, tex.w);
        }
    }
    out
}

/// Elliptical shadow under the airship (top-down view only).
pub fn camera_shadow(color: Vec3, world_pos: Vec2, camera: Vec2, world_size: Vec2, scan: f32) -> Vec3 {
    let delta = wrapped_delta(camera, world_pos, world_size);
    if delta.length() >= 50.0 {
        return color;
    }
    let d = delta / 50.0;
    let ellipse = d.x * d.x * 0.8 + d.y * d.y * 1.2;
    if ellipse >= 1.0 {
        return color;
    }
    let alpha = smoothstep(1.0, 0.1, ellipse) * 0.5 * (1.0 - scan * 0.3);
    mix3(color, Vec3::ZERO, alpha)
}

/// Ground pixel through steps 1–5 of the shading order (shared by both views).
fn shade_ground(hit: &GroundHit, ctx: &ShadeContext) -> Vec4 {
    let uv = hit.tex_coord;
    let water = ctx.textures.water.sample_rgba(uv.x, uv.y).x;
    let height = ctx.textures.height.sample_rgba(uv.x, uv.y).x;
    let base = ctx.textures.world.sample_rgba(uv.x, uv.y);

    let mut rgb = base.truncate();
    rgb = apply_wave(rgb, water, wave_intensity(uv, ctx.time, ctx.effects), ctx.effects);
    rgb *= height_shadow(ctx.textures.height, uv, height, ctx.camera.heading, ctx.effects);
    rgb = atmospheric_haze(rgb, height, ctx.camera.pitch, ctx.effects);

    let mut color = rgb.extend(base.w);
    let lm = landmark_color(hit.world_pos, ctx.world_size, ctx.landmarks, ctx.textures.atlas);
    if lm.w > 0.0 {
        color = color.lerp(lm, lm.w);
    }
    color
}

/// Borrowed state for shading one frame.
#[derive(Debug, Clone, Copy)]
pub struct ShadeContext<'a> {
    pub camera: &'a TransformState,
    pub time: f32,
    pub weather: u32,
    pub world_size: Vec2,
    pub landmarks: &'a [LandmarkInstance],
    pub textures: FieldTextures<'a>,
    pub effects: &'a EffectParams,
}

pub fn shade_perspective(uv: Vec2, ctx: &ShadeContext) -> Vec4 {
    match project_perspective(uv, ctx.camera, ctx.world_size) {
        ScreenSample::Sky { sky_y } => perspective_sky(uv, sky_y, ctx.camera, ctx.weather, ctx.time).extend(1.0),
        ScreenSample::Ground(hit) => {
            let color = shade_ground(&hit, ctx);
            let fogged = mix3(distance_fog_color(ctx.weather), color.truncate(), 1.0 - hit.scan * 0.3);
            fogged.extend(color.w)
        }
    }
}

pub fn shade_topdown(uv: Vec2, ctx: &ShadeContext) -> Vec4 {
    match project_topdown(uv, ctx.camera, ctx.world_size) {
        ScreenSample::Sky { sky_y } => topdown_sky(uv, sky_y, ctx.camera, ctx.weather, ctx.time).extend(1.0),
        ScreenSample::Ground(hit) => {
            let color = shade_ground(&hit, ctx);
            let shadowed = camera_shadow(color.truncate(), hit.world_pos, ctx.camera.position, ctx.world_size, hit.scan);
            shadowed.extend(color.w)
        }
    }
}

/// Field colour at a screen position, blending the two views by `view_blend`.
pub fn shade_field(uv: Vec2, view_blend: f32, ctx: &ShadeContext) -> Vec4 {
    if view_blend <= 0.0 {
        shade_perspective(uv, ctx)
    } else if view_blend >= 1.0 {
        shade_topdown(uv, ctx)
    } else {
        shade_perspective(uv, ctx).lerp(shade_topdown(uv, ctx), view_blend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen::Pixel;

    #[test]
    fn noise_is_deterministic_and_bounded() {
        for i in 0..50 {
            let p = Vec2::new(i as f32 * 0.37, i as f32 * 1.13);
            let n = smooth_noise(p);
            assert_eq!(n, smooth_noise(p));
            assert!((0.0..=1.0).contains(&n));
            assert!((0.0..1.0).contains(&fbm(p, 4)));
        }
    }

    #[test]
    fn waves_only_touch_water() {
        let effects = EffectParams::default();
        let c = Vec3::new(0.2, 0.4, 0.6);
        assert_eq!(apply_wave(c, 0.0, 0.9, &effects), c);
        assert_ne!(apply_wave(c, 1.0, 0.9, &effects), c);
        let off = EffectParams {
            enable_wave_effect: false,
            ..EffectParams::default()
        };
        assert_eq!(apply_wave(c, 1.0, 0.9, &off), c);
    }

    #[test]
    fn flat_height_map_casts_no_shadow() {
        let flat = TextureData::filled(4, 4, Pixel::grey(0.5));
        let s = height_shadow(&flat, Vec2::new(0.3, 0.3), 0.5, 1.0, &EffectParams::default());
        assert_eq!(s, 1.0);
    }

    #[test]
    fn higher_ground_toward_light_shadows() {
        // light sits behind a camera heading 0, i.e. toward +y
        let mut map = TextureData::filled(100, 100, Pixel::grey(0.2));
        for y in 51..60 {
            for x in 0..100 {
                map.set_pixel(x, y, Pixel::grey(0.9));
            }
        }
        let s = height_shadow(&map, Vec2::new(0.5, 0.505), 0.2, 0.0, &EffectParams::default());
        assert!(s < 1.0 && s >= 0.6, "shadow factor {}", s);
    }

    #[test]
    fn haze_lifts_low_ground() {
        let effects = EffectParams::default();
        let low = atmospheric_haze(Vec3::splat(0.2), 0.0, 0.0, &effects);
        let high = atmospheric_haze(Vec3::splat(0.2), 1.0, 0.0, &effects);
        assert!(low.x > high.x);
        assert!(low.z > low.x);
        assert_eq!(high, Vec3::splat(0.2));
    }

    #[test]
    fn camera_shadow_darkens_under_airship_only() {
        let world = Vec2::splat(10000.0);
        let c = Vec3::ONE;
        let under = camera_shadow(c, Vec2::new(5000.0, 5000.0), Vec2::new(5000.0, 5000.0), world, 0.2);
        assert!(under.x < 1.0);
        assert_eq!(camera_shadow(c, Vec2::new(5100.0, 5000.0), Vec2::new(5000.0, 5000.0), world, 0.2), c);
        let across_seam = camera_shadow(c, Vec2::new(5.0, 5000.0), Vec2::new(9995.0, 5000.0), world, 0.2);
        assert!(across_seam.x < 1.0);
    }

    #[test]
    fn landmark_footprint_samples_atlas_cell() {
        let mut atlas = TextureData::filled(8, 8, Pixel::TRANSPARENT);
        for y in 0..4 {
            for x in 0..4 {
                atlas.set_pixel(x, y, Pixel::new(255, 0, 0, 255));
            }
        }
        let lm = [LandmarkInstance {
            world_pos: Vec2::new(100.0, 100.0),
            size: 50.0,
            uv: [0.0, 0.0, 0.5, 0.5],
        }];
        let world = Vec2::splat(10000.0);
        let hit = landmark_color(Vec2::new(110.0, 95.0), world, &lm, &atlas);
        assert!(hit.w > 0.99 && hit.x > 0.99);
        assert_eq!(landmark_color(Vec2::new(200.0, 100.0), world, &lm, &atlas), Vec4::ZERO);
    }
}
