//! Screen-space weather effects, one per kind. Each depends only on the field image, time and
//! intensity. `shaders/weather.wgsl` holds the GPU versions.

use crate::shading::{mix3, smoothstep};
use glam::{Vec2, Vec3, Vec4};
use procgen::TextureData;
use world::WeatherKind;

fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn noise(p: Vec2) -> f32 {
    fract((p.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.5453)
}

fn rain_layer(uv: Vec2, scale: f32, speed: f32, seed: f32, time: f32) -> f32 {
    let mut st = uv * Vec2::new(scale, scale * 3.0);
    let id = st.floor();
    let n = noise(id + seed);
    let n2 = noise(id + seed + 100.0);
    let n3 = noise(id + seed + 200.0);
    let drop_speed = speed * (1.5 + n);
    st.y -= time * drop_speed * 2.0;
    st.x -= time * drop_speed * 0.3 * (0.5 + n2 * 0.5);
    let f = st - st.floor();

    let x_pos = 0.5 + (n - 0.5) * 0.6 + (time * 0.001 + n3 * 6.28).sin() * 0.1;
    let thickness = 0.008 + n2 * 0.008;
    let length = 0.3 + n3 * 0.4;
    let mut rain = 1.0 - smoothstep(0.0, thickness, (f.x - x_pos).abs());
    rain *= smoothstep(0.9, 0.9 - length * 0.1, f.y);
    rain *= 1.0 - smoothstep(length, 0.0, f.y);
    rain *= 0.4 + 0.6 * n2;
    if noise(id + seed + 50.0) < 0.1 + n * 0.2 {
        rain = 0.0;
    }
    rain
}

fn rain_streaks(uv: Vec2, time: f32) -> f32 {
    rain_layer(uv, 30.0, 0.03, 0.0, time) * 0.8
        + rain_layer(uv + 0.1, 20.0, 0.035, 10.0, time) * 0.6
        + rain_layer(uv + 0.2, 15.0, 0.04, 20.0, time) * 0.4
}

fn cloudy(base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let rain = rain_streaks(uv, time) * uv.y.max(0.0).powf(0.3) * intensity;
    mix3(base.truncate(), Vec3::new(0.7, 0.8, 0.9), rain * 0.05) * (0.7 + 0.3 * (1.0 - intensity))
}

fn rain(base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let rain = rain_streaks(uv, time) * uv.y.max(0.0).powf(0.3) * intensity;
    mix3(base.truncate(), Vec3::new(0.7, 0.8, 0.9), rain * 0.6) * (0.7 + 0.3 * (1.0 - intensity))
}

fn snowflake(p: Vec2, n: f32) -> f32 {
    let r = p.length();
    let mut snow = 1.0 - smoothstep(0.0, 0.12 + n * 0.06, r);
    snow += (1.0 - smoothstep(0.0, 0.05, r)) * 0.5;
    snow * (0.7 + 0.3 * n)
}

fn snow_layer(uv: Vec2, scale: f32, fall: f32, seed: f32, time: f32) -> f32 {
    let mut uv = uv * scale;
    let id = uv.floor();
    let n = noise(id + seed);
    let n2 = noise(id + seed + 100.0);
    let n3 = noise(id + seed + 200.0);
    let n4 = noise(id + seed + 300.0);

    let fall_speed = fall * (1.5 + n);
    uv.y -= fall_speed;
    let wind = (time * 0.0002 + n2 * 3.14).sin() * 0.3;
    uv.x += wind * (0.5 + n3 * 0.5);

    let mut f = uv - uv.floor() - Vec2::splat(0.5);
    let sway = 0.1 + n2 * 0.15;
    let sway_freq = 1.5 + n3 * 1.5;
    f.x += (fall_speed * sway_freq + n * 6.28).sin() * sway;
    f.y += (fall_speed * 0.8 + n4 * 6.28).sin() * 0.05;

    let offset = Vec2::new(n - 0.5, n2 - 0.5) * 0.3;
    let mut snow = snowflake((f + offset) * (1.5 + n3 * 1.5), n) * (0.3 + 0.7 * n4);
    let cluster = noise(id * 0.3 + seed + 400.0);
    if noise(id + seed + 200.0) < 0.05 + cluster * 0.15 {
        snow = 0.0;
    }
    snow
}

/// `(scale, fall rate, seed, offset, weight)` for far, middle and near flakes.
const SNOW_LAYERS: [(f32, f32, f32, f32, f32); 9] = [
    (80.0, 0.0015, 0.0, 0.0, 0.8),
    (70.0, 0.0012, 30.0, 0.05, 0.7),
    (60.0, 0.0013, 60.0, 0.03, 0.6),
    (45.0, 0.002, 10.0, 0.0, 1.0),
    (40.0, 0.0018, 40.0, 0.1, 0.9),
    (35.0, 0.0019, 70.0, 0.07, 0.8),
    (25.0, 0.003, 20.0, 0.0, 1.5),
    (20.0, 0.0025, 50.0, 0.15, 1.3),
    (18.0, 0.0028, 80.0, 0.12, 1.2),
];

fn snow(base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let depth = uv.y.max(0.0).powf(0.7);
    let flakes: f32 = SNOW_LAYERS
        .iter()
        .map(|&(scale, rate, seed, offset, weight)| snow_layer(uv + offset, scale, time * rate, seed, time) * weight)
        .sum();
    let amount = (flakes * depth * intensity).clamp(0.0, 0.85);
    let color = mix3(base.truncate(), Vec3::new(0.94, 0.96, 1.0), amount);
    color * (1.0 - (1.0 - uv.y) * 0.3 * intensity)
}

fn storm_rain(uv: Vec2, scale: f32, speed: f32, time: f32) -> f32 {
    let mut st = uv * Vec2::new(scale, scale * 3.0);
    st.y -= time * speed * 2.0;
    st.x -= st.y * 0.3 + (time * 0.5).sin() * 0.1;
    let id = st.floor();
    let f = st - id;
    let n = noise(id);

    let drop = Vec2::new(0.5 + (n - 0.5) * 0.3, 0.9);
    let head = 1.0 - smoothstep(0.0, 0.05, f.distance(drop));
    let mut trail = 1.0 - smoothstep(0.0, 0.03, (f.x - drop.x + (f.y - drop.y) * 0.3).abs());
    trail *= smoothstep(0.0, 0.1, f.y) * smoothstep(1.0, 0.8, f.y);
    let rain = head.max(trail * 0.9);
    if noise(id + 100.0) < 0.1 {
        0.0
    } else {
        rain
    }
}

fn lightning(uv: Vec2, time: f32) -> f32 {
    let t = fract(time * 0.1);
    if !(0.95..=0.97).contains(&t) {
        return 0.0;
    }
    let x = uv.x + (uv.y * 15.0).sin() * 0.03;
    let mut bolt = 1.0 - smoothstep(0.0, 0.02, (x - 0.5).abs());
    bolt *= smoothstep(0.0, 0.2, uv.y) * smoothstep(1.0, 0.2, uv.y);
    let mut branch = 1.0 - smoothstep(0.0, 0.015, (x - 0.6 + uv.y * 0.1).abs());
    branch *= smoothstep(0.2, 0.4, uv.y) * smoothstep(0.8, 0.4, uv.y);
    bolt.max(branch)
}

fn storm(base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let rain = (storm_rain(uv, 80.0, 0.8, time) * 0.9
        + storm_rain(uv + 0.1, 60.0, 0.7, time) * 0.7
        + storm_rain(uv + 0.2, 40.0, 0.6, time) * 0.5)
        * intensity;
    let bolt = lightning(uv, time);
    let mut color = mix3(base.truncate(), Vec3::new(0.5, 0.6, 0.7), rain * 0.7);
    color += Vec3::new(1.0, 1.0, 0.9) * bolt * 2.0;
    color * (0.5 + bolt * 1.5)
}

fn sand_particle(uv: Vec2, scale: f32, wind: Vec2, time: f32) -> f32 {
    let mut st = uv * scale;
    st.x += time * wind.x;
    st.y += time * wind.y + (st.x * 2.0).sin() * 0.1;
    let id = st.floor();
    let f = st - id;
    let n = noise(id);
    let offset = Vec2::new(noise(id + 1.0), noise(id + 2.0)) - Vec2::splat(0.5);
    let pos = Vec2::splat(0.5) + offset * 0.3;
    let mut particle = 1.0 - smoothstep(0.0, 0.05 + n * 0.05, f.distance(pos));
    if noise(id + 100.0) < 0.4 {
        particle = 0.0;
    }
    particle * (0.5 + noise(id + time * 0.001) * 0.5)
}

fn sandstorm(frame: &TextureData, base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let distortion = Vec2::new(
        (uv.y * 10.0 + time * 0.002).sin() * 0.01,
        (uv.x * 10.0 + time * 0.003).cos() * 0.005,
    );
    let d = uv + distortion * intensity;
    let warped = base.lerp(frame.sample_clamped(d.x, d.y), 0.5);

    let sand = (sand_particle(uv, 30.0, Vec2::new(0.02, 0.001), time) * 0.4
        + sand_particle(uv + 0.1, 20.0, Vec2::new(0.025, 0.002), time) * 0.6
        + sand_particle(uv + 0.2, 15.0, Vec2::new(0.03, 0.003), time) * 0.8)
        * intensity;
    let sand_color = Vec3::new(0.9, 0.7, 0.4);
    let color = mix3(warped.truncate(), sand_color, sand * 0.6);
    mix3(sand_color * 0.5, color, 1.0 - intensity * 0.5)
}

fn value_fbm(mut p: Vec2) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..4 {
        value += noise(p) * amplitude;
        amplitude *= 0.5;
        p *= 2.0;
    }
    value
}

fn fog_layer(uv: Vec2, scale: f32, speed: Vec2, density: f32, time: f32) -> f32 {
    let st = uv * scale + speed * time;
    smoothstep(0.4 - density * 0.2, 0.6 + density * 0.2, value_fbm(st))
}

fn fog(base: Vec4, uv: Vec2, time: f32, intensity: f32) -> Vec3 {
    let layers = fog_layer(uv, 2.0, Vec2::new(0.0001, 0.00005), 0.3, time) * 0.4
        + fog_layer(uv, 3.0, Vec2::new(-0.00015, 0.0001), 0.5, time) * 0.6
        + fog_layer(uv, 5.0, Vec2::new(0.0002, -0.00005), 0.7, time) * 0.8;
    let amount = layers * uv.y.max(0.0).sqrt() * intensity;
    let fog_color = Vec3::new(0.7, 0.75, 0.8);
    let color = mix3(base.truncate(), fog_color, (amount * 0.8).clamp(0.0, 0.9));
    mix3(color, fog_color, intensity * 0.2)
}

/// Weather effect at screen position `uv` over the finished field image.
pub fn apply_weather(kind: WeatherKind, frame: &TextureData, uv: Vec2, time: f32, intensity: f32) -> Vec4 {
    let base = frame.sample_clamped(uv.x, uv.y);
    let rgb = match kind {
        WeatherKind::Clear => return base,
        WeatherKind::Cloudy => cloudy(base, uv, time, intensity),
        WeatherKind::Rain => rain(base, uv, time, intensity),
        WeatherKind::Snow => snow(base, uv, time, intensity),
        WeatherKind::Storm => storm(base, uv, time, intensity),
        WeatherKind::Sandstorm => sandstorm(frame, base, uv, time, intensity),
        WeatherKind::Fog => fog(base, uv, time, intensity),
    };
    rgb.extend(base.w)
}

/// WGSL fragment entry point for each kind; `None` for clear skies.
pub fn entry_point(kind: WeatherKind) -> Option<&'static str> {
    match kind {
        WeatherKind::Clear => None,
        WeatherKind::Cloudy => Some("fs_cloudy"),
        WeatherKind::Rain => Some("fs_rain"),
        WeatherKind::Snow => Some("fs_snow"),
        WeatherKind::Storm => Some("fs_storm"),
        WeatherKind::Sandstorm => Some("fs_sandstorm"),
        WeatherKind::Fog => Some("fs_fog"),
    }
}
