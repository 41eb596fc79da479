//! WGSL for the two GPU passes.
//!
//! The simulation pass is a compute shader over the N×N state texture; the
//! render pass draws one instanced quad per particle and reads its position
//! from the freshly written state texture in the vertex stage.
//!
//! Bindings:
//!
//! | pass       | group | binding | resource                                  |
//! |------------|-------|---------|-------------------------------------------|
//! | simulation | 0     | 0       | read-role state, `texture_2d<f32>`        |
//! | simulation | 0     | 1       | write-role state, `rgba32float` storage   |
//! | simulation | 1     | 0       | `SimUniforms`                             |
//! | simulation | 1     | 1       | video frame, `texture_2d<f32>`            |
//! | simulation | 1     | 2       | video sampler                             |
//! | render     | 0     | 0       | `RenderUniforms`                          |
//! | render     | 0     | 1       | latest state, `texture_2d<f32>`           |

use crate::field::LUMA_WEIGHTS;
use crate::noise::PHASE_OFFSETS;

/// Compute workgroup edge; the simulation dispatches `ceil(N / 8)²` groups.
pub const WORKGROUP_SIZE: u32 = 8;

/// 3D simplex noise, mirrored by [`crate::noise::simplex3`].
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.79284291400159 - 0.85373472095314 * r;
}

fn snoise(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);
    let D = vec4<f32>(0.0, 0.5, 1.0, 2.0);

    var i = floor(v + dot(v, vec3<f32>(C.y)));
    let x0 = v - i + dot(i, vec3<f32>(C.x));

    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - D.yyy;

    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    let n_ = 1.0 / 7.0;
    let ns = n_ * D.wyz - D.xzx;

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let d = vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3));
    var m = max(0.6 - d, vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}
"#;

/// Generate the simulation compute shader.
pub fn simulation_shader() -> String {
    let [lr, lg, lb] = LUMA_WEIGHTS;
    let [o0, o1, o2] = PHASE_OFFSETS;
    let wg = WORKGROUP_SIZE;

    format!(
        r#"struct SimUniforms {{
    extent: vec2<f32>,
    time: f32,
    noise_amplitude: f32,
    noise_scale: f32,
    noise_time_scale: f32,
    z_scale: f32,
    z_smoothing: f32,
    xy_smoothing: f32,
    field_enabled: u32,
    resolution: u32,
    _padding: u32,
}};

@group(0) @binding(0)
var current_state: texture_2d<f32>;

@group(0) @binding(1)
var next_state: texture_storage_2d<rgba32float, write>;

@group(1) @binding(0)
var<uniform> sim: SimUniforms;

@group(1) @binding(1)
var video: texture_2d<f32>;

@group(1) @binding(2)
var video_sampler: sampler;

{NOISE_WGSL}

fn luma(rgb: vec3<f32>) -> f32 {{
    return dot(rgb, vec3<f32>({lr:?}, {lg:?}, {lb:?}));
}}

// Zero when no frame is bound or the point maps outside the frame.
fn field_luminance(world: vec2<f32>) -> f32 {{
    if sim.field_enabled == 0u {{
        return 0.0;
    }}
    let mapped = world / sim.extent + 0.5;
    if mapped.x < 0.0 || mapped.x > 1.0 || mapped.y < 0.0 || mapped.y > 1.0 {{
        return 0.0;
    }}
    // Mirror horizontally; frame rows are uploaded top row first.
    let uv = vec2<f32>(1.0 - mapped.x, 1.0 - mapped.y);
    return luma(textureSampleLevel(video, video_sampler, uv, 0.0).rgb);
}}

@compute @workgroup_size({wg}, {wg})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let n = sim.resolution;
    if global_id.x >= n || global_id.y >= n {{
        return;
    }}

    let texel = vec2<i32>(global_id.xy);
    var pos = textureLoad(current_state, texel, 0).xyz;
    let home = (vec2<f32>(global_id.xy) / f32(n) - 0.5) * sim.extent;

    let q = pos.xy * sim.noise_scale;
    let t = sim.time * sim.noise_time_scale;
    let drift = vec3<f32>(
        snoise(vec3<f32>(q, t + {o0:?})),
        snoise(vec3<f32>(q, t + {o1:?})),
        snoise(vec3<f32>(q, t + {o2:?}))
    );
    pos += drift * sim.noise_amplitude;

    let target_z = field_luminance(pos.xy) * sim.z_scale;
    pos.z += (target_z - pos.z) * sim.z_smoothing;

    let settled = pos.xy + (home - pos.xy) * sim.xy_smoothing;
    textureStore(next_state, texel, vec4<f32>(settled, pos.z, 1.0));
}}
"#
    )
}

/// Generate the point sprite render shader.
pub fn render_shader() -> String {
    r#"struct RenderUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    far_color: vec4<f32>,
    near_color: vec4<f32>,
    viewport: vec2<f32>,
    base_size: f32,
    distance_scale: f32,
    z_range: vec2<f32>,
    opacity_floor: f32,
    _padding: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: RenderUniforms;

@group(0) @binding(1)
var positions: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) alpha: f32,
    @location(2) sprite: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) grid_uv: vec2<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let corner = corners[vertex_index];

    let dims = vec2<f32>(textureDimensions(positions));
    let texel = vec2<i32>(round(grid_uv * dims));
    let pos = textureLoad(positions, texel, 0).xyz;

    let view_pos = uniforms.view * vec4<f32>(pos, 1.0);
    var clip = uniforms.proj * view_pos;

    // Quad spans `size` pixels: half-extent in NDC is size / viewport.
    let size = uniforms.base_size * (uniforms.distance_scale / -view_pos.z);
    clip.x += corner.x * size / uniforms.viewport.x * clip.w;
    clip.y += corner.y * size / uniforms.viewport.y * clip.w;

    let ramp = smoothstep(uniforms.z_range.x, uniforms.z_range.y, pos.z);

    var out: VertexOutput;
    out.clip_position = clip;
    out.color = mix(uniforms.far_color.rgb, uniforms.near_color.rgb, ramp);
    out.alpha = uniforms.opacity_floor + (1.0 - uniforms.opacity_floor) * ramp;
    out.sprite = corner * 0.5;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.sprite);
    if dist > 0.5 {
        discard;
    }
    let falloff = 1.0 - dist * 2.0;
    return vec4<f32>(in.color, in.alpha * falloff * falloff);
}
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_shader_embeds_constants() {
        let src = simulation_shader();
        assert!(src.contains("@workgroup_size(8, 8)"));
        assert!(src.contains("fn snoise("));
        assert!(src.contains("0.299"));
        assert!(src.contains("t + 100.0"));
        assert!(src.contains("t + 200.0"));
        assert!(src.contains("texture_storage_2d<rgba32float, write>"));
    }

    #[test]
    fn test_render_shader_entry_points() {
        let src = render_shader();
        assert!(src.contains("fn vs_main("));
        assert!(src.contains("fn fs_main("));
        assert!(src.contains("discard;"));
    }
}
