// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The uniform block a camera node writes each frame.

use bytemuck::{Pod, Zeroable};
use strata_data::graph::CameraNode;

/// Camera matrices as laid out in a `std140` uniform block, column major.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// View to clip, Vulkan depth range `[0, 1]`, y pointing down.
    pub projection: [[f32; 4]; 4],
    /// `projection * view`.
    pub view_projection: [[f32; 4]; 4],
    /// Eye position; `w` is 1.
    pub eye: [f32; 4],
}

impl CameraUniform {
    /// Size of the block in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Computes the block for `camera` seen through a surface of the given
    /// aspect ratio (width / height).
    pub fn new(camera: &CameraNode, aspect: f32) -> Self {
        let view = look_at(camera.eye, camera.target, camera.up);
        let projection = perspective(
            camera.fov_y_degrees.to_radians(),
            aspect,
            camera.near,
            camera.far,
        );
        Self {
            view,
            projection,
            view_projection: multiply(&projection, &view),
            eye: [camera.eye[0], camera.eye[1], camera.eye[2], 1.0],
        }
    }

    /// The bytes written to the uniform buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let length = dot(v, v).sqrt();
    if length <= f32::EPSILON {
        return v;
    }
    [v[0] / length, v[1] / length, v[2] / length]
}

// Right-handed view matrix.
fn look_at(eye: [f32; 3], target: [f32; 3], up: [f32; 3]) -> [[f32; 4]; 4] {
    let forward = normalize(sub(target, eye));
    let side = normalize(cross(forward, up));
    let up = cross(side, forward);
    [
        [side[0], up[0], -forward[0], 0.0],
        [side[1], up[1], -forward[1], 0.0],
        [side[2], up[2], -forward[2], 0.0],
        [-dot(side, eye), -dot(up, eye), dot(forward, eye), 1.0],
    ]
}

fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> [[f32; 4]; 4] {
    let focal = 1.0 / (fov_y / 2.0).tan();
    let aspect = if aspect > 0.0 { aspect } else { 1.0 };
    let depth = far / (near - far);
    [
        [focal / aspect, 0.0, 0.0, 0.0],
        [0.0, -focal, 0.0, 0.0],
        [0.0, 0.0, depth, -1.0],
        [0.0, 0.0, near * depth, 0.0],
    ]
}

fn multiply(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (column, out_column) in out.iter_mut().enumerate() {
        for (row, value) in out_column.iter_mut().enumerate() {
            *value = (0..4).map(|k| a[k][row] * b[column][k]).sum();
        }
    }
    out
}
