//! Asset loading and procedural content.
//!
//! This is the collaborator boundary: files are decoded here into plain
//! arrays, and only then turned into device storage through the wrapper
//! layer. Shader sources are loaded whole and handed over verbatim; OBJ
//! meshes are parsed and deduplicated by (position, uv) equality; images
//! are decoded with a 3-to-4 channel pad.

use std::collections::HashMap;
use std::path::Path;

use glam::{Mat4, Vec2, Vec3};

use crate::backend::types::{InternalFormat, PrimitiveMode, ScalarType, CubeFace};
use crate::context::Context;
use crate::error::{GraphicsError, Result};
use crate::mesh::{Mesh, VertexAttribute};
use crate::resources::{Texture, TextureOptions};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn make_empty() -> Self {
        Self {
            min: Vec3::INFINITY,
            max: Vec3::NEG_INFINITY,
        }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::make_empty();
        for point in points {
            aabb.extend(*point);
        }
        aabb
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.max + self.min)
    }

    /// Transformed box of the transformed corners.
    pub fn transform(&self, transform: Mat4) -> Self {
        let center = transform.transform_point3(self.center());
        let abs = glam::Mat3::from_cols(
            glam::Mat3::from_mat4(transform).x_axis.abs(),
            glam::Mat3::from_mat4(transform).y_axis.abs(),
            glam::Mat3::from_mat4(transform).z_axis.abs(),
        );
        let half_diagonal = 0.5 * (abs * self.diagonal());
        Self {
            min: center - half_diagonal,
            max: center + half_diagonal,
        }
    }
}

/// A mesh plus the bounds of its positions.
pub struct LoadedMesh {
    pub mesh: Mesh,
    pub aabb: Aabb,
}

/// Decoded interleaved pixels. Channel count is 1, 2 or 4; 3-channel
/// sources are padded on load.
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub channel_count: u32,
    pub pixels: Vec<u8>,
}

/// Load a whole file as a string (shader sources).
pub fn load_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|err| {
        log::error!("can't read {}", path.display());
        err.into()
    })
}

/// Decode an image file. Three-channel data is padded to four channels;
/// one- and two-channel data is kept as is.
pub fn load_image(path: impl AsRef<Path>) -> Result<ImageData> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|err| {
        log::warn!("can't load {}", path.display());
        GraphicsError::ImageDecode(err.to_string())
    })?;

    let (channel_count, width, height, pixels) = match image {
        image::DynamicImage::ImageLuma8(data) => {
            let (width, height) = data.dimensions();
            (1, width, height, data.into_raw())
        }
        image::DynamicImage::ImageLumaA8(data) => {
            let (width, height) = data.dimensions();
            (2, width, height, data.into_raw())
        }
        other => {
            let data = other.to_rgba8();
            let (width, height) = data.dimensions();
            (4, width, height, data.into_raw())
        }
    };
    Ok(ImageData {
        width,
        height,
        channel_count,
        pixels,
    })
}

/// Turn decoded pixels into a mipmapped 2D texture.
pub fn texture_from_image(ctx: &Context, image: &ImageData) -> Result<Texture> {
    let format = InternalFormat::from_channel_count(image.channel_count)?;
    Texture::make_2d(
        ctx,
        format,
        image.width,
        image.height,
        1,
        1,
        Some(&image.pixels),
        TextureOptions::AUTOMATIC_ALIGNMENT | TextureOptions::GENERATE_MIPMAP,
    )
}

/// Load an image file straight into a texture.
pub fn texture_from_file(ctx: &Context, path: impl AsRef<Path>) -> Result<Texture> {
    texture_from_image(ctx, &load_image(path)?)
}

/// Build a cubemap from a horizontal-cross image (4x3 face grid).
pub fn cubemap_from_cross(ctx: &Context, path: impl AsRef<Path>, format: InternalFormat) -> Result<Texture> {
    let image = load_image(path)?;
    let face_width = image.width / 4;
    let face_height = image.height / 3;
    let texture = Texture::make_cubemap(ctx, format, face_width, face_height, 1, TextureOptions::default())?;

    // Cross layout: +Y on top, the middle row is -X, +Z, +X, -Z, -Y below.
    const GRID: [(CubeFace, u32, u32); 6] = [
        (CubeFace::PositiveX, 2, 1),
        (CubeFace::NegativeX, 0, 1),
        (CubeFace::PositiveY, 1, 0),
        (CubeFace::NegativeY, 1, 2),
        (CubeFace::PositiveZ, 1, 1),
        (CubeFace::NegativeZ, 3, 1),
    ];

    let bpp = image.channel_count as usize;
    let mut face_pixels = vec![0u8; (face_width * face_height) as usize * bpp];
    for (face, grid_x, grid_y) in GRID {
        let x0 = (grid_x * face_width) as usize;
        let y0 = (grid_y * face_height) as usize;
        for row in 0..face_height as usize {
            let src = ((y0 + row) * image.width as usize + x0) * bpp;
            let dst = row * face_width as usize * bpp;
            face_pixels[dst..dst + face_width as usize * bpp]
                .copy_from_slice(&image.pixels[src..src + face_width as usize * bpp]);
        }
        texture.upload(&face_pixels, 0, 0, Some(face));
    }
    Ok(texture)
}

/// Build a triangle mesh from position/normal/uv/color arrays, the layout
/// every surface shader in the demo consumes.
pub fn triangle_mesh(
    ctx: &Context,
    indices: &[u32],
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    colors: &[Vec3],
) -> Result<Mesh> {
    let mut mesh = Mesh::new(ctx)?;
    mesh.set_indices(PrimitiveMode::Triangles, indices)?
        .set_vertex_attributes(&[
            VertexAttribute::from_slice(positions, ScalarType::F32, 3),
            VertexAttribute::from_slice(normals, ScalarType::F32, 3),
            VertexAttribute::from_slice(uvs, ScalarType::F32, 2),
            VertexAttribute::from_slice(colors, ScalarType::F32, 3),
        ])?;
    Ok(mesh)
}

#[derive(Default)]
struct ObjObject {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Vec3>,
    indices: Vec<u32>,
    dedup: HashMap<([u32; 3], [u32; 2]), u32>,
}

impl ObjObject {
    /// Deduplicate by (position, uv) bit equality.
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2, color: Vec3) {
        let key = (
            position.to_array().map(f32::to_bits),
            uv.to_array().map(f32::to_bits),
        );
        if let Some(&index) = self.dedup.get(&key) {
            self.indices.push(index);
        } else {
            let index = self.positions.len() as u32;
            self.positions.push(position);
            self.normals.push(normal);
            self.uvs.push(uv);
            self.colors.push(color);
            self.dedup.insert(key, index);
            self.indices.push(index);
        }
    }

    fn build(&self, ctx: &Context) -> Result<LoadedMesh> {
        Ok(LoadedMesh {
            mesh: triangle_mesh(
                ctx,
                &self.indices,
                &self.positions,
                &self.normals,
                &self.uvs,
                &self.colors,
            )?,
            aabb: Aabb::from_points(&self.positions),
        })
    }
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| GraphicsError::MeshParse(format!("bad number '{part}' on line {line}")))?;
    }
    if parts.len() < N {
        return Err(GraphicsError::MeshParse(format!(
            "expected {N} values on line {line}"
        )));
    }
    Ok(out)
}

fn resolve_index(raw: i64, len: usize, line: usize) -> Result<usize> {
    let index = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        len as i64 + raw
    } else {
        return Err(GraphicsError::MeshParse(format!("zero index on line {line}")));
    };
    if index < 0 || index as usize >= len {
        return Err(GraphicsError::MeshParse(format!(
            "index {raw} out of range on line {line}"
        )));
    }
    Ok(index as usize)
}

/// Load an OBJ file. Each `o`/`g` group with faces becomes one mesh;
/// vertices are deduplicated by (position, uv) equality; missing normals
/// default to +Z and missing texture coordinates to (0.5, 0.5).
pub fn load_obj(ctx: &Context, path: impl AsRef<Path>) -> Result<Vec<LoadedMesh>> {
    let text = std::fs::read_to_string(path.as_ref())?;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut colors: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();

    let mut meshes = Vec::new();
    let mut current = ObjObject::default();

    for (line_number, line) in text.lines().enumerate() {
        let line_number = line_number + 1;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();
        match keyword {
            "v" => {
                let v: [f32; 3] = parse_floats(&rest, line_number)?;
                positions.push(Vec3::from(v));
                colors.push(if rest.len() >= 6 {
                    let c: [f32; 3] = parse_floats(&rest[3..], line_number)?;
                    Vec3::from(c)
                } else {
                    Vec3::ONE
                });
            }
            "vn" => {
                let v: [f32; 3] = parse_floats(&rest, line_number)?;
                normals.push(Vec3::from(v));
            }
            "vt" => {
                let v: [f32; 2] = parse_floats(&rest, line_number)?;
                uvs.push(Vec2::from(v));
            }
            "o" | "g" => {
                if !current.indices.is_empty() {
                    meshes.push(current.build(ctx)?);
                    current = ObjObject::default();
                }
            }
            "f" => {
                if rest.len() < 3 {
                    return Err(GraphicsError::MeshParse(format!(
                        "face with fewer than 3 vertices on line {line_number}"
                    )));
                }
                let mut corners = Vec::with_capacity(rest.len());
                for corner in &rest {
                    let mut refs = corner.split('/');
                    let v: i64 = refs
                        .next()
                        .unwrap_or("")
                        .parse()
                        .map_err(|_| {
                            GraphicsError::MeshParse(format!("bad face corner on line {line_number}"))
                        })?;
                    let vt = refs.next().filter(|s| !s.is_empty()).map(str::parse::<i64>);
                    let vn = refs.next().filter(|s| !s.is_empty()).map(str::parse::<i64>);

                    let position_index = resolve_index(v, positions.len(), line_number)?;
                    let uv = match vt {
                        Some(Ok(raw)) => uvs[resolve_index(raw, uvs.len(), line_number)?],
                        _ => Vec2::splat(0.5),
                    };
                    let normal = match vn {
                        Some(Ok(raw)) => normals[resolve_index(raw, normals.len(), line_number)?],
                        _ => Vec3::Z,
                    };
                    corners.push((positions[position_index], normal, uv, colors[position_index]));
                }
                // Fan triangulation.
                for i in 1..corners.len() - 1 {
                    for &(position, normal, uv, color) in
                        [&corners[0], &corners[i], &corners[i + 1]]
                    {
                        current.push_vertex(position, normal, uv, color);
                    }
                }
            }
            _ => {}
        }
    }
    if !current.indices.is_empty() {
        meshes.push(current.build(ctx)?);
    }
    Ok(meshes)
}

/// Unit cube with per-face uvs.
pub fn make_cube(ctx: &Context) -> Result<LoadedMesh> {
    const TRIS: [[u32; 3]; 12] = [
        [0, 3, 1],
        [0, 2, 3],
        [4, 5, 7],
        [7, 6, 4],
        [8, 11, 9],
        [11, 8, 10],
        [12, 13, 15],
        [12, 15, 14],
        [16, 19, 17],
        [19, 16, 18],
        [20, 21, 23],
        [20, 23, 22],
    ];
    const FACES: [[usize; 4]; 6] = [
        [2, 3, 6, 7],
        [0, 1, 4, 5],
        [0, 2, 4, 6],
        [1, 3, 5, 7],
        [0, 1, 2, 3],
        [4, 5, 6, 7],
    ];
    const CORNERS: [Vec3; 8] = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
    ];

    let mut positions = vec![Vec3::ZERO; 24];
    let mut uvs = vec![Vec2::ZERO; 24];
    for (f, face) in FACES.iter().enumerate() {
        for (v, corner) in face.iter().enumerate() {
            positions[4 * f + v] = CORNERS[*corner];
            uvs[4 * f + v] = Vec2::new((v / 2) as f32, (v % 2) as f32);
        }
    }
    let indices: Vec<u32> = TRIS.iter().flatten().copied().collect();
    let normals = vec![Vec3::ONE.normalize(); 24];
    let colors = vec![Vec3::ONE; 24];

    Ok(LoadedMesh {
        aabb: Aabb::from_points(&positions),
        mesh: triangle_mesh(ctx, &indices, &positions, &normals, &uvs, &colors)?,
    })
}

/// Torus around the Z axis with major radius `major` and tube radius
/// `minor`.
pub fn make_torus(ctx: &Context, major: f32, minor: f32, precision: u32) -> Result<LoadedMesh> {
    let precision = precision.max(2);
    let ring = precision as usize + 1;
    let mut positions = vec![Vec3::ZERO; ring * precision as usize];
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let mut uvs = vec![Vec2::ZERO; positions.len()];

    let frac_uv = 1.0 / precision as f32;
    let tau = 2.0 * std::f32::consts::PI;

    let mut v = 0usize;
    for t in 0..precision {
        let theta = (2.0 * t as f32 / (precision - 1) as f32 + 1.0) * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();
        let section = Vec2::new(major + minor * cos_t, minor * sin_t);

        for p in 0..ring {
            let phi = p as f32 * frac_uv * tau;
            let (sin_p, cos_p) = phi.sin_cos();
            positions[v] = Vec3::new(section.x * cos_p, section.x * sin_p, section.y);
            normals[v] = Vec3::new(cos_t * cos_p, cos_t * sin_p, sin_t);
            uvs[v] = Vec2::new(t as f32 * frac_uv, p as f32 * frac_uv);
            v += 1;
        }
    }

    let mut indices = Vec::with_capacity(6 * precision as usize * (precision as usize - 1));
    for t in 0..precision as usize - 1 {
        for p in 0..precision as usize {
            let current = (p + ring * t) as u32;
            let next_in_row = current + 1;
            let next_in_col = current + ring as u32;
            let next_next = next_in_col + 1;
            indices.extend_from_slice(&[current, next_in_row, next_in_col]);
            indices.extend_from_slice(&[next_in_row, next_next, next_in_col]);
        }
    }

    let colors = vec![Vec3::ONE; positions.len()];
    Ok(LoadedMesh {
        aabb: Aabb::from_points(&positions),
        mesh: triangle_mesh(ctx, &indices, &positions, &normals, &uvs, &colors)?,
    })
}

/// Unit sphere, latitude/longitude tessellation.
pub fn make_sphere(ctx: &Context, precision: u32) -> Result<LoadedMesh> {
    let precision = precision.max(2);
    let ring = precision as usize + 1;
    let mut positions = vec![Vec3::ZERO; ring * precision as usize];
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let mut uvs = vec![Vec2::ZERO; positions.len()];

    let frac_p = 1.0 / precision as f32;
    let frac_t = 1.0 / (precision - 1) as f32;
    let tau = 2.0 * std::f32::consts::PI;

    let mut v = 0usize;
    for t in 0..precision {
        let theta = t as f32 * frac_t * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for p in 0..ring {
            let phi = p as f32 * frac_p * tau;
            let (sin_p, cos_p) = phi.sin_cos();
            positions[v] = Vec3::new(sin_t * cos_p, sin_t * sin_p, cos_t);
            normals[v] = positions[v];
            uvs[v] = Vec2::new(t as f32 * frac_t, p as f32 * frac_p);
            v += 1;
        }
    }

    let mut indices = Vec::with_capacity(6 * precision as usize * (precision as usize - 1));
    for t in 0..precision as usize - 1 {
        for p in 0..precision as usize {
            let current = (p + ring * t) as u32;
            let next_in_row = current + 1;
            let next_in_col = current + ring as u32;
            let next_next = next_in_col + 1;
            indices.extend_from_slice(&[current, next_in_col, next_in_row]);
            indices.extend_from_slice(&[next_in_row, next_in_col, next_next]);
        }
    }

    let colors = vec![Vec3::ONE; positions.len()];
    Ok(LoadedMesh {
        aabb: Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        },
        mesh: triangle_mesh(ctx, &indices, &positions, &normals, &uvs, &colors)?,
    })
}

/// Wireframe box outline of `aabb`, as a line-list mesh with positions
/// only.
pub fn make_aabb_lines(ctx: &Context, aabb: &Aabb) -> Result<Mesh> {
    const LINES: [[u32; 2]; 12] = [
        [0, 4],
        [5, 1],
        [4, 5],
        [0, 1],
        [2, 6],
        [7, 3],
        [6, 7],
        [2, 3],
        [0, 2],
        [1, 3],
        [4, 6],
        [5, 7],
    ];
    const UNIT: [Vec3; 8] = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
    ];

    let transform = Mat4::from_translation(aabb.center())
        * Mat4::from_scale(aabb.diagonal())
        * Mat4::from_translation(-Vec3::splat(0.5));
    let positions: Vec<Vec3> = UNIT.iter().map(|p| transform.transform_point3(*p)).collect();
    let indices: Vec<u32> = LINES.iter().flatten().copied().collect();

    let mut mesh = Mesh::new(ctx)?;
    mesh.set_indices(PrimitiveMode::Lines, &indices)?
        .set_vertex_attributes(&[VertexAttribute::from_slice(&positions, ScalarType::F32, 3)])?;
    Ok(mesh)
}

/// Checkerboard test pattern, RGBA8.
pub fn make_checkers(width: u32, height: u32, cell_size: u32) -> ImageData {
    let cell_size = cell_size.max(1);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let value = if (y / cell_size + x / cell_size) % 2 == 1 {
                255
            } else {
                0
            };
            pixels.extend_from_slice(&[value, value, value, value]);
        }
    }
    ImageData {
        width,
        height,
        channel_count: 4,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_extend_and_center() {
        let aabb = Aabb::from_points(&[Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, -2.0)]);
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(aabb.diagonal(), Vec3::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn test_obj_dedup_by_position_and_uv() {
        let ctx = Context::headless();
        let dir = std::env::temp_dir().join("glkit_obj_dedup");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quad.obj");
        // Two triangles sharing an edge: 6 corners, 4 unique (position, uv)
        // pairs.
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3\nf 1/1 3/3 4/4\n",
        )
        .unwrap();

        let meshes = load_obj(&ctx, &path).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].mesh.vertex_count(), 4);
        assert_eq!(meshes[0].mesh.index_count(), 6);
    }

    #[test]
    fn test_obj_groups_become_meshes() {
        let ctx = Context::headless();
        let dir = std::env::temp_dir().join("glkit_obj_groups");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("two.obj");
        std::fs::write(
            &path,
            "o first\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no second\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n",
        )
        .unwrap();

        let meshes = load_obj(&ctx, &path).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[1].aabb.center().z, 1.0);
    }

    #[test]
    fn test_procedural_shapes_are_consistent() {
        let ctx = Context::headless();
        let cube = make_cube(&ctx).unwrap();
        assert_eq!(cube.mesh.vertex_count(), 24);
        assert_eq!(cube.mesh.index_count(), 36);
        assert_eq!(cube.aabb.diagonal(), Vec3::splat(2.0));

        let sphere = make_sphere(&ctx, 8).unwrap();
        assert_eq!(sphere.mesh.vertex_count(), 9 * 8);
        assert_eq!(sphere.mesh.submesh_count(), 1);

        let torus = make_torus(&ctx, 1.0, 0.25, 8).unwrap();
        assert!(torus.aabb.diagonal().x > 2.0);
    }

    #[test]
    fn test_checkers_pattern() {
        let image = make_checkers(4, 4, 2);
        assert_eq!(image.pixels.len(), 64);
        // (0,0) cell is dark, (2,0) cell is light.
        assert_eq!(image.pixels[0], 0);
        assert_eq!(image.pixels[2 * 4], 255);
    }
}
