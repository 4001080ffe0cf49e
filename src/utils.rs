use wgpu::util::DeviceExt;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// GPU buffers for a mesh that is rewritten every frame. Buffers grow when
/// the mesh outgrows them and are reused otherwise.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    vertex_capacity: usize,
    index_capacity: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Append another mesh, rebasing its indices
    pub fn extend_from(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
            vertex_capacity: self.vertices.len(),
            index_capacity: self.indices.len(),
        }
    }
}

impl MeshBuffer {
    /// Write `mesh` into the buffers, reallocating only when it does not fit
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, mesh: &Mesh) {
        if mesh.vertices.len() > self.vertex_capacity || mesh.indices.len() > self.index_capacity {
            *self = mesh.upload(device);
            return;
        }
        if !mesh.vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
        }
        if !mesh.indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.index_count = mesh.indices.len() as u32;
    }
}

/// Flat square on the y = 0 plane centered at the origin
pub fn create_ground_mesh(size: f32, color: [f32; 4]) -> Mesh {
    let h = size / 2.0;
    let normal = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex { pos: [-h, 0.0, -h], normal, color },
        Vertex { pos: [h, 0.0, -h], normal, color },
        Vertex { pos: [h, 0.0, h], normal, color },
        Vertex { pos: [-h, 0.0, h], normal, color },
    ];
    // Counter-clockwise when seen from above
    let indices = vec![0, 2, 1, 0, 3, 2];
    Mesh { vertices, indices }
}

/// Convert a 0xRRGGBB color to linear-ish RGBA floats
pub fn hex_color(rgb: u32) -> [f32; 4] {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
        1.0,
    ]
}
