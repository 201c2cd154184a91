use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use mesh_ngin::resources::{
    scene::{ImportedScene, SceneImporter, SceneMaterial, SceneMesh, SceneNode},
    texture::{DecodedImage, ImageDecoder},
};

static NEXT_FIXTURE: AtomicUsize = AtomicUsize::new(0);

/// A scratch directory for file-backed tests, removed on drop.
pub struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "mesh-ngin-{}-{}-{}",
            name,
            std::process::id(),
            NEXT_FIXTURE.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).expect("failed to create fixture directory");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    /// Writes a `width`×`height` PNG with the given channel count (1 to 4).
    pub fn write_png(&self, name: &str, width: u32, height: u32, channels: u8) -> PathBuf {
        let path = self.path(name);
        let image = match channels {
            1 => image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
                width,
                height,
                image::Luma([200]),
            )),
            2 => image::DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(
                width,
                height,
                image::LumaA([200, 255]),
            )),
            3 => image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
                width,
                height,
                image::Rgb([200, 100, 50]),
            )),
            4 => image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([200, 100, 50, 255]),
            )),
            other => panic!("no PNG colour type with {} channels", other),
        };
        image.save(&path).expect("failed to write PNG fixture");
        path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Decoder that never touches the disk and records every request.
pub struct CountingDecoder {
    pub channels: u8,
    requests: RefCell<Vec<PathBuf>>,
}

impl CountingDecoder {
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PathBuf> {
        self.requests.borrow().clone()
    }
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, path: &Path) -> anyhow::Result<DecodedImage> {
        self.requests.borrow_mut().push(path.to_path_buf());
        Ok(DecodedImage {
            width: 2,
            height: 2,
            channels: self.channels,
            pixels: vec![255; 4 * self.channels as usize],
        })
    }
}

/// Importer returning a prepared scene regardless of the path.
pub struct StubImporter(pub ImportedScene);

impl SceneImporter for StubImporter {
    fn import(&self, _path: &Path) -> anyhow::Result<ImportedScene> {
        Ok(self.0.clone())
    }
}

/// A quad split into two triangles, without texture coordinates.
pub fn quad(name: &str, material: Option<usize>) -> SceneMesh {
    SceneMesh {
        name: name.to_string(),
        positions: vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        tex_coords: Vec::new(),
        faces: vec![vec![0, 1, 2], vec![0, 2, 3]],
        material,
    }
}

/// `count` materials that all name `diffuse_path`, each used by one quad under the root.
pub fn shared_texture_scene(count: usize, diffuse_path: &str) -> ImportedScene {
    let materials = (0..count)
        .map(|i| SceneMaterial {
            name: format!("material{}", i),
            diffuse: vec![diffuse_path.to_string()],
            specular: Vec::new(),
        })
        .collect();
    let meshes = (0..count).map(|i| quad(&format!("quad{}", i), Some(i))).collect();
    ImportedScene {
        incomplete: false,
        root: Some(SceneNode::new("root").with_meshes(0..count)),
        meshes,
        materials,
    }
}

pub const CUBE_OBJ: &str = "\
mtllib cube.mtl
o cube
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
vn 0.0 0.0 -1.0
vn 1.0 0.0 0.0
vn -1.0 0.0 0.0
vn 0.0 1.0 0.0
vn 0.0 -1.0 0.0
usemtl crate
f 1/1/1 2/2/1 3/3/1 4/4/1
f 6/1/2 5/2/2 8/3/2 7/4/2
f 2/1/3 6/2/3 7/3/3 3/4/3
f 5/1/4 1/2/4 4/3/4 8/4/4
f 4/1/5 3/2/5 7/3/5 8/4/5
f 5/1/6 6/2/6 2/3/6 1/4/6
";

pub const CUBE_MTL: &str = "\
newmtl crate
map_Kd crate_diffuse.png
map_Ks crate_specular.png
";

/// Writes the cube with its material and both textures, returning the OBJ path.
pub fn write_cube(fixture: &Fixture) -> PathBuf {
    fixture.write("cube.mtl", CUBE_MTL);
    fixture.write_png("crate_diffuse.png", 4, 4, 3);
    fixture.write_png("crate_specular.png", 4, 4, 1);
    fixture.write("cube.obj", CUBE_OBJ)
}
