use std::path::Path;

use anyhow::anyhow;
use image::DynamicImage;

use crate::gpu::{GraphicsApi, SamplerParams, TextureFormat, TextureId};

/// Raw 8-bit pixels as handed over by an [`ImageDecoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

/// Turns an image file into pixels.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> anyhow::Result<DecodedImage>;
}

/**
 * Decoder backed by the `image` crate.
 *
 * Channels are kept as stored in the file (grey stays single-channel, RGB is
 * not padded to RGBA). Higher bit depths are narrowed to 8 bits per channel.
 */
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> anyhow::Result<DecodedImage> {
        let img = image::open(path)?;
        Ok(from_dynamic(img))
    }
}

pub fn from_dynamic(img: DynamicImage) -> DecodedImage {
    let (width, height) = (img.width(), img.height());
    let (channels, pixels) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLuma16(_) => (1, img.to_luma8().into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageLumaA16(_) => (2, img.to_luma_alpha8().into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => (3, img.to_rgb8().into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        _ => (4, img.to_rgba8().into_raw()),
    };
    DecodedImage {
        width,
        height,
        channels,
        pixels,
    }
}

/// Fills an allocated texture from decoded pixels.
///
/// Uploads level 0, builds the full mip chain and sets repeat wrapping with
/// trilinear minification. Images whose channel count has no matching format
/// are rejected before anything reaches the GPU.
pub fn upload_image<G: GraphicsApi + ?Sized>(
    gpu: &mut G,
    texture: TextureId,
    image: &DecodedImage,
) -> anyhow::Result<()> {
    let format = TextureFormat::from_channels(image.channels)
        .ok_or_else(|| anyhow!("unsupported channel count {}", image.channels))?;
    let expected = image.width as usize * image.height as usize * image.channels as usize;
    if image.pixels.len() != expected {
        anyhow::bail!(
            "expected {} bytes for a {}x{} image, got {}",
            expected,
            image.width,
            image.height,
            image.pixels.len()
        );
    }
    gpu.upload_texture_2d(texture, image.width, image.height, format, &image.pixels);
    gpu.generate_mipmap(texture);
    gpu.set_sampler(texture, SamplerParams::default());
    Ok(())
}

pub fn upload_from_file<G: GraphicsApi + ?Sized>(
    gpu: &mut G,
    texture: TextureId,
    file: &Path,
    decoder: &dyn ImageDecoder,
) -> anyhow::Result<()> {
    let image = decoder.decode(file)?;
    upload_image(gpu, texture, &image)
}

/// Loads a standalone texture that is not part of any model.
///
/// Follows the same lenient policy as the model texture cache: the handle is
/// returned even if the file could not be decoded.
pub fn load_texture<G: GraphicsApi + ?Sized>(
    file: &Path,
    decoder: &dyn ImageDecoder,
    gpu: &mut G,
) -> TextureId {
    let texture = gpu.create_texture();
    if let Err(e) = upload_from_file(gpu, texture, file, decoder) {
        log::error!("Texture failed to load at path {}: {:#}", file.display(), e);
    }
    texture
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Command, HeadlessGpu};

    fn image(channels: u8) -> DecodedImage {
        DecodedImage {
            width: 3,
            height: 2,
            channels,
            pixels: vec![7; 3 * 2 * channels as usize],
        }
    }

    fn uploaded_format(gpu: &HeadlessGpu) -> Option<TextureFormat> {
        gpu.commands().iter().find_map(|c| match c {
            Command::UploadTexture2d { format, .. } => Some(*format),
            _ => None,
        })
    }

    #[test]
    fn channel_count_selects_upload_format() {
        for (channels, format) in [
            (1, TextureFormat::Red),
            (3, TextureFormat::Rgb),
            (4, TextureFormat::Rgba),
        ] {
            let mut gpu = HeadlessGpu::new();
            let texture = gpu.create_texture();
            upload_image(&mut gpu, texture, &image(channels)).unwrap();
            assert_eq!(uploaded_format(&gpu), Some(format));
        }
    }

    #[test]
    fn upload_generates_mipmaps_and_sets_sampler() {
        let mut gpu = HeadlessGpu::new();
        let texture = gpu.create_texture();
        upload_image(&mut gpu, texture, &image(3)).unwrap();
        assert_eq!(
            &gpu.commands()[1..],
            &[
                Command::UploadTexture2d {
                    texture,
                    width: 3,
                    height: 2,
                    format: TextureFormat::Rgb,
                },
                Command::GenerateMipmap(texture),
                Command::SetSampler(texture, SamplerParams::default()),
            ]
        );
    }

    #[test]
    fn two_channel_images_are_rejected_without_upload() {
        let mut gpu = HeadlessGpu::new();
        let texture = gpu.create_texture();
        let err = upload_image(&mut gpu, texture, &image(2)).unwrap_err();
        assert!(err.to_string().contains("unsupported channel count 2"));
        assert_eq!(gpu.texture_uploads(), 0);
    }

    #[test]
    fn truncated_pixel_data_is_rejected() {
        let mut gpu = HeadlessGpu::new();
        let texture = gpu.create_texture();
        let mut img = image(4);
        img.pixels.pop();
        assert!(upload_image(&mut gpu, texture, &img).is_err());
    }

    #[test]
    fn missing_file_still_returns_an_allocated_handle() {
        let mut gpu = HeadlessGpu::new();
        let texture = load_texture(
            Path::new("definitely/not/here.png"),
            &ImageCrateDecoder,
            &mut gpu,
        );
        assert_ne!(texture, TextureId(0));
        assert_eq!(gpu.texture_uploads(), 0);
    }

    #[test]
    fn dynamic_images_keep_their_channel_count() {
        let grey = DynamicImage::ImageLuma8(image::GrayImage::new(2, 2));
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let rgba16 = DynamicImage::ImageRgba16(image::ImageBuffer::new(2, 2));

        assert_eq!(from_dynamic(grey).channels, 1);
        let rgb = from_dynamic(rgb);
        assert_eq!((rgb.channels, rgb.pixels.len()), (3, 12));
        let rgba = from_dynamic(rgba16);
        assert_eq!((rgba.channels, rgba.pixels.len()), (4, 16));
    }
}
