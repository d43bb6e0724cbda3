//! Putting one image on the panel.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::info;
use usbscreen_core::{ControlDevice, Mixer, ScreenError, effect_by_name};

use crate::config::{DisplayConfig, DrawConfig};

/// Scale `image` to cover `width`×`height` and crop the overflow evenly
/// from both sides.
pub fn fill(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    image
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .to_rgba8()
}

/// Power the panel on and apply backlight and orientation.
pub async fn setup(
    device: &mut dyn ControlDevice,
    display: &DisplayConfig,
) -> Result<(), ScreenError> {
    device.startup().await?;
    device.set_light(display.light).await?;
    device
        .set_rotate(display.landscape, display.invert)
        .await?;
    device.set_mirror(display.mirror).await?;
    let (light, landscape, invert, mirror) =
        (display.light, display.landscape, display.invert, display.mirror);
    info!(
        light,
        landscape,
        invert,
        mirror,
        "display configured"
    );
    Ok(())
}

/// Configure the panel and draw `image` through the mixer.
///
/// Returns the device so the caller can keep using it.
pub async fn present(
    device: Box<dyn ControlDevice>,
    config: &DrawConfig,
    image: &RgbaImage,
) -> Result<Box<dyn ControlDevice>, ScreenError> {
    let effects = config
        .mixer
        .effects
        .iter()
        .map(|name| effect_by_name(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut mixer = Mixer::new(device).with_effects(effects);
    setup(mixer.device_mut(), &config.display).await?;
    mixer.canvas(image).await?;
    info!(w = image.width(), h = image.height(), "image drawn");

    Ok(mixer.into_device())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tokio_test::assert_ok;
    use usbscreen_core::MockDevice;
    use usbscreen_core::device::DeviceCall;

    #[test]
    fn fill_covers_target() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            1920,
            1080,
            Rgba([9, 9, 9, 255]),
        ));
        let out = fill(&wide, 320, 480);
        assert_eq!(out.dimensions(), (320, 480));
        assert_eq!(*out.get_pixel(160, 240), Rgba([9, 9, 9, 255]));
    }

    #[tokio::test]
    async fn configures_then_draws() {
        let recorder = MockDevice::new();
        let mut config = DrawConfig::default();
        config.display.landscape = true;
        config.display.light = 40;
        let img = RgbaImage::new(480, 320);

        assert_ok!(present(Box::new(recorder.clone()), &config, &img).await);

        let calls = recorder.calls();
        assert_eq!(calls[0], DeviceCall::Startup);
        assert_eq!(calls[1], DeviceCall::SetLight(40));
        assert_eq!(
            calls[2],
            DeviceCall::SetRotate {
                landscape: true,
                invert: false
            }
        );
        assert_eq!(calls[3], DeviceCall::SetMirror(false));
        assert_eq!(recorder.draws(), vec![(0, 0, 480, 320)]);
    }

    #[tokio::test]
    async fn block_effect_from_config() {
        let recorder = MockDevice::new();
        let mut config = DrawConfig::default();
        config.mixer.effects = vec!["block".into()];

        present(Box::new(recorder.clone()), &config, &RgbaImage::new(320, 480))
            .await
            .unwrap();

        let area: u32 = recorder.draws().iter().map(|&(_, _, w, h)| w * h).sum();
        assert_eq!(area, 320 * 480);
        assert!(recorder.draws().len() > 1);
    }

    #[tokio::test]
    async fn unknown_effect_fails_before_drawing() {
        let recorder = MockDevice::new();
        let mut config = DrawConfig::default();
        config.mixer.effects = vec!["sparkle".into()];

        let result = present(Box::new(recorder.clone()), &config, &RgbaImage::new(1, 1)).await;
        assert!(result.is_err());
        assert!(recorder.calls().is_empty());
    }
}
