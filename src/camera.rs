//! OpenCV webcam as a live [`VideoSource`] and a [`StillCapture`].

use crate::utils::image_conversion::bgr_mat_to_rgb_image;
use crate::video::{StillCapture, StillRequest, VideoFrame, VideoSource};
use crate::{Error, Result};
use image::DynamicImage;
use log::{debug, info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

/// Frames grabbed and discarded after a resolution change
const STILL_WARMUP_FRAMES: usize = 2;

/// Live camera preview
pub struct CameraSource {
    capture: Rc<RefCell<VideoCapture>>,
    index: i32,
    sequence: u64,
}

impl CameraSource {
    /// Open the camera with the given index
    pub fn open(index: i32) -> Result<Self> {
        info!("Opening camera {index}");
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::InvalidInput(format!("camera {index} could not be opened")));
        }

        // Reduce buffer size for lower latency
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        Ok(Self {
            capture: Rc::new(RefCell::new(capture)),
            index,
            sequence: 0,
        })
    }

    /// Still capture sharing this camera
    pub fn still_handle(&self) -> CameraStill {
        CameraStill {
            capture: Rc::clone(&self.capture),
        }
    }
}

impl VideoSource for CameraSource {
    fn is_ready(&self) -> bool {
        self.capture.borrow().is_opened().unwrap_or(false)
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        let mut mat = Mat::default();
        match self.capture.borrow_mut().read(&mut mat) {
            Ok(true) if !mat.empty() => {}
            Ok(_) => return None,
            Err(e) => {
                warn!("Camera {} read failed: {e}", self.index);
                return None;
            }
        }

        match bgr_mat_to_rgb_image(&mat) {
            Ok(pixels) => {
                self.sequence += 1;
                Some(VideoFrame::new(self.sequence, pixels))
            }
            Err(e) => {
                debug!("Dropping undecodable camera frame: {e}");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "camera"
    }
}

/// Full resolution still from a shared camera, encoded as PNG
pub struct CameraStill {
    capture: Rc<RefCell<VideoCapture>>,
}

/// Capture resolution of a device, in pixels.
trait ResolutionControl {
    fn frame_size(&self) -> Result<(f64, f64)>;
    fn set_frame_size(&mut self, size: (f64, f64)) -> Result<()>;
}

impl ResolutionControl for VideoCapture {
    fn frame_size(&self) -> Result<(f64, f64)> {
        Ok((self.get(CAP_PROP_FRAME_WIDTH)?, self.get(CAP_PROP_FRAME_HEIGHT)?))
    }

    fn set_frame_size(&mut self, size: (f64, f64)) -> Result<()> {
        self.set(CAP_PROP_FRAME_WIDTH, size.0)?;
        self.set(CAP_PROP_FRAME_HEIGHT, size.1)?;
        Ok(())
    }
}

/// Run `op` at `size`, then put the previous size back whether or not `op` failed.
///
/// An error from `op` wins over a failed restore.
fn with_frame_size<C, T>(capture: &mut C, size: (f64, f64), op: impl FnOnce(&mut C) -> Result<T>) -> Result<T>
where
    C: ResolutionControl,
{
    let previous = capture.frame_size()?;
    let result = capture.set_frame_size(size).and_then(|()| op(capture));
    let restored = capture.set_frame_size(previous);
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), restored) => {
            if let Err(restore_error) = restored {
                warn!("Failed to restore preview resolution: {restore_error}");
            }
            Err(e)
        }
    }
}

impl CameraStill {
    fn grab_at(&self, request: &StillRequest) -> Result<Mat> {
        let mut capture = self.capture.borrow_mut();
        let target = (f64::from(request.target_width), f64::from(request.target_height));

        let frame = with_frame_size(&mut *capture, target, |capture| {
            let mut frame = Mat::default();
            for _ in 0..=STILL_WARMUP_FRAMES {
                capture.read(&mut frame)?;
            }
            Ok(frame)
        })?;

        if frame.empty() {
            return Err(Error::StillCapture("camera returned an empty frame".to_string()));
        }
        Ok(frame)
    }
}

impl StillCapture for CameraStill {
    fn capture_still(&mut self, request: &StillRequest) -> Result<Vec<u8>> {
        let frame = self
            .grab_at(request)
            .map_err(|e| Error::StillCapture(e.to_string()))?;
        let pixels = bgr_mat_to_rgb_image(&frame)?;
        debug!(
            "Still captured at {}x{} (requested {}x{})",
            pixels.width(),
            pixels.height(),
            request.target_width,
            request.target_height
        );

        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(pixels)
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| Error::StillCapture(e.to_string()))?;
        Ok(encoded)
    }
}
