use tracing::{debug, warn};
use winsnap_platform::{CaptureError, CaptureService, FrameDescriptor, RowOrder, TargetSpec};

use crate::frame::{Frame, PixelBuffer};

/// Grabs frames from a target through an injected `CaptureService`
pub struct FrameGrabber<S> {
    service: S,
    row_order: RowOrder,
}

impl<S: CaptureService> FrameGrabber<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            row_order: RowOrder::default(),
        }
    }

    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn resolve(&self, spec: &TargetSpec) -> Result<S::Target, CaptureError> {
        let target = self.service.resolve(spec)?;
        debug!("resolved {} to {:?}", spec, target);
        Ok(target)
    }

    /// Capture the client area of `target` into a fresh frame.
    ///
    /// Every context and surface acquired here is dropped before returning,
    /// in reverse acquisition order, on success and on every error path.
    pub fn capture(&self, target: S::Target) -> Result<Frame, CaptureError> {
        let window = self.service.window_context(target)?;
        let memory = self.service.compatible_context(&window)?;

        let rect = self.service.client_rect(target)?;
        if rect.is_degenerate() {
            return Err(CaptureError::GeometryUnavailable(format!(
                "degenerate client area {}",
                rect
            )));
        }
        let (width, height) = (rect.width(), rect.height());

        let surface = self.service.create_surface(&window, width, height)?;
        self.service.blit(&memory, &surface, &window, width, height)?;

        // The realized surface may be rounded by the platform
        let (real_width, real_height) = self.service.surface_size(&surface)?;
        if real_width <= 0 || real_height <= 0 {
            return Err(CaptureError::SurfaceAllocationFailed(format!(
                "surface realized as {}x{}",
                real_width, real_height
            )));
        }
        if (real_width, real_height) != (width, height) {
            debug!(
                "surface realized as {}x{} for requested {}x{}",
                real_width, real_height, width, height
            );
        }

        let descriptor = FrameDescriptor::new(real_width, real_height, self.row_order);
        let mut pixels = PixelBuffer::zeroed(descriptor.image_len());

        let rows = self
            .service
            .read_bits(&window, &surface, &descriptor, pixels.as_mut_bytes())?;
        if rows == 0 {
            return Err(CaptureError::ExtractFailed("no scan lines copied".to_string()));
        }
        if rows < descriptor.rows() {
            warn!("only {} of {} scan lines copied", rows, descriptor.rows());
        }

        debug!(
            width = descriptor.width,
            height = descriptor.height,
            bytes = pixels.len(),
            "frame captured"
        );

        Ok(Frame { descriptor, pixels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{visible_pixel, FailPoint, FakeService};
    use winsnap_platform::ClientRect;

    fn row(frame: &Frame, index: usize) -> &[u8] {
        let stride = frame.descriptor.stride();
        &frame.pixels.as_bytes()[index * stride..(index + 1) * stride]
    }

    #[test]
    fn test_capture_100x50() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 100, 50)));
        let frame = grabber.capture(1).unwrap();

        assert_eq!(frame.descriptor.width, 100);
        assert_eq!(frame.descriptor.height, 50);
        assert_eq!(frame.descriptor.bit_count, 32);
        assert_eq!(frame.descriptor.stride(), 400);
        assert_eq!(frame.pixels.len(), 20000);

        let ledger = &grabber.service().ledger;
        assert_eq!(ledger.open(), 0);
        assert_eq!(ledger.acquired(), 3);
    }

    #[test]
    fn test_buffer_length_for_many_sizes() {
        for (w, h) in [(1, 1), (3, 5), (99, 7), (1920, 2)] {
            let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, w, h)));
            let frame = grabber.capture(1).unwrap();
            let stride = ((w as usize * 32 + 31) / 32) * 4;
            assert_eq!(frame.descriptor.stride(), stride);
            assert_eq!(frame.pixels.len(), stride * h as usize);
        }
    }

    #[test]
    fn test_offset_client_rect() {
        let grabber =
            FrameGrabber::new(FakeService::with_rect(ClientRect::new(200, 100, 264, 132)));
        let frame = grabber.capture(1).unwrap();
        assert_eq!((frame.descriptor.width, frame.descriptor.height), (64, 32));
    }

    #[test]
    fn test_bottom_up_rows() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 4, 3)));
        let frame = grabber.capture(1).unwrap();
        assert_eq!(frame.descriptor.height, 3);
        // First stored row is the last visible row
        assert_eq!(&row(&frame, 0)[..4], &visible_pixel(0, 2));
        assert_eq!(&row(&frame, 2)[4..8], &visible_pixel(1, 0));
    }

    #[test]
    fn test_top_down_rows() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 4, 3)))
            .with_row_order(RowOrder::TopDown);
        let frame = grabber.capture(1).unwrap();
        assert_eq!(frame.descriptor.height, -3);
        assert_eq!(frame.pixels.len(), 48);
        assert_eq!(&row(&frame, 0)[..4], &visible_pixel(0, 0));
        assert_eq!(&row(&frame, 2)[12..16], &visible_pixel(3, 2));
    }

    #[test]
    fn test_extraction_uses_returned_descriptor() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 10, 10)))
            .with_row_order(RowOrder::TopDown);
        let frame = grabber.capture(1).unwrap();
        let used = grabber.service().last_descriptor().unwrap();
        assert_eq!(used, frame.descriptor);
    }

    #[test]
    fn test_realized_size_wins() {
        let mut service = FakeService::with_rect(ClientRect::new(0, 0, 100, 50));
        service.realized = Some((104, 50));
        let grabber = FrameGrabber::new(service);

        let frame = grabber.capture(1).unwrap();
        assert_eq!(frame.descriptor.width, 104);
        assert_eq!(frame.pixels.len(), 416 * 50);
    }

    #[test]
    fn test_degenerate_geometry() {
        for rect in [
            ClientRect::new(0, 0, 0, 50),
            ClientRect::new(0, 0, 100, 0),
            ClientRect::new(0, 0, 0, 0),
            ClientRect::new(50, 50, 10, 10),
        ] {
            let grabber = FrameGrabber::new(FakeService::with_rect(rect));
            let err = grabber.capture(1).unwrap_err();
            assert!(matches!(err, CaptureError::GeometryUnavailable(_)), "{:?}", rect);

            let ledger = &grabber.service().ledger;
            assert_eq!(ledger.open(), 0);
            // No surface was allocated
            assert_eq!(ledger.acquired(), 2);
        }
    }

    #[test]
    fn test_every_failure_releases_handles() {
        let cases = [
            (FailPoint::WindowContext, 0),
            (FailPoint::CompatibleContext, 1),
            (FailPoint::ClientRect, 2),
            (FailPoint::CreateSurface, 2),
            (FailPoint::Blit, 3),
            (FailPoint::SurfaceSize, 3),
            (FailPoint::ReadBits, 3),
        ];
        for (point, acquired) in cases {
            let mut service = FakeService::with_rect(ClientRect::new(0, 0, 8, 8));
            service.fail_at = Some(point);
            let grabber = FrameGrabber::new(service);

            let err = grabber.capture(1).unwrap_err();
            match point {
                FailPoint::WindowContext | FailPoint::CompatibleContext | FailPoint::CreateSurface => {
                    assert!(matches!(err, CaptureError::SurfaceAllocationFailed(_)))
                }
                FailPoint::ClientRect => {
                    assert!(matches!(err, CaptureError::GeometryUnavailable(_)))
                }
                FailPoint::Blit => assert!(matches!(err, CaptureError::BlitFailed(_))),
                FailPoint::SurfaceSize => {
                    assert!(matches!(err, CaptureError::SurfaceAllocationFailed(_)))
                }
                FailPoint::ReadBits => assert!(matches!(err, CaptureError::ExtractFailed(_))),
            }

            let ledger = &grabber.service().ledger;
            assert_eq!(ledger.open(), 0, "{:?}", point);
            assert_eq!(ledger.acquired(), acquired, "{:?}", point);
        }
    }

    #[test]
    fn test_zero_rows_copied() {
        let mut service = FakeService::with_rect(ClientRect::new(0, 0, 8, 8));
        service.rows_copied = Some(0);
        let grabber = FrameGrabber::new(service);

        let err = grabber.capture(1).unwrap_err();
        assert!(matches!(err, CaptureError::ExtractFailed(_)));
        assert_eq!(grabber.service().ledger.open(), 0);
    }

    #[test]
    fn test_repeated_captures_do_not_accumulate_handles() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 16, 16)));
        for _ in 0..10 {
            grabber.capture(1).unwrap();
        }
        assert_eq!(grabber.service().ledger.open(), 0);
        assert_eq!(grabber.service().ledger.acquired(), 30);
    }

    #[test]
    fn test_resolve_unknown_window() {
        let grabber = FrameGrabber::new(FakeService::with_rect(ClientRect::new(0, 0, 1, 1)));
        assert_eq!(grabber.resolve(&TargetSpec::Desktop).unwrap(), 1);
        let err = grabber
            .resolve(&TargetSpec::WindowTitle("missing".into()))
            .unwrap_err();
        assert!(matches!(err, CaptureError::TargetNotFound(_)));
    }
}
