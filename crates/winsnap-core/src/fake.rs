//! Scripted `CaptureService` for tests. Every handle it hands out is
//! counted in a shared ledger so tests can assert nothing leaks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use winsnap_platform::{
    CaptureError, CaptureService, ClientRect, FrameDescriptor, RowOrder, TargetSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    WindowContext,
    CompatibleContext,
    ClientRect,
    CreateSurface,
    Blit,
    SurfaceSize,
    ReadBits,
}

#[derive(Debug, Default)]
pub struct Ledger {
    open: Cell<usize>,
    acquired: Cell<usize>,
}

impl Ledger {
    /// Handles currently alive
    pub fn open(&self) -> usize {
        self.open.get()
    }

    /// Handles ever handed out
    pub fn acquired(&self) -> usize {
        self.acquired.get()
    }
}

pub struct Handle {
    ledger: Rc<Ledger>,
}

impl Handle {
    fn new(ledger: &Rc<Ledger>) -> Self {
        ledger.open.set(ledger.open.get() + 1);
        ledger.acquired.set(ledger.acquired.get() + 1);
        Self {
            ledger: Rc::clone(ledger),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.ledger.open.set(self.ledger.open.get() - 1);
    }
}

pub struct Surface {
    _handle: Handle,
    width: i32,
    height: i32,
}

/// BGRA value the fake screen shows at visible position (x, y)
pub fn visible_pixel(x: usize, y: usize) -> [u8; 4] {
    [x as u8, y as u8, 0xC0, 0xFF]
}

pub struct FakeService {
    pub ledger: Rc<Ledger>,
    pub rect: ClientRect,
    pub realized: Option<(i32, i32)>,
    pub fail_at: Option<FailPoint>,
    pub rows_copied: Option<u32>,
    last_descriptor: RefCell<Option<FrameDescriptor>>,
}

impl FakeService {
    pub fn with_rect(rect: ClientRect) -> Self {
        Self {
            ledger: Rc::new(Ledger::default()),
            rect,
            realized: None,
            fail_at: None,
            rows_copied: None,
            last_descriptor: RefCell::new(None),
        }
    }

    /// Descriptor passed to the most recent `read_bits`
    pub fn last_descriptor(&self) -> Option<FrameDescriptor> {
        *self.last_descriptor.borrow()
    }

    fn check(&self, point: FailPoint) -> Result<(), CaptureError> {
        if self.fail_at != Some(point) {
            return Ok(());
        }
        let msg = format!("injected failure at {:?}", point);
        Err(match point {
            FailPoint::WindowContext
            | FailPoint::CompatibleContext
            | FailPoint::CreateSurface
            | FailPoint::SurfaceSize => CaptureError::SurfaceAllocationFailed(msg),
            FailPoint::ClientRect => CaptureError::GeometryUnavailable(msg),
            FailPoint::Blit => CaptureError::BlitFailed(msg),
            FailPoint::ReadBits => CaptureError::ExtractFailed(msg),
        })
    }
}

impl CaptureService for FakeService {
    type Target = u32;
    type WindowContext = Handle;
    type MemoryContext = Handle;
    type Surface = Surface;

    fn resolve(&self, spec: &TargetSpec) -> Result<u32, CaptureError> {
        match spec {
            TargetSpec::Desktop => Ok(1),
            TargetSpec::WindowTitle(title) if title == "missing" => {
                Err(CaptureError::TargetNotFound(title.clone()))
            }
            TargetSpec::WindowTitle(_) => Ok(2),
        }
    }

    fn window_context(&self, _target: u32) -> Result<Handle, CaptureError> {
        self.check(FailPoint::WindowContext)?;
        Ok(Handle::new(&self.ledger))
    }

    fn compatible_context(&self, _window: &Handle) -> Result<Handle, CaptureError> {
        self.check(FailPoint::CompatibleContext)?;
        Ok(Handle::new(&self.ledger))
    }

    fn client_rect(&self, _target: u32) -> Result<ClientRect, CaptureError> {
        self.check(FailPoint::ClientRect)?;
        Ok(self.rect)
    }

    fn create_surface(
        &self,
        _window: &Handle,
        width: i32,
        height: i32,
    ) -> Result<Surface, CaptureError> {
        self.check(FailPoint::CreateSurface)?;
        let (width, height) = self.realized.unwrap_or((width, height));
        Ok(Surface {
            _handle: Handle::new(&self.ledger),
            width,
            height,
        })
    }

    fn blit(
        &self,
        _memory: &Handle,
        _surface: &Surface,
        _window: &Handle,
        _width: i32,
        _height: i32,
    ) -> Result<(), CaptureError> {
        self.check(FailPoint::Blit)
    }

    fn surface_size(&self, surface: &Surface) -> Result<(i32, i32), CaptureError> {
        self.check(FailPoint::SurfaceSize)?;
        Ok((surface.width, surface.height))
    }

    fn read_bits(
        &self,
        _window: &Handle,
        surface: &Surface,
        descriptor: &FrameDescriptor,
        dst: &mut [u8],
    ) -> Result<u32, CaptureError> {
        self.check(FailPoint::ReadBits)?;
        *self.last_descriptor.borrow_mut() = Some(*descriptor);

        if dst.len() < descriptor.image_len() {
            return Err(CaptureError::ExtractFailed("buffer too small".to_string()));
        }

        let rows = descriptor.rows().min(surface.height as u32) as usize;
        let width = descriptor.width.min(surface.width) as usize;
        let stride = descriptor.stride();
        for i in 0..rows {
            let y = match descriptor.row_order() {
                RowOrder::BottomUp => rows - 1 - i,
                RowOrder::TopDown => i,
            };
            for x in 0..width {
                let at = i * stride + x * 4;
                dst[at..at + 4].copy_from_slice(&visible_pixel(x, y));
            }
        }

        Ok(self.rows_copied.unwrap_or(rows as u32))
    }
}
