//! Window capture through GDI.
//!
//! `GetDC` on the target, `CreateCompatibleDC` + `CreateCompatibleBitmap`
//! for the off-screen copy, `BitBlt` with `SRCCOPY`, then `GetDIBits` into a
//! caller-owned buffer. Each handle is wrapped in a guard that releases it on
//! drop.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::{debug, info};
use winsnap_platform::{CaptureError, CaptureService, ClientRect, FrameDescriptor, TargetSpec};

use windows::core::{Error as WinError, PCWSTR};
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, GetObjectW, ReleaseDC, SelectObject, BITMAP, BITMAPINFO, BITMAPINFOHEADER,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{FindWindowW, GetClientRect, GetDesktopWindow};

/// Device context of a window, released with `ReleaseDC`
pub struct WindowDc {
    hwnd: HWND,
    hdc: HDC,
}

impl Drop for WindowDc {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseDC(self.hwnd, self.hdc);
        }
    }
}

/// Memory device context, deleted with `DeleteDC`
pub struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

/// Device-dependent bitmap, deleted with `DeleteObject`
pub struct Bitmap(HBITMAP);

impl Bitmap {
    fn as_gdi_object(&self) -> HGDIOBJ {
        HGDIOBJ(self.0 .0)
    }
}

impl Drop for Bitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.as_gdi_object());
        }
    }
}

/// GDI-backed capture service
#[derive(Debug, Default)]
pub struct GdiCaptureService;

impl GdiCaptureService {
    pub fn new() -> Self {
        Self
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl CaptureService for GdiCaptureService {
    type Target = HWND;
    type WindowContext = WindowDc;
    type MemoryContext = MemoryDc;
    type Surface = Bitmap;

    fn resolve(&self, spec: &TargetSpec) -> Result<HWND, CaptureError> {
        let hwnd = match spec {
            TargetSpec::Desktop => unsafe { GetDesktopWindow() },
            TargetSpec::WindowTitle(title) => {
                let title_wide = wide(title);
                unsafe { FindWindowW(PCWSTR::null(), PCWSTR(title_wide.as_ptr())) }
                    .map_err(|e| {
                        CaptureError::TargetNotFound(format!("no window titled \"{}\": {}", title, e))
                    })?
            }
        };
        if hwnd.is_invalid() {
            return Err(CaptureError::TargetNotFound(spec.to_string()));
        }
        Ok(hwnd)
    }

    fn window_context(&self, target: HWND) -> Result<WindowDc, CaptureError> {
        let hdc = unsafe { GetDC(target) };
        if hdc.is_invalid() {
            return Err(CaptureError::SurfaceAllocationFailed(
                "GetDC returned no device context".to_string(),
            ));
        }
        Ok(WindowDc { hwnd: target, hdc })
    }

    fn compatible_context(&self, window: &WindowDc) -> Result<MemoryDc, CaptureError> {
        let hdc = unsafe { CreateCompatibleDC(window.hdc) };
        if hdc.is_invalid() {
            return Err(CaptureError::SurfaceAllocationFailed(
                "failed to create compatible DC".to_string(),
            ));
        }
        Ok(MemoryDc(hdc))
    }

    fn client_rect(&self, target: HWND) -> Result<ClientRect, CaptureError> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(target, &mut rect) }
            .map_err(|e| CaptureError::GeometryUnavailable(format!("GetClientRect: {}", e)))?;
        Ok(ClientRect::new(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn create_surface(
        &self,
        window: &WindowDc,
        width: i32,
        height: i32,
    ) -> Result<Bitmap, CaptureError> {
        let bitmap = unsafe { CreateCompatibleBitmap(window.hdc, width, height) };
        if bitmap.is_invalid() {
            return Err(CaptureError::SurfaceAllocationFailed(format!(
                "failed to create compatible bitmap of {}x{}",
                width, height
            )));
        }
        Ok(Bitmap(bitmap))
    }

    fn blit(
        &self,
        memory: &MemoryDc,
        surface: &Bitmap,
        window: &WindowDc,
        width: i32,
        height: i32,
    ) -> Result<(), CaptureError> {
        unsafe {
            let previous = SelectObject(memory.0, surface.as_gdi_object());
            if previous.is_invalid() {
                return Err(CaptureError::BlitFailed(
                    "could not select bitmap into memory DC".to_string(),
                ));
            }

            let result = BitBlt(memory.0, 0, 0, width, height, window.hdc, 0, 0, SRCCOPY);

            // GetDIBits needs the bitmap deselected
            SelectObject(memory.0, previous);

            result.map_err(|e| CaptureError::BlitFailed(format!("BitBlt: {}", e)))
        }
    }

    fn surface_size(&self, surface: &Bitmap) -> Result<(i32, i32), CaptureError> {
        let mut bmp = BITMAP::default();
        let copied = unsafe {
            GetObjectW(
                surface.as_gdi_object(),
                size_of::<BITMAP>() as i32,
                Some(&mut bmp as *mut BITMAP as *mut c_void),
            )
        };
        if copied == 0 {
            return Err(CaptureError::SurfaceAllocationFailed(
                "GetObject could not describe the bitmap".to_string(),
            ));
        }
        Ok((bmp.bmWidth, bmp.bmHeight))
    }

    fn read_bits(
        &self,
        window: &WindowDc,
        surface: &Bitmap,
        descriptor: &FrameDescriptor,
        dst: &mut [u8],
    ) -> Result<u32, CaptureError> {
        if dst.len() < descriptor.image_len() {
            return Err(CaptureError::ExtractFailed(format!(
                "buffer holds {} bytes, need {}",
                dst.len(),
                descriptor.image_len()
            )));
        }

        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: descriptor.width,
                biHeight: descriptor.height,
                biPlanes: descriptor.planes,
                biBitCount: descriptor.bit_count,
                biCompression: descriptor.compression,
                biSizeImage: descriptor.size_image,
                biXPelsPerMeter: descriptor.x_pels_per_meter,
                biYPelsPerMeter: descriptor.y_pels_per_meter,
                biClrUsed: descriptor.colors_used,
                biClrImportant: descriptor.colors_important,
            },
            ..Default::default()
        };

        let lines = unsafe {
            GetDIBits(
                window.hdc,
                surface.0,
                0,
                descriptor.rows(),
                Some(dst.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        if lines <= 0 {
            return Err(CaptureError::ExtractFailed(format!(
                "GetDIBits: {}",
                WinError::from_win32()
            )));
        }
        debug!("GetDIBits copied {} scan lines", lines);
        Ok(lines as u32)
    }
}

/// Factory function for creating the capture service on Windows
pub fn create_capture_service() -> GdiCaptureService {
    info!("using GDI BitBlt for window capture");
    GdiCaptureService::new()
}
