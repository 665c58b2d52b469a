//! X11 window capture using xcb core requests.
//!
//! The window's contents are copied into a server-side pixmap with
//! `CopyArea`, then pulled back with `GetImage` in ZPixmap format.

use std::rc::Rc;

use tracing::{debug, info};
use winsnap_platform::{
    CaptureError, CaptureService, ClientRect, FrameDescriptor, TargetSpec,
};
use xcb::x;

use crate::rows::copy_rows;

/// How deep to search the window tree for a title match. Reparenting
/// window managers put the client one or two levels below the root.
const TITLE_SEARCH_DEPTH: usize = 3;

/// A window to copy from; nothing to release
pub struct WindowDrawable {
    window: x::Window,
    depth: u8,
}

/// Graphics context used for the copy, freed on drop
pub struct GraphicsContext {
    conn: Rc<xcb::Connection>,
    gc: x::Gcontext,
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.conn.send_request(&x::FreeGc { gc: self.gc });
        let _ = self.conn.flush();
    }
}

/// Server-side pixmap holding the copied pixels, freed on drop
pub struct Pixmap {
    conn: Rc<xcb::Connection>,
    pixmap: x::Pixmap,
}

impl Drop for Pixmap {
    fn drop(&mut self) {
        self.conn.send_request(&x::FreePixmap {
            pixmap: self.pixmap,
        });
        let _ = self.conn.flush();
    }
}

/// X11 screen capture using xcb
pub struct X11CaptureService {
    conn: Rc<xcb::Connection>,
    root: x::Window,
}

impl X11CaptureService {
    /// Connect to the display named by `DISPLAY`
    pub fn connect() -> Result<Self, CaptureError> {
        let (conn, screen_num) = xcb::Connection::connect(None).map_err(|e| {
            CaptureError::TargetNotFound(format!("failed to connect to X11 display: {}", e))
        })?;

        let root = {
            let setup = conn.get_setup();
            let screen = setup.roots().nth(screen_num as usize).ok_or_else(|| {
                CaptureError::TargetNotFound(format!("no X11 screen {}", screen_num))
            })?;
            screen.root()
        };

        info!("connected to X11 screen {}", screen_num);
        Ok(Self {
            conn: Rc::new(conn),
            root,
        })
    }

    fn geometry(&self, drawable: x::Drawable) -> Result<x::GetGeometryReply, xcb::Error> {
        let cookie = self.conn.send_request(&x::GetGeometry { drawable });
        self.conn.wait_for_reply(cookie)
    }

    fn window_title(&self, window: x::Window) -> Option<String> {
        let cookie = self.conn.send_request(&x::GetProperty {
            delete: false,
            window,
            property: x::ATOM_WM_NAME,
            r#type: x::ATOM_ANY,
            long_offset: 0,
            long_length: 1024,
        });
        let reply = self.conn.wait_for_reply(cookie).ok()?;
        let value = reply.value::<u8>();
        if value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(value).into_owned())
    }

    fn find_by_title(&self, parent: x::Window, title: &str, depth: usize) -> Option<x::Window> {
        if depth == 0 {
            return None;
        }
        let cookie = self.conn.send_request(&x::QueryTree { window: parent });
        let reply = self.conn.wait_for_reply(cookie).ok()?;
        let children = reply.children().to_vec();

        for &child in &children {
            if self.window_title(child).as_deref() == Some(title) {
                return Some(child);
            }
        }
        children
            .into_iter()
            .find_map(|child| self.find_by_title(child, title, depth - 1))
    }

    fn bits_per_pixel(&self, depth: u8) -> Option<u8> {
        self.conn
            .get_setup()
            .pixmap_formats()
            .iter()
            .find(|f| f.depth() == depth)
            .map(|f| f.bits_per_pixel())
    }
}

impl CaptureService for X11CaptureService {
    type Target = x::Window;
    type WindowContext = WindowDrawable;
    type MemoryContext = GraphicsContext;
    type Surface = Pixmap;

    fn resolve(&self, spec: &TargetSpec) -> Result<x::Window, CaptureError> {
        match spec {
            TargetSpec::Desktop => Ok(self.root),
            TargetSpec::WindowTitle(title) => self
                .find_by_title(self.root, title, TITLE_SEARCH_DEPTH)
                .ok_or_else(|| {
                    CaptureError::TargetNotFound(format!("no window titled \"{}\"", title))
                }),
        }
    }

    fn window_context(&self, target: x::Window) -> Result<WindowDrawable, CaptureError> {
        let geometry = self
            .geometry(x::Drawable::Window(target))
            .map_err(|e| CaptureError::SurfaceAllocationFailed(format!("GetGeometry: {}", e)))?;
        Ok(WindowDrawable {
            window: target,
            depth: geometry.depth(),
        })
    }

    fn compatible_context(&self, window: &WindowDrawable) -> Result<GraphicsContext, CaptureError> {
        let gc: x::Gcontext = self.conn.generate_id();
        self.conn
            .send_and_check_request(&x::CreateGc {
                cid: gc,
                drawable: x::Drawable::Window(window.window),
                value_list: &[x::Gc::SubwindowMode(x::SubwindowMode::IncludeInferiors)],
            })
            .map_err(|e| CaptureError::SurfaceAllocationFailed(format!("CreateGC: {}", e)))?;
        Ok(GraphicsContext {
            conn: Rc::clone(&self.conn),
            gc,
        })
    }

    fn client_rect(&self, target: x::Window) -> Result<ClientRect, CaptureError> {
        let geometry = self
            .geometry(x::Drawable::Window(target))
            .map_err(|e| CaptureError::GeometryUnavailable(format!("GetGeometry: {}", e)))?;
        Ok(ClientRect::new(
            0,
            0,
            geometry.width() as i32,
            geometry.height() as i32,
        ))
    }

    fn create_surface(
        &self,
        window: &WindowDrawable,
        width: i32,
        height: i32,
    ) -> Result<Pixmap, CaptureError> {
        let pixmap: x::Pixmap = self.conn.generate_id();
        self.conn
            .send_and_check_request(&x::CreatePixmap {
                depth: window.depth,
                pid: pixmap,
                drawable: x::Drawable::Window(window.window),
                width: width as u16,
                height: height as u16,
            })
            .map_err(|e| {
                CaptureError::SurfaceAllocationFailed(format!(
                    "CreatePixmap {}x{}: {}",
                    width, height, e
                ))
            })?;
        Ok(Pixmap {
            conn: Rc::clone(&self.conn),
            pixmap,
        })
    }

    fn blit(
        &self,
        memory: &GraphicsContext,
        surface: &Pixmap,
        window: &WindowDrawable,
        width: i32,
        height: i32,
    ) -> Result<(), CaptureError> {
        self.conn
            .send_and_check_request(&x::CopyArea {
                src_drawable: x::Drawable::Window(window.window),
                dst_drawable: x::Drawable::Pixmap(surface.pixmap),
                gc: memory.gc,
                src_x: 0,
                src_y: 0,
                dst_x: 0,
                dst_y: 0,
                width: width as u16,
                height: height as u16,
            })
            .map_err(|e| CaptureError::BlitFailed(format!("CopyArea: {}", e)))
    }

    fn surface_size(&self, surface: &Pixmap) -> Result<(i32, i32), CaptureError> {
        let geometry = self
            .geometry(x::Drawable::Pixmap(surface.pixmap))
            .map_err(|e| CaptureError::SurfaceAllocationFailed(format!("GetGeometry: {}", e)))?;
        Ok((geometry.width() as i32, geometry.height() as i32))
    }

    fn read_bits(
        &self,
        window: &WindowDrawable,
        surface: &Pixmap,
        descriptor: &FrameDescriptor,
        dst: &mut [u8],
    ) -> Result<u32, CaptureError> {
        match self.bits_per_pixel(window.depth) {
            Some(32) => {}
            other => {
                return Err(CaptureError::ExtractFailed(format!(
                    "depth {} uses {:?} bits per pixel, need 32",
                    window.depth, other
                )))
            }
        }

        let width = descriptor.width as usize;
        let rows = descriptor.rows() as usize;
        if dst.len() < descriptor.image_len() {
            return Err(CaptureError::ExtractFailed(format!(
                "buffer holds {} bytes, need {}",
                dst.len(),
                descriptor.image_len()
            )));
        }

        let cookie = self.conn.send_request(&x::GetImage {
            format: x::ImageFormat::ZPixmap,
            drawable: x::Drawable::Pixmap(surface.pixmap),
            x: 0,
            y: 0,
            width: width as u16,
            height: rows as u16,
            plane_mask: u32::MAX,
        });
        let reply = self
            .conn
            .wait_for_reply(cookie)
            .map_err(|e| CaptureError::ExtractFailed(format!("GetImage: {}", e)))?;

        // ZPixmap rows arrive top-down, 32 bits per pixel, already BGRX
        let copied = copy_rows(reply.data(), width, rows, descriptor, dst)?;
        debug!("GetImage copied {} rows", copied);
        Ok(copied)
    }
}

/// Factory function for creating the capture service on Linux
pub fn create_capture_service() -> Result<X11CaptureService, CaptureError> {
    info!("using xcb CopyArea/GetImage for window capture");
    X11CaptureService::connect()
}
