// Linux platform implementations

pub mod rows;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod screen_x11;
