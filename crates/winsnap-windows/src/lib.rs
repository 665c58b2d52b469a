// Windows platform implementations

#[cfg(target_os = "windows")]
pub mod screen;
