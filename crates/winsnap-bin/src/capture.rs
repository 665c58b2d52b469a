// Backend selection and the capture loop

use anyhow::Result;
use winsnap_core::config::SnapConfig;

#[cfg(any(target_os = "windows", all(target_os = "linux", feature = "x11")))]
fn drive<S: winsnap_platform::CaptureService>(
    service: S,
    config: &SnapConfig,
    count: Option<u32>,
) -> Result<()> {
    use anyhow::Context;
    use std::io;
    use tracing::info;
    use winsnap_core::{CaptureSession, CountedTrigger, FrameGrabber, OutputNamer, PromptTrigger};

    let grabber = FrameGrabber::new(service).with_row_order(config.row_order());

    let spec = config.target_spec();
    let target = grabber
        .resolve(&spec)
        .with_context(|| format!("cannot find {}", spec))?;
    info!("capturing {} ({:?})", spec, target);

    let namer = OutputNamer::new(config.output_prefix.clone(), config.extension.clone());
    let mut session = CaptureSession::new(&grabber, target, namer);

    let captured = match count {
        Some(n) => session.run(&mut CountedTrigger::new(n))?,
        None => {
            let stdin = io::stdin();
            let mut trigger =
                PromptTrigger::new(stdin.lock(), io::stdout(), config.stop_token.clone());
            session.run(&mut trigger)?
        }
    };

    info!("{} capture(s) written", captured);
    Ok(())
}

#[cfg(target_os = "windows")]
pub fn run(config: &SnapConfig, count: Option<u32>) -> Result<()> {
    let service = winsnap_windows::screen::create_capture_service();
    drive(service, config, count)
}

#[cfg(all(target_os = "linux", feature = "x11"))]
pub fn run(config: &SnapConfig, count: Option<u32>) -> Result<()> {
    let service = winsnap_linux::screen_x11::create_capture_service()?;
    drive(service, config, count)
}

#[cfg(not(any(target_os = "windows", all(target_os = "linux", feature = "x11"))))]
pub fn run(_config: &SnapConfig, _count: Option<u32>) -> Result<()> {
    anyhow::bail!("no capture backend for this platform (on Linux, build with --features x11)")
}
