use std::path::PathBuf;

/// Path for the `index`-th capture of a run.
///
/// Capture 0 is `prefix.ext`; capture N > 0 is `prefix(N).ext`.
pub fn numbered_path(prefix: &str, index: u32, extension: &str) -> PathBuf {
    let mut name = String::from(prefix);
    if index > 0 {
        name.push_str(&format!("({})", index));
    }
    let extension = extension.trim_start_matches('.');
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    PathBuf::from(name)
}

/// Hands out consecutive capture paths for one run
#[derive(Debug, Clone)]
pub struct OutputNamer {
    prefix: String,
    extension: String,
    next: u32,
}

impl OutputNamer {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
            next: 0,
        }
    }

    /// Index the next call to `next_path` will use
    pub fn next_index(&self) -> u32 {
        self.next
    }

    pub fn next_path(&mut self) -> PathBuf {
        let path = numbered_path(&self.prefix, self.next, &self.extension);
        self.next += 1;
        path
    }
}
