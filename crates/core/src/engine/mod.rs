mod renderer;
mod scanner;

pub use renderer::{render_code, render_file, render_file_ansi, Renderer};
pub use scanner::{OutlineScanner, ScanError};
