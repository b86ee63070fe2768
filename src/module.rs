// module.rs — Where this DLL lives on disk.
//
// The log file and gfless.toml both sit next to the DLL, wherever the injector
// loaded it from. The module handle is captured in DllMain.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use winapi::um::libloaderapi::GetModuleFileNameA;

/// Module handle of our DLL.
static DLL_HINST: AtomicUsize = AtomicUsize::new(0);

pub fn set_dll_hinst(h: usize) { DLL_HINST.store(h, Ordering::Relaxed); }

pub fn dll_hinst() -> usize { DLL_HINST.load(Ordering::Relaxed) }

/// Directory containing the DLL, or the current directory if it can't be resolved.
pub fn dll_directory() -> PathBuf {
    let hinst = dll_hinst();
    if hinst != 0 {
        let mut buf = [0u8; 512];
        let len = unsafe {
            GetModuleFileNameA(hinst as _, buf.as_mut_ptr() as _, buf.len() as u32)
        } as usize;
        if len > 0 && len < buf.len() {
            let path = String::from_utf8_lossy(&buf[..len]).into_owned();
            if let Some(dir) = std::path::Path::new(&path).parent() {
                return dir.to_path_buf();
            }
        }
    }
    PathBuf::from(".")
}
