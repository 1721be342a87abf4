use std::path::{Path, PathBuf};

/// Rule 2 of the library lookup precedence: the address of a well-known
/// internal symbol (this very function) is located and the path of the
/// shared object/executable it belongs to is queried via `dladdr`. Used
/// only when the environment variable is unset.
#[cfg(unix)]
pub fn enclosing_library_directory() -> Option<PathBuf> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    unsafe extern "C" fn well_known_marker() {}

    unsafe {
        let mut info = MaybeUninit::<libc::Dl_info>::zeroed();
        let addr = well_known_marker as *const () as *const std::ffi::c_void;
        if libc::dladdr(addr, info.as_mut_ptr()) == 0 {
            return None;
        }
        let info = info.assume_init();
        if info.dli_fname.is_null() {
            return None;
        }
        let path = PathBuf::from(CStr::from_ptr(info.dli_fname).to_string_lossy().into_owned());
        path.parent().map(Path::to_path_buf)
    }
}

#[cfg(not(unix))]
pub fn enclosing_library_directory() -> Option<PathBuf> {
    None
}

/// The three-tier library search-path precedence: environment variable,
/// then the directory the well-known symbol resolves into, then a
/// compile-time default.
pub fn resolve_library_directory(env_var: &str, default_path: &Path) -> PathBuf {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return PathBuf::from(value);
        }
    }
    if let Some(dir) = enclosing_library_directory() {
        return dir;
    }
    default_path.to_path_buf()
}

/// `X_M[d]` — the shared library file name for adapter `adapter_name`
/// inside a manager named `manager_name`, with the platform's own
/// prefix/suffix applied (`lib*.so`, `*.dll`, …) and a debug-build
/// suffix appended before the extension.
pub fn library_file_name(adapter_name: &str, manager_name: &str) -> String {
    let debug_suffix = if cfg!(debug_assertions) { "d" } else { "" };
    format!(
        "{}{}_{}{}{}",
        std::env::consts::DLL_PREFIX,
        adapter_name,
        manager_name,
        debug_suffix,
        std::env::consts::DLL_SUFFIX
    )
}

/// `X_M_impl_interface_singleton` — the entry-point symbol name.
/// `libloading::Library::get` already performs whatever platform
/// name-mangling a raw `dlsym`/`GetProcAddress` call would need, so the
/// logical symbol name is used verbatim.
pub fn entry_symbol_name(adapter_name: &str, manager_name: &str) -> String {
    format!("{}_{}_impl_interface_singleton", adapter_name, manager_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_matches_mangling_rule() {
        let name = library_file_name("python", "polycall");
        assert!(name.contains("python_polycall"));
    }

    #[test]
    fn entry_symbol_matches_mangling_rule() {
        assert_eq!(
            entry_symbol_name("python", "polycall"),
            "python_polycall_impl_interface_singleton"
        );
    }

    #[test]
    fn env_var_wins_when_set() {
        std::env::set_var("POLYCALL_TEST_LIBPATH", "/opt/custom");
        let resolved = resolve_library_directory("POLYCALL_TEST_LIBPATH", Path::new("/default"));
        std::env::remove_var("POLYCALL_TEST_LIBPATH");
        assert_eq!(resolved, PathBuf::from("/opt/custom"));
    }
}
