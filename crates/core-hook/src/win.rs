//! Windows console bindings and hook installation.
//!
//! The hooks intercept the host interpreter's console primitives by
//! patching its import address table (the default), or by an inline
//! detour when `--althook` asks for it. Patching rewrites the IAT
//! entries of the host executable that resolve into kernel32; the
//! original pointers are returned so dispatch can forward.

use crate::console::{ConsoleApi, ConsoleRead};
use crate::{HookError, Result};
use std::ffi::c_void;
use windows_sys::Win32::Foundation::HMODULE;
use windows_sys::Win32::System::Console::{
    CONSOLE_SCREEN_BUFFER_INFO, GetConsoleScreenBufferInfo, GetStdHandle, ReadConsoleW,
    STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, SetConsoleTitleW, WriteConsoleW,
};
use windows_sys::Win32::System::Diagnostics::Debug::{
    IMAGE_DIRECTORY_ENTRY_IMPORT, IMAGE_NT_HEADERS64,
};
use windows_sys::Win32::System::Environment::{
    GetEnvironmentVariableW, SetEnvironmentVariableW,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Memory::{
    PAGE_READWRITE, VirtualProtect,
};
use windows_sys::Win32::System::SystemServices::{
    IMAGE_DOS_HEADER, IMAGE_DOS_SIGNATURE, IMAGE_IMPORT_BY_NAME, IMAGE_IMPORT_DESCRIPTOR,
};

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// The real console, used by the dispatch layer to forward and by the
/// editor for its own output.
pub struct RealConsole;

impl ConsoleApi for RealConsole {
    fn read_console(&self, max_chars: usize) -> ConsoleRead {
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        let mut buf = vec![0u16; max_chars.max(1)];
        let mut read = 0u32;
        let ok = unsafe {
            ReadConsoleW(
                handle,
                buf.as_mut_ptr().cast(),
                buf.len() as u32,
                &mut read,
                std::ptr::null(),
            )
        };
        if ok == 0 {
            if crate::signal::is_signaled() {
                return ConsoleRead::Interrupted;
            }
            return ConsoleRead::Eof;
        }
        ConsoleRead::Text(from_wide(&buf[..read as usize]))
    }

    fn write_console(&self, text: &str) {
        let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        let wide: Vec<u16> = text.encode_utf16().collect();
        let mut written = 0u32;
        unsafe {
            WriteConsoleW(
                handle,
                wide.as_ptr().cast(),
                wide.len() as u32,
                &mut written,
                std::ptr::null(),
            );
        }
    }

    fn get_env(&self, name: &str) -> Option<String> {
        let wname = to_wide(name);
        let mut buf = vec![0u16; 4096];
        let len = unsafe { GetEnvironmentVariableW(wname.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
        if len == 0 {
            None
        } else {
            Some(from_wide(&buf[..len as usize]))
        }
    }

    fn set_env(&self, name: &str, value: Option<&str>) {
        let wname = to_wide(name);
        match value {
            Some(v) => {
                let wvalue = to_wide(v);
                unsafe { SetEnvironmentVariableW(wname.as_ptr(), wvalue.as_ptr()) };
            }
            None => unsafe {
                SetEnvironmentVariableW(wname.as_ptr(), std::ptr::null());
            },
        }
    }

    fn set_title(&self, title: &str) {
        let wide = to_wide(title);
        unsafe { SetConsoleTitleW(wide.as_ptr()) };
    }

    fn screen_size(&self) -> (u32, u32) {
        let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(handle, &mut info) } != 0 {
            (
                info.dwSize.X.max(1) as u32,
                (info.srWindow.Bottom - info.srWindow.Top + 1).max(1) as u32,
            )
        } else {
            (80, 25)
        }
    }
}

/// How the console hooks get installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMethod {
    /// Patch the host module's import address table.
    Iat,
    /// Inline-detour the target functions (alternative hook path).
    Detour,
}

/// One import to replace: a kernel32 symbol and its replacement.
pub struct IatPatch {
    pub symbol: &'static str,
    pub replacement: *const c_void,
}

/// Install hooks on the process's main module. Returns the original
/// function pointers, index-matched to `patches`, for forwarding.
pub fn install_hooks(method: HookMethod, patches: &[IatPatch]) -> Result<Vec<*const c_void>> {
    match method {
        HookMethod::Iat => unsafe { patch_iat(patches) },
        HookMethod::Detour => Err(HookError::InstallFailed(
            "inline detour hooks require the alternative hook engine".to_string(),
        )),
    }
}

unsafe fn patch_iat(patches: &[IatPatch]) -> Result<Vec<*const c_void>> {
    let module: HMODULE = unsafe { GetModuleHandleW(std::ptr::null()) };
    if module.is_null() {
        return Err(HookError::InstallFailed("no host module".to_string()));
    }
    let base = module as usize;

    let dos = unsafe { &*(base as *const IMAGE_DOS_HEADER) };
    if dos.e_magic != IMAGE_DOS_SIGNATURE {
        return Err(HookError::InstallFailed("bad DOS header".to_string()));
    }
    let nt = unsafe { &*((base + dos.e_lfanew as usize) as *const IMAGE_NT_HEADERS64) };
    let import_dir =
        nt.OptionalHeader.DataDirectory[IMAGE_DIRECTORY_ENTRY_IMPORT as usize];
    if import_dir.VirtualAddress == 0 {
        return Err(HookError::InstallFailed("no import table".to_string()));
    }

    let mut originals = vec![std::ptr::null(); patches.len()];
    let mut descriptor =
        (base + import_dir.VirtualAddress as usize) as *const IMAGE_IMPORT_DESCRIPTOR;

    unsafe {
        while (*descriptor).Name != 0 {
            let dll = std::ffi::CStr::from_ptr((base + (*descriptor).Name as usize) as *const i8);
            let is_kernel = dll
                .to_str()
                .map(|s| s.eq_ignore_ascii_case("kernel32.dll"))
                .unwrap_or(false);
            if is_kernel {
                let mut thunk = (base + (*descriptor).FirstThunk as usize) as *mut usize;
                let mut orig_thunk = (base
                    + (*descriptor).Anonymous.OriginalFirstThunk as usize)
                    as *const usize;
                while *orig_thunk != 0 {
                    // Skip ordinal imports (high bit set).
                    if *orig_thunk & (1usize << 63) == 0 {
                        let by_name =
                            (base + *orig_thunk) as *const IMAGE_IMPORT_BY_NAME;
                        let name =
                            std::ffi::CStr::from_ptr((*by_name).Name.as_ptr().cast());
                        if let Ok(name) = name.to_str() {
                            for (i, patch) in patches.iter().enumerate() {
                                if name == patch.symbol {
                                    originals[i] = *thunk as *const c_void;
                                    write_protected(thunk, patch.replacement as usize)?;
                                }
                            }
                        }
                    }
                    thunk = thunk.add(1);
                    orig_thunk = orig_thunk.add(1);
                }
            }
            descriptor = descriptor.add(1);
        }
    }

    Ok(originals)
}

/// Flip the page writable, store the new pointer, restore protection.
unsafe fn write_protected(slot: *mut usize, value: usize) -> Result<()> {
    let mut old = 0u32;
    let ok = unsafe {
        VirtualProtect(
            slot.cast(),
            std::mem::size_of::<usize>(),
            PAGE_READWRITE,
            &mut old,
        )
    };
    if ok == 0 {
        return Err(HookError::InstallFailed(
            "VirtualProtect failed".to_string(),
        ));
    }
    unsafe {
        *slot = value;
        VirtualProtect(slot.cast(), std::mem::size_of::<usize>(), old, &mut old);
    }
    Ok(())
}
