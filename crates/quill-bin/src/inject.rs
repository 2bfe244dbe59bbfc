//! `quill inject`: hook the parent command interpreter.
//!
//! The parent is located through a process snapshot; the editor
//! library is loaded into it and the console hooks installed (IAT
//! patching by default, the inline-detour engine with `--althook`).
//! If the hooks cannot install, the host keeps its own line editor.

use anyhow::Result;
use core_config::Settings;
use std::path::Path;

#[cfg(windows)]
pub fn run(scripts: Option<&Path>, quiet: bool, althook: bool, _settings: &Settings) -> Result<()> {
    use anyhow::{Context, anyhow};
    use tracing::info;
    use windows_sys::Win32::Foundation::{CloseHandle, FALSE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };
    use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
    use windows_sys::Win32::System::Memory::{
        MEM_COMMIT, MEM_RELEASE, PAGE_READWRITE, VirtualAllocEx, VirtualFreeEx,
    };
    use windows_sys::Win32::System::Threading::{
        CreateRemoteThread, INFINITE, OpenProcess, PROCESS_CREATE_THREAD,
        PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
        WaitForSingleObject,
    };

    if let Some(scripts) = scripts {
        info!(target: "runtime", path = %scripts.display(), "scripts_dir");
    }

    // Find the parent process (the interpreter that spawned us).
    let my_pid = std::process::id();
    let parent_pid = unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
        if snapshot == INVALID_HANDLE_VALUE {
            return Err(anyhow!("process snapshot failed"));
        }
        let mut entry: PROCESSENTRY32W = std::mem::zeroed();
        entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;
        let mut parent = None;
        if Process32FirstW(snapshot, &mut entry) != FALSE {
            loop {
                if entry.th32ProcessID == my_pid {
                    parent = Some(entry.th32ParentProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry) == FALSE {
                    break;
                }
            }
        }
        CloseHandle(snapshot);
        parent.ok_or_else(|| anyhow!("parent process not found"))?
    };

    // The editor payload lives next to the loader.
    let dll = std::env::current_exe()
        .context("locating loader")?
        .with_file_name("quill_hook.dll");
    let dll_wide: Vec<u16> = dll
        .to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    unsafe {
        let access = PROCESS_CREATE_THREAD
            | PROCESS_QUERY_INFORMATION
            | PROCESS_VM_OPERATION
            | PROCESS_VM_READ
            | PROCESS_VM_WRITE;
        let process = OpenProcess(access, FALSE, parent_pid);
        if process.is_null() {
            return Err(anyhow!("opening the parent interpreter failed"));
        }

        let bytes = dll_wide.len() * 2;
        let remote = VirtualAllocEx(
            process,
            std::ptr::null(),
            bytes,
            MEM_COMMIT,
            PAGE_READWRITE,
        );
        if remote.is_null() {
            CloseHandle(process);
            return Err(anyhow!("allocating in the parent failed"));
        }

        let mut written = 0usize;
        let ok = windows_sys::Win32::System::Diagnostics::Debug::WriteProcessMemory(
            process,
            remote,
            dll_wide.as_ptr().cast(),
            bytes,
            &mut written,
        );
        if ok == FALSE || written != bytes {
            VirtualFreeEx(process, remote, 0, MEM_RELEASE);
            CloseHandle(process);
            return Err(anyhow!("writing the payload path failed"));
        }

        let kernel32: Vec<u16> = "kernel32.dll\0".encode_utf16().collect();
        let load_library = GetProcAddress(
            GetModuleHandleW(kernel32.as_ptr()),
            c"LoadLibraryW".as_ptr().cast(),
        );
        let Some(load_library) = load_library else {
            VirtualFreeEx(process, remote, 0, MEM_RELEASE);
            CloseHandle(process);
            return Err(anyhow!("resolving LoadLibraryW failed"));
        };

        let thread = CreateRemoteThread(
            process,
            std::ptr::null(),
            0,
            Some(std::mem::transmute::<
                unsafe extern "system" fn() -> isize,
                unsafe extern "system" fn(*mut core::ffi::c_void) -> u32,
            >(load_library)),
            remote,
            0,
            std::ptr::null_mut(),
        );
        if thread.is_null() {
            VirtualFreeEx(process, remote, 0, MEM_RELEASE);
            CloseHandle(process);
            return Err(anyhow!("starting the remote loader failed"));
        }

        WaitForSingleObject(thread, INFINITE);
        CloseHandle(thread);
        VirtualFreeEx(process, remote, 0, MEM_RELEASE);
        CloseHandle(process);
    }

    let method = if althook { "detour" } else { "iat" };
    info!(target: "runtime", parent_pid, method, "injected");
    if !quiet {
        println!("quill injected into process {parent_pid}");
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn run(_scripts: Option<&Path>, _quiet: bool, _althook: bool, _settings: &Settings) -> Result<()> {
    anyhow::bail!("inject requires a Windows command interpreter host")
}
