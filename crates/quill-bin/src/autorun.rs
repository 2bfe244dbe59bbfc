//! AutoRun registry management.
//!
//! The command interpreter runs the `AutoRun` value of
//! `Software\Microsoft\Command Processor` for every new instance;
//! installing points it at `quill inject`. On 64-bit systems both the
//! 64-bit and 32-bit registry views are updated so either interpreter
//! flavor picks it up. Install and uninstall require administrator
//! rights when targeting the machine hive.

use anyhow::{Result, anyhow};

#[cfg(windows)]
mod registry {
    use super::*;
    use windows_sys::Win32::Foundation::ERROR_SUCCESS;
    use windows_sys::Win32::System::Registry::{
        HKEY, HKEY_CURRENT_USER, KEY_READ, KEY_WOW64_32KEY, KEY_WOW64_64KEY, KEY_WRITE,
        REG_SZ, RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegOpenKeyExW,
        RegQueryValueExW, RegSetValueExW,
    };

    const SUBKEY: &str = "Software\\Microsoft\\Command Processor";
    const VALUE: &str = "AutoRun";
    const VIEWS: [u32; 2] = [KEY_WOW64_64KEY, KEY_WOW64_32KEY];

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    struct Key(HKEY);

    impl Drop for Key {
        fn drop(&mut self) {
            unsafe { RegCloseKey(self.0) };
        }
    }

    fn open_view(view: u32, access: u32) -> Result<Key> {
        let mut key: HKEY = std::ptr::null_mut();
        let subkey = wide(SUBKEY);
        let rc = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                subkey.as_ptr(),
                0,
                std::ptr::null(),
                0,
                access | view,
                std::ptr::null(),
                &mut key,
                std::ptr::null_mut(),
            )
        };
        if rc != ERROR_SUCCESS {
            return Err(anyhow!("opening registry view failed (error {rc})"));
        }
        Ok(Key(key))
    }

    pub fn set_value(command: &str) -> Result<()> {
        for view in VIEWS {
            let key = open_view(view, KEY_WRITE)?;
            let data = wide(command);
            let value = wide(VALUE);
            let rc = unsafe {
                RegSetValueExW(
                    key.0,
                    value.as_ptr(),
                    0,
                    REG_SZ,
                    data.as_ptr() as *const u8,
                    (data.len() * 2) as u32,
                )
            };
            if rc != ERROR_SUCCESS {
                return Err(anyhow!("setting AutoRun failed (error {rc})"));
            }
        }
        Ok(())
    }

    pub fn delete_value() -> Result<()> {
        for view in VIEWS {
            let key = open_view(view, KEY_WRITE)?;
            let value = wide(VALUE);
            unsafe { RegDeleteValueW(key.0, value.as_ptr()) };
        }
        Ok(())
    }

    pub fn get_value() -> Result<Option<String>> {
        let subkey = wide(SUBKEY);
        let mut key: HKEY = std::ptr::null_mut();
        let rc = unsafe {
            RegOpenKeyExW(
                HKEY_CURRENT_USER,
                subkey.as_ptr(),
                0,
                KEY_READ | KEY_WOW64_64KEY,
                &mut key,
            )
        };
        if rc != ERROR_SUCCESS {
            return Ok(None);
        }
        let key = Key(key);
        let value = wide(VALUE);
        let mut buf = vec![0u16; 4096];
        let mut size = (buf.len() * 2) as u32;
        let rc = unsafe {
            RegQueryValueExW(
                key.0,
                value.as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                buf.as_mut_ptr() as *mut u8,
                &mut size,
            )
        };
        if rc != ERROR_SUCCESS {
            return Ok(None);
        }
        let chars = (size as usize / 2).min(buf.len());
        let end = buf[..chars].iter().position(|&c| c == 0).unwrap_or(chars);
        Ok(Some(String::from_utf16_lossy(&buf[..end])))
    }
}

#[cfg(windows)]
pub fn run(install: bool, uninstall: bool, show: bool, value: Option<&str>) -> Result<()> {
    if install {
        let exe = std::env::current_exe()?;
        let command = format!("\"{}\" inject --quiet", exe.display());
        registry::set_value(&command)?;
        println!("autorun installed");
        return Ok(());
    }
    if uninstall {
        registry::delete_value()?;
        println!("autorun uninstalled");
        return Ok(());
    }
    if let Some(value) = value {
        registry::set_value(value)?;
        println!("autorun set");
        return Ok(());
    }
    if show {
        match registry::get_value()? {
            Some(v) => println!("{v}"),
            None => println!("autorun is not set"),
        }
        return Ok(());
    }
    Err(anyhow!("one of --install, --uninstall, --show, or --value is required"))
}

#[cfg(not(windows))]
pub fn run(_install: bool, _uninstall: bool, _show: bool, _value: Option<&str>) -> Result<()> {
    Err(anyhow!("autorun requires the Windows registry"))
}
