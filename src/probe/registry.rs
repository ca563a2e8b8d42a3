//! Native toolchain registry markers.
//!
//! Only Windows has them: Visual Studio records every installation under
//! `HKLM\SOFTWARE\Microsoft\VisualStudio\SxS\VS7`, one value per version whose
//! data is the install path. Other platforms report nothing.

#[cfg(windows)]
pub(super) fn installed_toolchain() -> Result<Option<String>, crate::error::EnvError> {
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{
        HKEY, HKEY_LOCAL_MACHINE, KEY_READ, RegCloseKey, RegEnumValueW, RegOpenKeyExW,
    };
    use windows::core::{PCWSTR, PWSTR};

    struct KeyGuard(HKEY);

    impl Drop for KeyGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }

    let subkey: Vec<u16> = r"SOFTWARE\Microsoft\VisualStudio\SxS\VS7"
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let mut key = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(subkey.as_ptr()),
            Some(0),
            KEY_READ,
            &mut key,
        )
    };
    if status != ERROR_SUCCESS {
        // Key absent: no Visual Studio registered
        return Ok(None);
    }
    let key = KeyGuard(key);

    let mut index = 0u32;
    loop {
        let mut name = [0u16; 256];
        let mut name_len = name.len() as u32;
        let mut data = [0u8; 2048];
        let mut data_len = data.len() as u32;

        let status = unsafe {
            RegEnumValueW(
                key.0,
                index,
                Some(PWSTR::from_raw(name.as_mut_ptr())),
                &mut name_len,
                None,
                None,
                Some(data.as_mut_ptr()),
                Some(&mut data_len),
            )
        };
        if status != ERROR_SUCCESS {
            break;
        }
        index += 1;

        let wide: Vec<u16> = data[..data_len as usize]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&c| c != 0)
            .collect();
        let install_path = String::from_utf16_lossy(&wide);
        if !install_path.trim().is_empty() {
            let version = String::from_utf16_lossy(&name[..name_len as usize]);
            return Ok(Some(format!("{version} at {install_path}")));
        }
    }

    Ok(None)
}

#[cfg(not(windows))]
pub(super) fn installed_toolchain() -> Result<Option<String>, crate::error::EnvError> {
    Ok(None)
}
