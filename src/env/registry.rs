//! Machine-wide PATH in the registry

use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, LPARAM, WPARAM};
use windows::Win32::System::Registry::{
    HKEY, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE, REG_EXPAND_SZ, REG_SAM_FLAGS, REG_VALUE_TYPE,
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    HWND_BROADCAST, SMTO_ABORTIFHUNG, SendMessageTimeoutW, WM_SETTINGCHANGE,
};
use windows::core::PCWSTR;

use crate::config::InstallSettings;
use crate::error::EnvError;

use super::PathStore;

const ENVIRONMENT_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
const BROADCAST_TIMEOUT_MS: u32 = 5000;

/// RAII wrapper for an open registry key
struct RegistryHandle(HKEY);

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn open_environment(access: REG_SAM_FLAGS) -> Result<RegistryHandle, EnvError> {
    let subkey = wide(ENVIRONMENT_KEY);
    let mut key = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(subkey.as_ptr()),
            Some(0),
            access,
            &mut key,
        )
    };
    if status != ERROR_SUCCESS {
        return Err(EnvError::Registry(format!(
            "failed to open HKLM\\{ENVIRONMENT_KEY}: error {}",
            status.0
        )));
    }
    Ok(RegistryHandle(key))
}

/// `Path` under the machine `Environment` key, written back as
/// `REG_EXPAND_SZ` so `%VAR%` references keep working
#[derive(Debug, Clone, Default)]
pub struct RegistryPathStore;

impl RegistryPathStore {
    pub fn new() -> Self {
        Self
    }

    /// The registry store has no settings; the profile file is a Unix concern
    pub fn from_settings(_settings: &InstallSettings) -> Result<Self, EnvError> {
        Ok(Self)
    }
}

impl PathStore for RegistryPathStore {
    fn read(&self) -> Result<Option<String>, EnvError> {
        let key = open_environment(KEY_READ)?;
        let name = wide("Path");

        let mut kind = REG_VALUE_TYPE::default();
        let mut size = 0u32;
        let status = unsafe {
            RegQueryValueExW(
                key.0,
                PCWSTR::from_raw(name.as_ptr()),
                None,
                Some(&mut kind),
                None,
                Some(&mut size),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status != ERROR_SUCCESS {
            return Err(EnvError::Registry(format!(
                "failed to query Path size: error {}",
                status.0
            )));
        }

        let mut data = vec![0u8; size as usize];
        let status = unsafe {
            RegQueryValueExW(
                key.0,
                PCWSTR::from_raw(name.as_ptr()),
                None,
                Some(&mut kind),
                Some(data.as_mut_ptr()),
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(EnvError::Registry(format!(
                "failed to read Path: error {}",
                status.0
            )));
        }

        let units: Vec<u16> = data[..size as usize]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&c| c != 0)
            .collect();
        Ok(Some(String::from_utf16_lossy(&units)))
    }

    fn write(&self, _entry: &str, merged: &str) -> Result<(), EnvError> {
        let key = open_environment(KEY_WRITE)?;
        let name = wide("Path");
        let bytes: Vec<u8> = wide(merged).iter().flat_map(|u| u.to_le_bytes()).collect();

        let status = unsafe {
            RegSetValueExW(
                key.0,
                PCWSTR::from_raw(name.as_ptr()),
                Some(0),
                REG_EXPAND_SZ,
                Some(&bytes),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(EnvError::Registry(format!(
                "failed to write Path: error {}",
                status.0
            )));
        }
        Ok(())
    }

    fn broadcast(&self) -> Result<(), EnvError> {
        let area = wide("Environment");
        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SETTINGCHANGE,
                WPARAM(0),
                LPARAM(area.as_ptr() as isize),
                SMTO_ABORTIFHUNG,
                BROADCAST_TIMEOUT_MS,
                Some(&mut result),
            )
        };
        if sent.0 == 0 {
            return Err(EnvError::Broadcast(format!(
                "WM_SETTINGCHANGE not delivered within {BROADCAST_TIMEOUT_MS} ms"
            )));
        }
        Ok(())
    }

    fn separator(&self) -> char {
        ';'
    }
}
