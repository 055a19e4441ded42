// Persisted light mappings (names, flags, zones)
// Stored as JSON under $XDG_DATA_HOME/alienfx/mappings.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

/// On-disk mappings file: per-device light names plus user-defined
/// zones and grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsFile {
    pub schema_version: u32,
    #[serde(default)]
    pub devices: Vec<DeviceMapping>,
    #[serde(default)]
    pub groups: Vec<GroupMapping>,
    #[serde(default)]
    pub grids: Vec<GridMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMapping {
    pub vid: u16,
    pub pid: u16,
    pub name: String,
    /// Calibrated white point, if the user set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<[u8; 3]>,
    /// Preferred hardware brightness (0-255)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub lights: Vec<LightMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightMapping {
    pub lightid: u8,
    /// POWER=1, INDICATOR=2 (see `alienfx_core::light_flags`)
    #[serde(default)]
    pub flags: u16,
    /// Keyboard scancode for per-key devices, 0 when not a key
    #[serde(default)]
    pub scancode: u16,
    pub name: String,
}

/// A named zone spanning lights on one or more devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMapping {
    pub name: String,
    #[serde(default)]
    pub lights: Vec<GroupLight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLight {
    pub vid: u16,
    pub pid: u16,
    pub lightid: u8,
}

/// A rectangular light layout, used by spatial effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMapping {
    pub name: String,
    pub width: u8,
    pub height: u8,
    /// Row-major packed (vid,pid,lightid) cells; 0 = empty cell
    #[serde(default)]
    pub cells: Vec<u64>,
}

impl Default for MappingsFile {
    fn default() -> Self {
        MappingsFile {
            schema_version: SCHEMA_VERSION,
            devices: Vec::new(),
            groups: Vec::new(),
            grids: Vec::new(),
        }
    }
}

impl MappingsFile {
    /// Default on-disk location, honoring $XDG_DATA_HOME.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))?;
        Some(base.join("alienfx").join("mappings.json"))
    }

    /// Load from `path`; a missing file yields the empty default.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MappingsFile::default())
            }
            Err(e) => return Err(e.into()),
        };
        let file: MappingsFile = serde_json::from_str(&content)?;
        if file.schema_version > SCHEMA_VERSION {
            anyhow::bail!(
                "mappings file schema {} is newer than supported ({})",
                file.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(file)
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn device(&self, vid: u16, pid: u16) -> Option<&DeviceMapping> {
        self.devices.iter().find(|d| d.vid == vid && d.pid == pid)
    }

    /// Get or create the entry for one device.
    pub fn device_mut(&mut self, vid: u16, pid: u16, name: &str) -> &mut DeviceMapping {
        if let Some(idx) = self.devices.iter().position(|d| d.vid == vid && d.pid == pid) {
            return &mut self.devices[idx];
        }
        self.devices.push(DeviceMapping {
            vid,
            pid,
            name: name.to_string(),
            white: None,
            brightness: None,
            lights: Vec::new(),
        });
        let idx = self.devices.len() - 1;
        &mut self.devices[idx]
    }

    pub fn group(&self, name: &str) -> Option<&GroupMapping> {
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a light argument for one device: a numeric index, or a
    /// saved light name.
    pub fn resolve_light(&self, vid: u16, pid: u16, arg: &str) -> Option<u8> {
        if let Ok(id) = arg.parse::<u8>() {
            return Some(id);
        }
        self.device(vid, pid)?
            .lights
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(arg))
            .map(|l| l.lightid)
    }
}

impl DeviceMapping {
    pub fn light(&self, lightid: u8) -> Option<&LightMapping> {
        self.lights.iter().find(|l| l.lightid == lightid)
    }

    pub fn name_light(&mut self, lightid: u8, name: String) {
        match self.lights.iter_mut().find(|l| l.lightid == lightid) {
            Some(light) => light.name = name,
            None => self.lights.push(LightMapping {
                lightid,
                flags: 0,
                scancode: 0,
                name,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MappingsFile {
        let mut file = MappingsFile::default();
        let dev = file.device_mut(0x187c, 0x0550, "Laptop");
        dev.name_light(0, "Left keyboard".into());
        dev.name_light(8, "Power button".into());
        dev.lights.last_mut().unwrap().flags = alienfx_core::light_flags::POWER;
        file.groups.push(GroupMapping {
            name: "keyboard".into(),
            lights: vec![GroupLight {
                vid: 0x187c,
                pid: 0x0550,
                lightid: 0,
            }],
        });
        file
    }

    #[test]
    fn roundtrips_through_json() {
        let file = sample();
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"schemaVersion\":1"));
        assert!(json.contains("\"lightid\":8"));
        let back: MappingsFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.devices.len(), 1);
        assert_eq!(back.devices[0].lights[1].flags, 1);
        assert_eq!(back.group("Keyboard").unwrap().lights[0].lightid, 0);
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = MappingsFile::load(&dir.path().join("mappings.json")).unwrap();
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert!(loaded.devices.is_empty());
    }

    #[test]
    fn save_then_load_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alienfx").join("mappings.json");
        sample().save(&path).unwrap();
        let back = MappingsFile::load(&path).unwrap();
        assert_eq!(back.devices[0].name, "Laptop");
        assert_eq!(back.resolve_light(0x187c, 0x0550, "power button"), Some(8));
        assert_eq!(back.resolve_light(0x187c, 0x0550, "12"), Some(12));
        assert_eq!(back.resolve_light(0x187c, 0x0550, "nope"), None);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(&path, r#"{"schemaVersion": 99}"#).unwrap();
        assert!(MappingsFile::load(&path).is_err());
    }

    #[test]
    fn omitted_sections_default_empty() {
        let file: MappingsFile = serde_json::from_str(r#"{"schemaVersion": 1}"#).unwrap();
        assert!(file.groups.is_empty() && file.grids.is_empty());
    }
}
